// src/cache.rs
//
// On-disk result cache, one JSON bundle per event. Reads are idempotent:
// the same event key returns the same bytes until a forced refresh
// recomputes. Writes go to a temp file in the cache directory and are
// renamed into place, so a concurrent reader never sees a half-written
// entry.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::ReplayBundle;

pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, event_key: &str) -> PathBuf {
        self.dir.join(format!("{}_race_telemetry.json", event_key))
    }

    /// Load the cached bundle for an event. A missing file is an expected
    /// cache miss; an unparseable file is treated as a miss too (recompute)
    /// rather than failing the pipeline.
    pub fn load(&self, event_key: &str) -> Result<Option<ReplayBundle>> {
        let path = self.path_for(event_key);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read cache {}", path.display()))
            }
        };

        match serde_json::from_str::<ReplayBundle>(&contents) {
            Ok(bundle) => {
                info!(
                    "Cache hit for {}: {} frames",
                    event_key,
                    bundle.frames.len()
                );
                Ok(Some(bundle))
            }
            Err(e) => {
                warn!(
                    "Cache entry {} is unreadable ({}), recomputing",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Persist a bundle with atomic replace semantics.
    pub fn store(&self, event_key: &str, bundle: &ReplayBundle) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache dir {}", self.dir.display()))?;

        let path = self.path_for(event_key);
        let tmp_path = self.dir.join(format!(
            ".{}_race_telemetry.json.tmp.{}",
            event_key,
            std::process::id()
        ));

        let json = serde_json::to_string_pretty(bundle)?;
        fs::write(&tmp_path, json)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to move cache entry into {}", path.display()))?;

        info!(
            "Cached {} frames for {} at {}",
            bundle.frames.len(),
            event_key,
            path.display()
        );
        Ok(())
    }
}
