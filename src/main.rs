// src/main.rs

mod assembler;
mod cache;
mod config;
mod normalizer;
mod pipeline;
mod resampler;
mod session;
mod timeline;
mod track_status;
mod tyres;
mod types;
mod verifier;

use anyhow::{bail, Result};
use cache::ResultCache;
use session::{find_session_files, SessionData};
use tracing::{error, info, warn};
use verifier::LeaderboardVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    let config = types::Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "race_replay={}",
                    config.logging.level
                ))
            }),
        )
        .init();

    info!("🏁 Race Replay Pipeline Starting");
    info!("✓ Configuration loaded");

    let refresh = std::env::args().any(|arg| arg == "--refresh-data");
    if refresh {
        info!("Forced refresh enabled (--refresh-data)");
    }

    run(&config, refresh).await
}

/// Process every session export under the input directory. Individual
/// sessions that fail to load or compute are skipped, but a run in which
/// no session produced a replay is the one fatal condition.
async fn run(config: &types::Config, refresh: bool) -> Result<()> {
    let cache = ResultCache::new(&config.cache.dir);

    let verifier = if config.verification.enabled {
        Some(LeaderboardVerifier::new(
            config.verification.api_base_url.clone(),
            config.verification.timeout_secs,
        )?)
    } else {
        info!("Leaderboard verification disabled in config");
        None
    };

    let session_files = find_session_files(&config.input.session_dir)?;
    if session_files.is_empty() {
        error!("No session exports found in {}", config.input.session_dir);
        bail!("no usable input data");
    }

    let mut sessions_processed = 0usize;

    for (idx, path) in session_files.iter().enumerate() {
        info!(
            "Processing session {}/{}: {}",
            idx + 1,
            session_files.len(),
            path.display()
        );

        let session = match SessionData::load(path) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to load session: {:#}", e);
                continue;
            }
        };

        let bundle = match pipeline::load_or_compute(&cache, &session, refresh) {
            Ok(b) => b,
            Err(e) => {
                error!("Failed to compute replay for {}: {:#}", session.event_key(), e);
                continue;
            }
        };

        sessions_processed += 1;
        info!(
            "✓ Replay ready for {}: {} frames, {} drivers",
            session.event_key(),
            bundle.frames.len(),
            bundle.driver_status.len()
        );

        if let Some(ref verifier) = verifier {
            if LeaderboardVerifier::should_verify(&bundle.frames) {
                let telemetry_positions = assembler::final_positions(&bundle.frames);
                let corrected = verifier
                    .verify_and_correct(&telemetry_positions, session.year, session.round)
                    .await;

                let mut ordered: Vec<_> = corrected.iter().collect();
                ordered.sort_by_key(|&(_, &pos)| pos);
                for (code, pos) in ordered.iter().take(10) {
                    info!("  P{:<3} {}", pos, code);
                }
            } else {
                warn!(
                    "Skipping verification for {}: race did not finish within the timeline",
                    session.event_key()
                );
            }
        }
    }

    if sessions_processed == 0 {
        error!(
            "All {} session export(s) failed to load or compute",
            session_files.len()
        );
        bail!("no usable input data");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn test_config() -> (types::Config, std::path::PathBuf) {
        let base = std::env::temp_dir().join(format!(
            "race-replay-main-test-{}-{}",
            std::process::id(),
            TEST_DIR_SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        let session_dir = base.join("sessions");
        fs::create_dir_all(&session_dir).unwrap();

        let config = types::Config {
            input: types::InputConfig {
                session_dir: session_dir.to_string_lossy().into_owned(),
            },
            cache: types::CacheConfig {
                dir: base.join("computed_data").to_string_lossy().into_owned(),
            },
            verification: types::VerificationConfig {
                enabled: false,
                api_base_url: "http://127.0.0.1:1".to_string(),
                timeout_secs: 1,
            },
            logging: types::LoggingConfig {
                level: "info".to_string(),
            },
        };
        (config, base)
    }

    #[tokio::test]
    async fn test_no_session_files_is_fatal() {
        let (config, base) = test_config();
        assert!(run(&config, false).await.is_err());
        fs::remove_dir_all(&base).unwrap();
    }

    #[tokio::test]
    async fn test_all_sessions_unloadable_is_fatal() {
        let (config, base) = test_config();
        fs::write(
            std::path::Path::new(&config.input.session_dir).join("broken.json"),
            "{not json",
        )
        .unwrap();

        assert!(run(&config, false).await.is_err());
        fs::remove_dir_all(&base).unwrap();
    }
}
