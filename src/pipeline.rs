// src/pipeline.rs
//
// Orchestrates the batch pipeline for one session: normalize each driver's
// laps, build the shared clock, resample everything onto it, overlay track
// status, assemble the ranked frame sequence, and persist the bundle.
// Single ordered pass; per-driver stages are independent but the assembler
// consumes them in one sweep because finish state carries tick to tick.

use anyhow::Result;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

use crate::assembler::assemble_frames;
use crate::cache::ResultCache;
use crate::normalizer::normalize_driver;
use crate::resampler::resample_trace;
use crate::session::SessionData;
use crate::timeline::TimelineGrid;
use crate::track_status::build_intervals;
use crate::types::{DriverTrace, ReplayBundle, ResampledTrace};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub drivers_included: usize,
    pub drivers_skipped: usize,
    pub ticks: usize,
    pub frames: usize,
    pub finishers: usize,
    pub dnfs: usize,
    pub duration_secs: f64,
}

impl RunSummary {
    pub fn log(&self) {
        info!("Run summary:");
        info!(
            "  Drivers: {} included, {} skipped (no telemetry)",
            self.drivers_included, self.drivers_skipped
        );
        info!("  Ticks: {} | Frames emitted: {}", self.ticks, self.frames);
        info!(
            "  Classified finishers: {} | DNFs: {}",
            self.finishers, self.dnfs
        );
        info!(
            "  Computed in {:.2}s ({:.0} frames/s)",
            self.duration_secs,
            self.frames as f64 / self.duration_secs.max(0.001)
        );
    }
}

/// Compute the full replay bundle for a session from scratch.
pub fn compute_replay(session: &SessionData) -> (ReplayBundle, RunSummary) {
    let start_time = Instant::now();

    let driver_status = session.driver_status_map();
    let driver_colors = session.driver_colors_rgb();

    // 1. Normalize each driver's laps into one continuous trace.
    let mut traces: BTreeMap<String, DriverTrace> = BTreeMap::new();
    let mut drivers_skipped = 0usize;
    for driver in &session.drivers {
        info!("Normalizing telemetry for driver: {}", driver.code);
        match normalize_driver(&driver.code, &driver.laps) {
            Some(trace) => {
                traces.insert(driver.code.clone(), trace);
            }
            None => drivers_skipped += 1,
        }
    }

    // 2. Shared clock over the union of driver ranges. No samples at all
    //    degrades to an empty frame sequence, never a crash.
    let grid = match TimelineGrid::global_bounds(&traces) {
        Some((lo, hi)) => TimelineGrid::build(lo, hi),
        None => {
            warn!("Session has no usable telemetry, emitting empty replay");
            TimelineGrid::default()
        }
    };
    let global_min = grid.global_min;

    // 3. Resample every driver's channels onto the grid.
    let resampled: BTreeMap<String, ResampledTrace> = traces
        .iter()
        .map(|(code, trace)| {
            (
                code.clone(),
                resample_trace(code, trace, &grid.ticks, global_min),
            )
        })
        .collect();

    // 4. Track status events become intervals on the shared clock.
    let track_statuses = build_intervals(&session.track_status, global_min);

    // 5. The ordered frame/leaderboard pass.
    let (frames, finish_state) = assemble_frames(&grid, &resampled, &driver_status);

    let summary = RunSummary {
        drivers_included: traces.len(),
        drivers_skipped,
        ticks: grid.len(),
        frames: frames.len(),
        finishers: driver_status.values().filter(|s| s.is_finished).count(),
        dnfs: driver_status.values().filter(|s| s.is_dnf).count(),
        duration_secs: start_time.elapsed().as_secs_f64(),
    };

    let bundle = ReplayBundle {
        frames,
        driver_colors,
        track_statuses,
        driver_status,
        driver_finish_frames: finish_state.finish_frames,
    };

    (bundle, summary)
}

/// Cache gate: return the cached bundle when present and no refresh was
/// forced, otherwise compute and persist. Repeated calls for the same
/// event are idempotent.
pub fn load_or_compute(
    cache: &ResultCache,
    session: &SessionData,
    refresh: bool,
) -> Result<ReplayBundle> {
    let event_key = session.event_key();

    if !refresh {
        if let Some(bundle) = cache.load(&event_key)? {
            return Ok(bundle);
        }
    } else {
        info!("Forced refresh requested, recomputing {}", event_key);
    }

    let (bundle, summary) = compute_replay(session);
    summary.log();
    cache.store(&event_key, &bundle)?;
    Ok(bundle)
}
