// src/assembler.rs
//
// Frame/leaderboard assembler. Walks the timeline grid strictly in order,
// ranks every driver by race-cumulative distance at each tick, and detects
// lap-completion and finish events. Finish detection accumulates forward:
// each tick depends only on state carried from earlier ticks, so the loop
// threads an explicit `FinishState` accumulator rather than mutating
// anything ambient.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::timeline::TimelineGrid;
use crate::types::{DriverFrame, DriverStatus, Frame, ResampledTrace};

/// Finish bookkeeping threaded through the tick loop.
#[derive(Debug, Clone, Default)]
pub struct FinishState {
    /// Frame index at which the race leader completed their final lap.
    pub leader_finished_frame: Option<usize>,
    /// Per-driver finish frame index, set at most once per driver.
    pub finish_frames: BTreeMap<String, usize>,
    /// Lap each driver was last seen on, for end-of-run diagnostics.
    pub last_seen_lap: BTreeMap<String, i64>,
}

/// One driver's coerced state at a single tick, before ranking.
#[derive(Debug, Clone)]
struct Snapshot {
    code: String,
    dist: f64,
    x: f64,
    y: f64,
    lap: i64,
    rel_dist: f64,
    tyre: i64,
    speed: f64,
    gear: i64,
    drs: i64,
}

/// Assemble the ordered frame sequence from the resampled traces.
///
/// Ranking is by distance covered, not elapsed time, so lapped cars order
/// correctly. `race_finished` latches true from the tick the leader's
/// rounded lap first exceeds their official completed-lap count. A driver
/// classified DNF never receives a finish frame.
pub fn assemble_frames(
    grid: &TimelineGrid,
    resampled: &BTreeMap<String, ResampledTrace>,
    driver_status: &BTreeMap<String, DriverStatus>,
) -> (Vec<Frame>, FinishState) {
    let mut frames: Vec<Frame> = Vec::with_capacity(grid.len());
    let mut state = FinishState::default();

    for (i, &t) in grid.ticks.iter().enumerate() {
        let mut snapshot: Vec<Snapshot> = resampled
            .iter()
            .map(|(code, d)| Snapshot {
                code: code.clone(),
                dist: d.dist[i],
                x: d.x[i],
                y: d.y[i],
                // Interpolate-then-coerce: categorical channels arrive as
                // fractional values, never trusted as exact during a
                // transition. Lap and tyre round to nearest; gear and DRS
                // truncate.
                lap: d.lap[i].round() as i64,
                rel_dist: round6(d.rel_dist[i]),
                tyre: d.tyre[i].round() as i64,
                speed: d.speed[i],
                gear: d.gear[i].trunc() as i64,
                drs: d.drs[i].trunc() as i64,
            })
            .collect();

        // Should not occur given the grid spans the union of driver ranges,
        // but a tick with no drivers is skipped rather than emitted.
        if snapshot.is_empty() {
            debug!("Tick {} ({:.3}s): empty snapshot, skipping", i, t);
            continue;
        }

        // Stable sort: leader = largest race distance; the BTreeMap
        // iteration order above makes ties deterministic by driver code.
        snapshot.sort_by(|a, b| b.dist.partial_cmp(&a.dist).unwrap_or(std::cmp::Ordering::Equal));

        let frame_idx = frames.len();
        let leader = &snapshot[0];
        let leader_lap = leader.lap;

        // Leader finish: the distinguished case that latches race_finished.
        // The leader crosses the line after completing their final lap,
        // i.e. when their rounded lap first reads final_laps + 1.
        if state.leader_finished_frame.is_none() {
            if let Some(status) = driver_status.get(&leader.code) {
                if leader_lap > i64::from(status.laps_completed) {
                    info!(
                        "Race leader {} finished at frame {} (t={:.2}s, lap {})",
                        leader.code, frame_idx, t, leader_lap
                    );
                    state.leader_finished_frame = Some(frame_idx);
                    state.finish_frames.insert(leader.code.clone(), frame_idx);
                }
            }
        }

        // Per-driver finish detection, independent of the leader. Only
        // drivers classified as finished get a finish frame; a DNF'd car
        // rolling past its last completed lap does not.
        for car in &snapshot {
            if let Some(status) = driver_status.get(&car.code) {
                if car.lap > i64::from(status.laps_completed)
                    && !state.finish_frames.contains_key(&car.code)
                    && status.is_finished
                {
                    debug!(
                        "{} finished at frame {} (lap {} > {})",
                        car.code, frame_idx, car.lap, status.laps_completed
                    );
                    state.finish_frames.insert(car.code.clone(), frame_idx);
                }
            }
            state.last_seen_lap.insert(car.code.clone(), car.lap);
        }

        let mut drivers: BTreeMap<String, DriverFrame> = BTreeMap::new();
        for (idx, car) in snapshot.iter().enumerate() {
            drivers.insert(
                car.code.clone(),
                DriverFrame {
                    x: car.x,
                    y: car.y,
                    dist: car.dist,
                    lap: car.lap,
                    rel_dist: car.rel_dist,
                    tyre: car.tyre,
                    position: idx + 1,
                    speed: car.speed,
                    gear: car.gear,
                    drs: car.drs,
                },
            );
        }

        frames.push(Frame {
            t,
            lap: leader_lap,
            drivers,
            race_finished: state.leader_finished_frame.is_some(),
            leader_finished_frame: state.leader_finished_frame,
        });
    }

    if state.leader_finished_frame.is_none() && !frames.is_empty() {
        let deepest_lap = state.last_seen_lap.values().copied().max().unwrap_or(0);
        warn!(
            "Timeline ended before the leader completed their final lap (deepest lap seen: {})",
            deepest_lap
        );
    }

    (frames, state)
}

/// The final position map (driver code → rank) taken from the last frame.
pub fn final_positions(frames: &[Frame]) -> BTreeMap<String, usize> {
    frames
        .last()
        .map(|frame| {
            frame
                .drivers
                .iter()
                .map(|(code, df)| (code.clone(), df.position))
                .collect()
        })
        .unwrap_or_default()
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}
