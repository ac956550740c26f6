use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub cache: CacheConfig,
    pub verification: VerificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub session_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub enabled: bool,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// One raw telemetry sample inside a single lap, as exported by the
/// acquisition layer. `t` is session-relative seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawLapSample {
    pub t: f64,
    pub x: f64,
    pub y: f64,
    /// Cumulative distance within this lap, metres.
    pub dist: f64,
    /// Fraction of the current lap completed, [0, 1].
    pub rel_dist: f64,
    pub speed: f64,
    pub gear: f64,
    pub drs: f64,
}

/// A driver's full-race telemetry merged across laps: one value per channel
/// per sample, stably sorted by time. `dist` is race-cumulative distance and
/// is non-decreasing across the sorted sequence.
#[derive(Debug, Clone, Default)]
pub struct DriverTrace {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub dist: Vec<f64>,
    pub rel_dist: Vec<f64>,
    pub lap: Vec<f64>,
    pub tyre: Vec<f64>,
    pub speed: Vec<f64>,
    pub gear: Vec<f64>,
    pub drs: Vec<f64>,
}

impl DriverTrace {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn t_min(&self) -> Option<f64> {
        self.t.first().copied()
    }

    pub fn t_max(&self) -> Option<f64> {
        self.t.last().copied()
    }
}

/// Same channels as `DriverTrace` (minus time) projected onto the shared
/// timeline grid: one interpolated value per channel per tick.
#[derive(Debug, Clone, Default)]
pub struct ResampledTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub dist: Vec<f64>,
    pub rel_dist: Vec<f64>,
    pub lap: Vec<f64>,
    pub tyre: Vec<f64>,
    pub speed: Vec<f64>,
    pub gear: Vec<f64>,
    pub drs: Vec<f64>,
}

/// Final classification for a driver, computed once from the official
/// results and immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStatus {
    pub status: String,
    pub classification: String,
    pub laps_completed: u32,
    pub is_finished: bool,
    pub is_dnf: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStatusInterval {
    pub status: String,
    pub start_time: f64,
    /// `None` means the interval stays open to the end of the session.
    pub end_time: Option<f64>,
}

/// One driver's entry in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverFrame {
    pub x: f64,
    pub y: f64,
    /// Race-cumulative distance, metres.
    pub dist: f64,
    pub lap: i64,
    pub rel_dist: f64,
    pub tyre: i64,
    /// 1-based rank; 1 = leader.
    pub position: usize,
    pub speed: f64,
    pub gear: i64,
    pub drs: i64,
}

/// One tick of the replay: every driver's state plus race-level flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub t: f64,
    /// The leader's lap at this tick.
    pub lap: i64,
    pub drivers: BTreeMap<String, DriverFrame>,
    pub race_finished: bool,
    pub leader_finished_frame: Option<usize>,
}

/// The full persisted output artifact for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayBundle {
    pub frames: Vec<Frame>,
    pub driver_colors: BTreeMap<String, [u8; 3]>,
    pub track_statuses: Vec<TrackStatusInterval>,
    pub driver_status: BTreeMap<String, DriverStatus>,
    pub driver_finish_frames: BTreeMap<String, usize>,
}

impl ReplayBundle {
    pub fn empty() -> Self {
        Self {
            frames: Vec::new(),
            driver_colors: BTreeMap::new(),
            track_statuses: Vec::new(),
            driver_status: BTreeMap::new(),
            driver_finish_frames: BTreeMap::new(),
        }
    }
}
