// src/timeline.rs
//
// The shared replay clock: a dense grid of time offsets at the fixed
// playback rate, spanning the union of every driver's active range.
// All downstream times are shifted so tick 0 corresponds to the earliest
// sample of any driver.

use std::collections::BTreeMap;
use tracing::info;

use crate::types::DriverTrace;

/// Playback rate of the replay, frames per second.
pub const FPS: u32 = 25;
/// Tick step, seconds.
pub const DT: f64 = 1.0 / FPS as f64;

#[derive(Debug, Clone, Default)]
pub struct TimelineGrid {
    /// Tick offsets starting at 0.0, strictly below (global_max - global_min).
    pub ticks: Vec<f64>,
    /// Earliest timestamp over all drivers; the shift applied downstream.
    pub global_min: f64,
}

impl TimelineGrid {
    /// Build the grid for the given global time bounds. Tick count is
    /// floor((global_max - global_min) / DT), so the last tick always falls
    /// strictly before the end of the spanned range.
    pub fn build(global_min: f64, global_max: f64) -> Self {
        let span = global_max - global_min;
        if !span.is_finite() || span <= 0.0 {
            return Self {
                ticks: Vec::new(),
                global_min,
            };
        }

        // Tolerance absorbs float error when the span is an exact multiple
        // of DT (5.0 / 0.04 computes to 124.999... in f64).
        let count = (span / DT + 1e-9).floor() as usize;
        let ticks: Vec<f64> = (0..count).map(|k| k as f64 * DT).collect();

        info!(
            "Timeline: {} ticks at {} fps spanning {:.1} s",
            ticks.len(),
            FPS,
            span
        );

        Self { ticks, global_min }
    }

    /// Global min/max timestamps over all included driver traces, or `None`
    /// when no driver produced a sample (the empty-session degrade path).
    pub fn global_bounds(traces: &BTreeMap<String, DriverTrace>) -> Option<(f64, f64)> {
        let mut bounds: Option<(f64, f64)> = None;
        for trace in traces.values() {
            let (t_min, t_max) = match (trace.t_min(), trace.t_max()) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(t_min), hi.max(t_max)),
                None => (t_min, t_max),
            });
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_bounds_and_count() {
        // span = 10.02 s → floor(10.02 * 25) = 250 ticks
        let grid = TimelineGrid::build(100.0, 110.02);
        assert_eq!(grid.len(), 250);
        assert_eq!(grid.ticks[0], 0.0);
        let last = *grid.ticks.last().unwrap();
        assert!(last < 10.02);
    }

    #[test]
    fn test_exact_multiple_span_excludes_upper_bound() {
        let grid = TimelineGrid::build(0.0, 2.0);
        assert_eq!(grid.len(), 50);
        let last = *grid.ticks.last().unwrap();
        assert!(last < 2.0);
        assert!((last - (2.0 - DT)).abs() < 1e-9);
    }

    #[test]
    fn test_ticks_are_evenly_spaced() {
        let grid = TimelineGrid::build(5.0, 8.0);
        for w in grid.ticks.windows(2) {
            assert!((w[1] - w[0] - DT).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_span_yields_empty_grid() {
        assert!(TimelineGrid::build(10.0, 10.0).is_empty());
        assert!(TimelineGrid::build(10.0, 9.0).is_empty());
    }

    #[test]
    fn test_global_bounds_over_traces() {
        let mut traces = BTreeMap::new();
        let mut a = DriverTrace::default();
        a.t = vec![100.0, 150.0];
        let mut b = DriverTrace::default();
        b.t = vec![90.0, 140.0];
        traces.insert("A".to_string(), a);
        traces.insert("B".to_string(), b);

        assert_eq!(TimelineGrid::global_bounds(&traces), Some((90.0, 150.0)));
    }

    #[test]
    fn test_global_bounds_empty_when_no_samples() {
        let traces: BTreeMap<String, DriverTrace> = BTreeMap::new();
        assert_eq!(TimelineGrid::global_bounds(&traces), None);
    }
}
