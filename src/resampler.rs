// src/resampler.rs
//
// Projects each driver's merged trace onto the shared timeline grid.
// Every channel goes through the same linear interpolation, including the
// categorical ones (tyre, lap, gear, DRS) — those are coerced back to
// integers downstream, so a compound or lap change mid-step produces a
// transient fractional value that is an accepted approximation artifact,
// never an error.

use tracing::debug;

use crate::types::{DriverTrace, ResampledTrace};

/// Linear interpolation of `(knots_t, values)` onto `grid`, with flat
/// extrapolation outside the observed range: ticks before the first knot
/// take the first value, ticks after the last knot take the last value.
/// Both `grid` and `knots_t` must be sorted ascending.
pub fn interp_channel(grid: &[f64], knots_t: &[f64], values: &[f64]) -> Vec<f64> {
    debug_assert_eq!(knots_t.len(), values.len());
    if knots_t.is_empty() {
        return vec![0.0; grid.len()];
    }

    let n = knots_t.len();
    let mut out = Vec::with_capacity(grid.len());
    // Index of the first knot at or after the current tick; advances
    // monotonically because the grid is sorted.
    let mut hi = 0usize;

    for &g in grid {
        while hi < n && knots_t[hi] < g {
            hi += 1;
        }

        let v = if hi == 0 {
            values[0]
        } else if hi == n {
            values[n - 1]
        } else {
            let t0 = knots_t[hi - 1];
            let t1 = knots_t[hi];
            let v0 = values[hi - 1];
            let v1 = values[hi];
            if (t1 - t0).abs() < f64::EPSILON {
                v1
            } else {
                v0 + (v1 - v0) * ((g - t0) / (t1 - t0))
            }
        };
        out.push(v);
    }

    out
}

/// Resample every channel of `trace` onto `grid`. The trace's timestamps
/// are shifted by `global_min` so they share the grid's zero point.
pub fn resample_trace(code: &str, trace: &DriverTrace, grid: &[f64], global_min: f64) -> ResampledTrace {
    let shifted_t: Vec<f64> = trace.t.iter().map(|&t| t - global_min).collect();

    let resampled = ResampledTrace {
        x: interp_channel(grid, &shifted_t, &trace.x),
        y: interp_channel(grid, &shifted_t, &trace.y),
        dist: interp_channel(grid, &shifted_t, &trace.dist),
        rel_dist: interp_channel(grid, &shifted_t, &trace.rel_dist),
        lap: interp_channel(grid, &shifted_t, &trace.lap),
        tyre: interp_channel(grid, &shifted_t, &trace.tyre),
        speed: interp_channel(grid, &shifted_t, &trace.speed),
        gear: interp_channel(grid, &shifted_t, &trace.gear),
        drs: interp_channel(grid, &shifted_t, &trace.drs),
    };

    debug!(
        "{}: resampled {} samples onto {} ticks",
        code,
        trace.len(),
        grid.len()
    );

    resampled
}
