// src/normalizer.rs
//
// Per-driver lap normalizer. Raw telemetry arrives lap by lap with an
// in-lap distance that resets at every lap start; this module chains laps
// into one race-cumulative-distance trace per driver and guarantees a
// monotonic time axis even when lap telemetry windows overlap.

use tracing::{debug, warn};

use crate::session::RawLap;
use crate::tyres::TyreCompound;
use crate::types::DriverTrace;

/// One merged sample row before the final time sort.
#[derive(Debug, Clone, Copy)]
struct MergedSample {
    t: f64,
    x: f64,
    y: f64,
    dist: f64,
    rel_dist: f64,
    lap: f64,
    tyre: f64,
    speed: f64,
    gear: f64,
    drs: f64,
}

/// Merge a driver's laps into a single continuous trace.
///
/// Per lap, in lap order: the in-lap distance is shifted so its minimum is
/// zero, the lap length is the maximum shifted distance, and the
/// race-cumulative distance is the running total plus the shifted in-lap
/// distance. The running total advances by the lap length after each lap.
/// Laps without samples are skipped. Returns `None` when the driver has no
/// usable samples at all, which excludes them from all downstream stages.
pub fn normalize_driver(code: &str, laps: &[RawLap]) -> Option<DriverTrace> {
    let mut rows: Vec<MergedSample> = Vec::new();
    let mut total_dist_so_far = 0.0_f64;
    let mut skipped_laps = 0usize;

    for lap in laps {
        if lap.samples.is_empty() {
            skipped_laps += 1;
            continue;
        }

        let tyre_code = TyreCompound::from_name(&lap.compound).code() as f64;
        let lap_number = f64::from(lap.lap_number);

        let d_min = lap
            .samples
            .iter()
            .map(|s| s.dist)
            .fold(f64::INFINITY, f64::min);
        let d_max = lap
            .samples
            .iter()
            .map(|s| s.dist)
            .fold(f64::NEG_INFINITY, f64::max);
        // Approximate circuit length for this lap, after shifting to zero.
        let lap_length = d_max - d_min;

        for s in &lap.samples {
            rows.push(MergedSample {
                t: s.t,
                x: s.x,
                y: s.y,
                dist: total_dist_so_far + (s.dist - d_min),
                rel_dist: s.rel_dist,
                lap: lap_number,
                tyre: tyre_code,
                speed: s.speed,
                gear: s.gear,
                drs: s.drs,
            });
        }

        total_dist_so_far += lap_length;
    }

    if skipped_laps > 0 {
        debug!("{}: skipped {} lap(s) without telemetry", code, skipped_laps);
    }

    if rows.is_empty() {
        warn!("{}: no usable telemetry in any lap, excluding driver", code);
        return None;
    }

    // Stable sort so samples within a lap keep their order even when lap
    // telemetry windows overlap at the boundaries.
    rows.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap_or(std::cmp::Ordering::Equal));

    let mut trace = DriverTrace::default();
    for row in &rows {
        trace.t.push(row.t);
        trace.x.push(row.x);
        trace.y.push(row.y);
        trace.dist.push(row.dist);
        trace.rel_dist.push(row.rel_dist);
        trace.lap.push(row.lap);
        trace.tyre.push(row.tyre);
        trace.speed.push(row.speed);
        trace.gear.push(row.gear);
        trace.drs.push(row.drs);
    }

    debug!(
        "{}: merged {} samples across {} lap(s), total distance {:.1} m",
        code,
        trace.len(),
        laps.len() - skipped_laps,
        total_dist_so_far
    );

    Some(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawLapSample;

    fn sample(t: f64, dist: f64) -> RawLapSample {
        RawLapSample {
            t,
            x: 0.0,
            y: 0.0,
            dist,
            rel_dist: 0.0,
            speed: 200.0,
            gear: 7.0,
            drs: 0.0,
        }
    }

    fn lap(lap_number: u32, compound: &str, samples: Vec<RawLapSample>) -> RawLap {
        RawLap {
            lap_number,
            compound: compound.to_string(),
            samples,
        }
    }

    #[test]
    fn test_lap_length_carries_into_next_lap() {
        // Lap 1 in-lap distances [0,50,100], lap 2 [0,60,120] must chain to
        // race distances [0,50,100,100,160,220].
        let laps = vec![
            lap(
                1,
                "SOFT",
                vec![sample(0.0, 0.0), sample(1.0, 50.0), sample(2.0, 100.0)],
            ),
            lap(
                2,
                "SOFT",
                vec![sample(3.0, 0.0), sample(4.0, 60.0), sample(5.0, 120.0)],
            ),
        ];

        let trace = normalize_driver("VER", &laps).unwrap();
        assert_eq!(trace.dist, vec![0.0, 50.0, 100.0, 100.0, 160.0, 220.0]);
    }

    #[test]
    fn test_in_lap_distance_shifted_to_zero() {
        // A lap whose distance channel does not start at zero is shifted so
        // its minimum becomes zero before chaining.
        let laps = vec![lap(
            1,
            "MEDIUM",
            vec![sample(0.0, 30.0), sample(1.0, 80.0), sample(2.0, 130.0)],
        )];

        let trace = normalize_driver("HAM", &laps).unwrap();
        assert_eq!(trace.dist, vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_race_distance_is_non_decreasing() {
        let laps = vec![
            lap(
                1,
                "SOFT",
                vec![sample(0.0, 10.0), sample(1.5, 95.0), sample(3.0, 150.0)],
            ),
            lap(
                2,
                "HARD",
                vec![sample(3.1, 2.0), sample(4.0, 70.0), sample(6.0, 145.0)],
            ),
            lap(3, "HARD", vec![sample(6.2, 0.0), sample(8.0, 140.0)]),
        ];

        let trace = normalize_driver("LEC", &laps).unwrap();
        for w in trace.dist.windows(2) {
            assert!(w[1] >= w[0], "race distance decreased: {:?}", w);
        }
    }

    #[test]
    fn test_empty_laps_are_skipped() {
        let laps = vec![
            lap(1, "SOFT", vec![sample(0.0, 0.0), sample(1.0, 100.0)]),
            lap(2, "SOFT", vec![]),
            lap(3, "SOFT", vec![sample(2.0, 0.0), sample(3.0, 100.0)]),
        ];

        let trace = normalize_driver("NOR", &laps).unwrap();
        // Lap 2 contributes nothing; lap 3 chains directly after lap 1.
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.dist, vec![0.0, 100.0, 100.0, 200.0]);
        assert_eq!(trace.lap, vec![1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn test_driver_with_no_samples_is_excluded() {
        let laps = vec![lap(1, "SOFT", vec![]), lap(2, "SOFT", vec![])];
        assert!(normalize_driver("SAR", &laps).is_none());
        assert!(normalize_driver("OCO", &[]).is_none());
    }

    #[test]
    fn test_overlapping_lap_telemetry_is_resorted_by_time() {
        // The first sample of lap 2 arrives before the last sample of lap 1.
        let laps = vec![
            lap(1, "SOFT", vec![sample(0.0, 0.0), sample(2.0, 100.0)]),
            lap(2, "SOFT", vec![sample(1.9, 0.0), sample(3.0, 100.0)]),
        ];

        let trace = normalize_driver("PIA", &laps).unwrap();
        assert_eq!(trace.t, vec![0.0, 1.9, 2.0, 3.0]);
        assert_eq!(trace.lap, vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_lap_and_tyre_channels_are_broadcast() {
        let laps = vec![lap(
            4,
            "WET",
            vec![sample(0.0, 0.0), sample(1.0, 50.0), sample(2.0, 100.0)],
        )];

        let trace = normalize_driver("ALO", &laps).unwrap();
        assert!(trace.lap.iter().all(|&l| l == 4.0));
        assert!(trace.tyre.iter().all(|&c| c == 5.0));
    }
}
