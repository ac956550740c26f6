// src/track_status.rs
//
// Converts the ordered track-status change events (safety car, yellow,
// red flag, ...) into non-overlapping intervals on the shared clock.

use tracing::debug;

use crate::session::TrackStatusEvent;
use crate::types::TrackStatusInterval;

/// Build status intervals from ordered change events. Each interval ends
/// where the next event starts; the final interval stays open (`None`),
/// meaning it continues to the end of the session. Times are shifted by
/// `global_min` to match the timeline grid.
pub fn build_intervals(events: &[TrackStatusEvent], global_min: f64) -> Vec<TrackStatusInterval> {
    let mut intervals: Vec<TrackStatusInterval> = Vec::with_capacity(events.len());

    for event in events {
        let start_time = event.time - global_min;

        if let Some(prev) = intervals.last_mut() {
            prev.end_time = Some(start_time);
        }

        intervals.push(TrackStatusInterval {
            status: event.status.clone(),
            start_time,
            end_time: None,
        });
    }

    debug!("Built {} track status interval(s)", intervals.len());
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: f64, status: &str) -> TrackStatusEvent {
        TrackStatusEvent {
            time,
            status: status.to_string(),
        }
    }

    #[test]
    fn test_each_interval_ends_where_next_starts() {
        let events = vec![event(0.0, "Clear"), event(50.0, "Yellow"), event(80.0, "Clear")];

        let intervals = build_intervals(&events, 0.0);
        assert_eq!(
            intervals,
            vec![
                TrackStatusInterval {
                    status: "Clear".to_string(),
                    start_time: 0.0,
                    end_time: Some(50.0),
                },
                TrackStatusInterval {
                    status: "Yellow".to_string(),
                    start_time: 50.0,
                    end_time: Some(80.0),
                },
                TrackStatusInterval {
                    status: "Clear".to_string(),
                    start_time: 80.0,
                    end_time: None,
                },
            ]
        );
    }

    #[test]
    fn test_times_shifted_by_global_min() {
        let events = vec![event(100.0, "Clear"), event(130.0, "SafetyCar")];

        let intervals = build_intervals(&events, 100.0);
        assert_eq!(intervals[0].start_time, 0.0);
        assert_eq!(intervals[0].end_time, Some(30.0));
        assert_eq!(intervals[1].start_time, 30.0);
        assert_eq!(intervals[1].end_time, None);
    }

    #[test]
    fn test_single_event_stays_open() {
        let intervals = build_intervals(&[event(0.0, "Clear")], 0.0);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].end_time, None);
    }

    #[test]
    fn test_no_events_no_intervals() {
        assert!(build_intervals(&[], 0.0).is_empty());
    }

    #[test]
    fn test_intervals_do_not_overlap() {
        let events = vec![
            event(10.0, "Clear"),
            event(25.0, "Yellow"),
            event(40.0, "Red"),
            event(60.0, "Clear"),
        ];
        let intervals = build_intervals(&events, 10.0);
        for w in intervals.windows(2) {
            assert_eq!(w[0].end_time, Some(w[1].start_time));
        }
    }
}
