//! Instantaneous frames-per-second
//!
//! Each completed request reports `1 / (completed - dispatched)`, rounded to
//! two decimals. There is no smoothing: the figure describes one request.

use std::time::{Duration, Instant};

/// FPS for a single request interval in seconds, rounded to two decimals
///
/// Returns `None` for zero, negative or non-finite intervals.
pub fn fps_from_interval(interval_secs: f64) -> Option<f64> {
    if !interval_secs.is_finite() || interval_secs <= 0.0 {
        return None;
    }
    Some(((1.0 / interval_secs) * 100.0).round() / 100.0)
}

/// FPS between a dispatch and a completion timestamp
pub fn instantaneous_fps(dispatched_at: Instant, completed_at: Instant) -> Option<f64> {
    let elapsed = completed_at.checked_duration_since(dispatched_at)?;
    fps_from_duration(elapsed)
}

pub fn fps_from_duration(elapsed: Duration) -> Option<f64> {
    fps_from_interval(elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forty_millis_is_twenty_five_fps() {
        let start = 0.000_f64;
        let stop = 0.040_f64;
        assert_eq!(fps_from_interval(stop - start), Some(25.0));
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        // 1 / 0.03 = 33.333...
        assert_eq!(fps_from_interval(0.03), Some(33.33));
        // 1 / 0.007 = 142.857...
        assert_eq!(fps_from_interval(0.007), Some(142.86));
    }

    #[test]
    fn test_degenerate_intervals() {
        assert_eq!(fps_from_interval(0.0), None);
        assert_eq!(fps_from_interval(-0.5), None);
        assert_eq!(fps_from_interval(f64::NAN), None);
    }

    #[test]
    fn test_instants() {
        let start = Instant::now();
        let stop = start + Duration::from_millis(50);
        assert_eq!(instantaneous_fps(start, stop), Some(20.0));
        assert_eq!(instantaneous_fps(stop, start), None);
    }
}
