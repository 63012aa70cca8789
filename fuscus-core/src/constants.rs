//! Tuning constants for the control loop and filter cascade
//!
//! Every number the controller depends on lives here with its rationale.
//! These match the cadences the original BrewPi-derived tuning assumed:
//! a 1 second control tick and a slope sample every 3 ticks.

/// Control tick period in milliseconds.
///
/// Sensor updates, peak detection, PID and actuator commits all run on
/// this cadence. The loop gates on elapsed wall-clock time, not iteration
/// count, so I/O jitter cannot compress ticks.
pub const TICK_INTERVAL_MS: u64 = 1_000;

/// Idle sleep between loop iterations in milliseconds.
///
/// The loop's only voluntary suspension point besides the bounded link
/// poll. Short enough that shutdown latency is dominated by the tick
/// work itself.
pub const LOOP_SLEEP_MS: u64 = 50;

/// Minimum spacing between remote telemetry pushes in milliseconds (15 min).
pub const TELEMETRY_INTERVAL_MS: u64 = 900_000;

/// Slope sampling period in control ticks.
///
/// The slope filter is fed once every `SLOPE_PERIOD_TICKS` ticks with the
/// slow-filter delta over that window.
pub const SLOPE_PERIOD_TICKS: u8 = 3;

/// Initial value of the sensor update counter.
///
/// Deliberately much larger than the steady-state period so the first
/// slope sample is taken well after the filters have settled from their
/// startup transient.
pub const STARTUP_SETTLE_TICKS: u8 = 64;

/// Counter value at which the slope baseline is snapshotted once after
/// startup. Must be above zero and below [`STARTUP_SETTLE_TICKS`].
pub const SLOPE_BASELINE_SNAPSHOT_TICK: u8 = 4;

/// Scale factor converting a slow-filter delta per slope window into a
/// per-hour rate: 3600 s / (3 ticks x 1 s) = 1200.
pub const SLOPE_SCALE_PER_HOUR: f64 =
    3600.0 / (SLOPE_PERIOD_TICKS as f64 * (TICK_INTERVAL_MS as f64 / 1000.0));

/// Saturation limit for the failed-read counter.
pub const MAX_FAILED_READS: u8 = 255;

/// Failed-read count above which the filters are considered stale and
/// eligible for a re-seed from the next live reading.
pub const STALE_RESEED_THRESHOLD: u8 = 60;

/// Maximum number of smoothing stages in one cascaded filter.
pub const MAX_FILTER_STAGES: usize = 4;

/// Default stage coefficients for the fast (low-lag) filter.
pub const DEFAULT_FAST_COEFFICIENTS: [f64; 3] = [0.5, 0.5, 0.5];

/// Default stage coefficients for the slow (trend/peak) filter.
pub const DEFAULT_SLOW_COEFFICIENTS: [f64; 3] = [0.25, 0.25, 0.25];

/// Default stage coefficients for the slope (rate-per-hour) filter.
pub const DEFAULT_SLOPE_COEFFICIENTS: [f64; 3] = [0.25, 0.25, 0.25];

/// How long a stop request waits for a subscription thread before giving
/// up and reporting it stuck, in milliseconds.
pub const JOIN_TIMEOUT_MS: u64 = 5_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slope_scale_is_per_hour() {
        // 3 ticks of 1 s each -> 1200 windows per hour
        assert_eq!(SLOPE_SCALE_PER_HOUR, 1200.0);
    }

    #[test]
    fn baseline_snapshot_inside_settle_window() {
        assert!(SLOPE_BASELINE_SNAPSHOT_TICK > SLOPE_PERIOD_TICKS);
        assert!(SLOPE_BASELINE_SNAPSHOT_TICK < STARTUP_SETTLE_TICKS);
    }
}
