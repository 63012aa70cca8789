//! Temperature sensor with asynchronous ingestion and cascaded filtering
//!
//! A [`Sensor`] turns an unreliable, asynchronously delivered raw value
//! into three control-grade signals plus liveness information:
//!
//! - fast filter: low lag, still noisy — drives the responsive side of
//!   the decision logic
//! - slow filter: high lag, stable — the signal used for trend and peak
//!   detection
//! - slope filter: rate of change of the slow signal, reported per hour
//!
//! Delivery happens on whatever thread the subscription client owns; the
//! sensor only ever sees the latest value through a [`RawCell`]. The
//! control thread polls it once per tick via [`Sensor::update`]. A cell
//! with no value yet means the sensor is disconnected or has never
//! answered, which bumps the saturating failed-read counter.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::constants::{
    DEFAULT_FAST_COEFFICIENTS, DEFAULT_SLOPE_COEFFICIENTS, DEFAULT_SLOW_COEFFICIENTS,
    JOIN_TIMEOUT_MS, MAX_FAILED_READS, SLOPE_BASELINE_SNAPSHOT_TICK, SLOPE_PERIOD_TICKS,
    SLOPE_SCALE_PER_HOUR, STALE_RESEED_THRESHOLD, STARTUP_SETTLE_TICKS,
};
use crate::errors::SensorError;
use crate::filter::CascadedFilter;

/// Guarded latest-value cell shared between a subscription thread and the
/// control thread.
///
/// Single-writer/single-reader, last-write-wins. A mutex (not a bare
/// scalar) so the cross-thread handoff is defined behavior on every
/// platform; the critical section is a single copy, so contention is
/// negligible at 1 Hz.
#[derive(Debug, Clone, Default)]
pub struct RawCell(Arc<Mutex<Option<f64>>>);

impl RawCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cached raw value. Called from the delivery thread.
    pub fn set(&self, value: f64) {
        *self.lock() = Some(value);
    }

    /// Read the most recent raw value, if any has ever arrived.
    pub fn get(&self) -> Option<f64> {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<f64>> {
        // A poisoned cell still holds a valid Option<f64>
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to a background subscription delivering raw values.
///
/// Implementations live in the connector crates; the core only needs the
/// lifecycle. Both methods must be idempotent and safe to call on a feed
/// whose thread never started.
pub trait RawFeed: Send {
    /// Ask the subscription to unsubscribe and shut down its thread.
    fn stop(&mut self);

    /// Wait up to `timeout` for the delivery thread to terminate.
    /// Returns `false` if the thread is still running at the deadline.
    fn join_timeout(&mut self, timeout: Duration) -> bool;
}

/// One temperature sensor: ingestion cell, staleness tracking and the
/// fast/slow/slope filter triple.
pub struct Sensor {
    topic: Option<String>,
    raw: RawCell,
    feed: Option<Box<dyn RawFeed>>,

    failed_read_count: u8,
    update_counter: u8,

    fast_filter: CascadedFilter,
    slow_filter: CascadedFilter,
    slope_filter: CascadedFilter,
    prev_output_for_slope: Option<f64>,

    /// Additive calibration offset. Stored here, applied by the decision
    /// logic when it reads the filtered values.
    pub calibration_offset: f64,
}

impl Sensor {
    /// Create a sensor for `topic`.
    ///
    /// `None` marks a sensor with no hardware behind it: no feed will
    /// ever be attached and [`update`](Self::update) only accumulates
    /// failed reads. The failed-read counter starts saturated so the
    /// first live reading triggers a filter seed via
    /// [`init`](Self::init).
    pub fn new(topic: Option<String>) -> Self {
        Self {
            topic,
            raw: RawCell::new(),
            feed: None,
            failed_read_count: MAX_FAILED_READS,
            update_counter: STARTUP_SETTLE_TICKS,
            fast_filter: CascadedFilter::new(&DEFAULT_FAST_COEFFICIENTS),
            slow_filter: CascadedFilter::new(&DEFAULT_SLOW_COEFFICIENTS),
            slope_filter: CascadedFilter::new(&DEFAULT_SLOPE_COEFFICIENTS),
            prev_output_for_slope: None,
            calibration_offset: 0.0,
        }
    }

    /// Topic this sensor listens on, if any.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Whether a data source is configured at all.
    pub fn is_connected(&self) -> bool {
        self.topic.is_some()
    }

    /// Cell the subscription writes into. Clone it into the feed.
    pub fn raw_cell(&self) -> RawCell {
        self.raw.clone()
    }

    /// Attach the background subscription delivering this sensor's topic.
    pub fn attach_feed(&mut self, feed: Box<dyn RawFeed>) {
        self.feed = Some(feed);
    }

    /// Consecutive missed reads, saturating at 255.
    pub fn failed_read_count(&self) -> u8 {
        self.failed_read_count
    }

    /// Re-seed the filters after a long disconnect.
    ///
    /// Once the staleness counter has passed the threshold, the smoothed
    /// values no longer track reality and waiting for the cascade to
    /// converge back would cost many cycles. If a live raw value is
    /// available, all three filters are re-initialized from it (slope to
    /// zero) and the counter resets. Called every tick by the decision
    /// logic; a no-op while the sensor is healthy.
    pub fn init(&mut self) {
        if self.failed_read_count <= STALE_RESEED_THRESHOLD {
            return;
        }
        if let Some(raw) = self.raw.get() {
            log::debug!(
                "sensor {:?}: re-seeding filters at {raw} after {} missed reads",
                self.topic,
                self.failed_read_count
            );
            self.fast_filter.init(raw);
            self.slow_filter.init(raw);
            self.slope_filter.init(0.0);
            self.prev_output_for_slope = self.slow_filter.read_output();
            self.failed_read_count = 0;
        }
    }

    /// Advance the filter pipeline by one control tick.
    ///
    /// With no raw value the staleness counter bumps and the filters are
    /// left untouched. Otherwise the raw value feeds the fast and slow
    /// filters every tick, and the slope filter once per
    /// [`SLOPE_PERIOD_TICKS`](crate::constants::SLOPE_PERIOD_TICKS) with
    /// the slow-filter delta scaled to a per-hour rate. The first slope baseline is snapshotted once,
    /// mid-countdown, so the startup transient never shows up as a rate.
    pub fn update(&mut self) {
        let Some(raw) = self.raw.get() else {
            self.failed_read_count = self.failed_read_count.saturating_add(1);
            return;
        };

        self.fast_filter.add(raw);
        self.slow_filter.add(raw);

        self.update_counter = self.update_counter.saturating_sub(1);

        if self.update_counter == SLOPE_BASELINE_SNAPSHOT_TICK {
            // Happens exactly once, shortly after startup
            self.prev_output_for_slope = self.slow_filter.read_output();
        }

        if self.update_counter == 0 {
            if let (Some(current), Some(baseline)) =
                (self.slow_filter.read_output(), self.prev_output_for_slope)
            {
                let diff = current - baseline;
                self.slope_filter.add(diff * SLOPE_SCALE_PER_HOUR);
                self.prev_output_for_slope = Some(current);
            }
            self.update_counter = SLOPE_PERIOD_TICKS;
        }
    }

    /// Fast-filtered temperature, if the pipeline has seen data.
    pub fn read_fast_filtered(&self) -> Option<f64> {
        self.fast_filter.read_output()
    }

    /// Slow-filtered temperature, if the pipeline has seen data.
    pub fn read_slow_filtered(&self) -> Option<f64> {
        self.slow_filter.read_output()
    }

    /// Temperature slope in degrees per hour.
    pub fn read_slope(&self) -> Option<f64> {
        self.slope_filter.read_output()
    }

    /// Local maximum in the slow-filtered trend on the last update.
    pub fn detect_pos_peak(&self) -> bool {
        self.slow_filter.detect_pos_peak()
    }

    /// Local minimum in the slow-filtered trend on the last update.
    pub fn detect_neg_peak(&self) -> bool {
        self.slow_filter.detect_neg_peak()
    }

    /// Replace the fast filter tuning; state is preserved.
    pub fn set_fast_filter_coefficients(&mut self, coeffs: &[f64]) {
        self.fast_filter.set_coefficients(coeffs);
    }

    /// Replace the slow filter tuning; state is preserved.
    pub fn set_slow_filter_coefficients(&mut self, coeffs: &[f64]) {
        self.slow_filter.set_coefficients(coeffs);
    }

    /// Replace the slope filter tuning; state is preserved.
    pub fn set_slope_filter_coefficients(&mut self, coeffs: &[f64]) {
        self.slope_filter.set_coefficients(coeffs);
    }

    /// Capability probes, reserved for future hardware-backed sensors
    /// that might lack a filter stage.
    pub fn has_fast_filter(&self) -> bool {
        true
    }

    /// See [`has_fast_filter`](Self::has_fast_filter).
    pub fn has_slow_filter(&self) -> bool {
        true
    }

    /// See [`has_fast_filter`](Self::has_fast_filter).
    pub fn has_slope_filter(&self) -> bool {
        true
    }

    /// Liveness classification for callers that want an error value.
    pub fn status(&self) -> Result<(), SensorError> {
        if self.raw.get().is_none() {
            return Err(SensorError::Unavailable);
        }
        if self.failed_read_count > STALE_RESEED_THRESHOLD {
            return Err(SensorError::Stale {
                failed_reads: self.failed_read_count,
            });
        }
        Ok(())
    }

    /// Ask the subscription to stop. Idempotent, safe without a feed.
    pub fn stop(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            feed.stop();
        }
    }

    /// Stop and wait (bounded) for the subscription thread to finish.
    ///
    /// A thread that refuses to die is reported and abandoned rather
    /// than hanging shutdown forever.
    pub fn join(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.stop();
            if !feed.join_timeout(Duration::from_millis(JOIN_TIMEOUT_MS)) {
                log::warn!(
                    "sensor {:?}: subscription thread did not stop within {JOIN_TIMEOUT_MS} ms, abandoning it",
                    self.topic
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_topic_sensor_never_touches_filters() {
        let mut sensor = Sensor::new(None);
        for _ in 0..10 {
            sensor.update();
        }
        assert_eq!(sensor.read_fast_filtered(), None);
        assert_eq!(sensor.read_slow_filtered(), None);
        assert_eq!(sensor.read_slope(), None);
    }

    #[test]
    fn failed_read_count_saturates() {
        let mut sensor = Sensor::new(None);
        // Counter starts saturated; hammering update must not wrap it
        for _ in 0..300 {
            sensor.update();
        }
        assert_eq!(sensor.failed_read_count(), 255);
    }

    #[test]
    fn init_reseeds_from_live_value() {
        let mut sensor = Sensor::new(Some("fuscus/beer".into()));
        sensor.raw_cell().set(20.0);

        // Fresh sensor: counter is saturated, well past the threshold
        assert!(sensor.failed_read_count() > STALE_RESEED_THRESHOLD);
        sensor.init();

        assert_eq!(sensor.read_fast_filtered(), Some(20.0));
        assert_eq!(sensor.read_slow_filtered(), Some(20.0));
        assert_eq!(sensor.read_slope(), Some(0.0));
        assert_eq!(sensor.failed_read_count(), 0);
    }

    #[test]
    fn init_without_value_keeps_waiting() {
        let mut sensor = Sensor::new(Some("fuscus/beer".into()));
        sensor.init();
        assert_eq!(sensor.read_fast_filtered(), None);
        assert_eq!(sensor.failed_read_count(), 255);
    }

    #[test]
    fn init_is_a_noop_while_healthy() {
        let mut sensor = Sensor::new(Some("fuscus/beer".into()));
        sensor.raw_cell().set(20.0);
        sensor.init();

        sensor.raw_cell().set(25.0);
        sensor.init();
        // Still the seeded value: no re-seed at failed_read_count == 0
        assert_eq!(sensor.read_slow_filtered(), Some(20.0));
    }

    #[test]
    fn status_reflects_liveness() {
        let sensor = Sensor::new(None);
        assert_eq!(sensor.status(), Err(SensorError::Unavailable));

        let mut live = Sensor::new(Some("fuscus/fridge".into()));
        live.raw_cell().set(4.0);
        assert_eq!(
            live.status(),
            Err(SensorError::Stale { failed_reads: 255 })
        );
        live.init();
        assert_eq!(live.status(), Ok(()));
    }

    #[test]
    fn stop_and_join_without_feed_are_safe() {
        let mut sensor = Sensor::new(None);
        sensor.stop();
        sensor.join();
        sensor.join(); // idempotent
    }
}
