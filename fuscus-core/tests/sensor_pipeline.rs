//! Sensor pipeline integration tests
//!
//! Drives a sensor through realistic tick sequences and checks the slope
//! derivation, the startup settle behavior and the feed lifecycle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fuscus_core::sensor::{RawFeed, Sensor};

/// Ticks from a fresh counter (64) until the first slope sample lands.
const TICKS_TO_FIRST_SLOPE: usize = 64;

fn passthrough_sensor(topic: &str) -> Sensor {
    // Unit coefficients make the slow filter track the raw value exactly,
    // so the slope arithmetic is checkable in closed form.
    let mut sensor = Sensor::new(Some(topic.into()));
    sensor.set_fast_filter_coefficients(&[1.0]);
    sensor.set_slow_filter_coefficients(&[1.0]);
    sensor.set_slope_filter_coefficients(&[1.0]);
    sensor
}

#[test]
fn slope_matches_per_hour_formula_in_steady_state() {
    let mut sensor = passthrough_sensor("fuscus/beer");
    let cell = sensor.raw_cell();

    // Linear ramp: +0.01 degC per 1 s tick = 36 degC/h
    let step = 0.01;
    cell.set(20.0);
    sensor.init();

    for i in 0..TICKS_TO_FIRST_SLOPE {
        cell.set(20.0 + step * (i + 1) as f64);
        sensor.update();
    }

    // Steady-state windows span exactly 3 ticks: diff = 3 * step,
    // scaled by 3600 / 3 s
    for i in TICKS_TO_FIRST_SLOPE..TICKS_TO_FIRST_SLOPE + 3 {
        cell.set(20.0 + step * (i + 1) as f64);
        sensor.update();
    }
    let slope = sensor.read_slope().unwrap();
    assert!((slope - 36.0).abs() < 1e-9, "slope {slope} != 36.0");
}

#[test]
fn slope_holds_seed_until_first_window_closes() {
    let mut sensor = passthrough_sensor("fuscus/beer");
    let cell = sensor.raw_cell();

    cell.set(20.0);
    sensor.init();
    assert_eq!(sensor.read_slope(), Some(0.0));

    for i in 0..TICKS_TO_FIRST_SLOPE - 1 {
        cell.set(20.0 + 0.01 * (i + 1) as f64);
        sensor.update();
        assert_eq!(sensor.read_slope(), Some(0.0), "tick {i}");
    }

    cell.set(20.0 + 0.01 * TICKS_TO_FIRST_SLOPE as f64);
    sensor.update();
    assert_ne!(sensor.read_slope(), Some(0.0));
}

#[test]
fn slope_updates_once_per_three_ticks() {
    let mut sensor = passthrough_sensor("fuscus/beer");
    let cell = sensor.raw_cell();

    cell.set(20.0);
    sensor.init();

    let mut raw = 20.0;
    for _ in 0..TICKS_TO_FIRST_SLOPE {
        raw += 0.01;
        cell.set(raw);
        sensor.update();
    }

    let mut changes = 0;
    let mut last = sensor.read_slope();
    let mut step = 0.02;
    for _ in 0..9 {
        // Accelerating ramp so every window's delta is distinct
        step += 0.005;
        raw += step;
        cell.set(raw);
        sensor.update();
        let current = sensor.read_slope();
        if current != last {
            changes += 1;
            last = current;
        }
    }
    // 9 ticks = exactly 3 slope windows
    assert_eq!(changes, 3);
}

#[test]
fn flat_signal_reports_zero_slope() {
    let mut sensor = passthrough_sensor("fuscus/fridge");
    let cell = sensor.raw_cell();

    cell.set(4.0);
    sensor.init();
    for _ in 0..TICKS_TO_FIRST_SLOPE + 6 {
        sensor.update();
    }
    assert_eq!(sensor.read_slope(), Some(0.0));
}

#[test]
fn peaks_come_from_the_slow_filter() {
    let mut sensor = passthrough_sensor("fuscus/fridge");
    let cell = sensor.raw_cell();

    cell.set(4.0);
    sensor.init();

    // Overshoot then turn around, the shape peak detection exists for
    for raw in [4.5, 5.0, 5.4, 5.6, 5.5] {
        cell.set(raw);
        sensor.update();
    }
    assert!(sensor.detect_pos_peak());
    assert!(!sensor.detect_neg_peak());
}

/// Feed double recording its lifecycle.
struct FakeFeed {
    stopped: Arc<AtomicBool>,
    stop_calls: Arc<AtomicUsize>,
    join_finishes: bool,
}

impl RawFeed for FakeFeed {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn join_timeout(&mut self, _timeout: Duration) -> bool {
        self.join_finishes
    }
}

#[test]
fn join_stops_the_feed_exactly_once() {
    let stopped = Arc::new(AtomicBool::new(false));
    let stop_calls = Arc::new(AtomicUsize::new(0));

    let mut sensor = Sensor::new(Some("fuscus/beer".into()));
    sensor.attach_feed(Box::new(FakeFeed {
        stopped: stopped.clone(),
        stop_calls: stop_calls.clone(),
        join_finishes: true,
    }));

    sensor.stop();
    sensor.join();
    sensor.join(); // second join: feed already gone, no panic

    assert!(stopped.load(Ordering::SeqCst));
    assert_eq!(stop_calls.load(Ordering::SeqCst), 2); // stop() + join()'s stop
}

#[test]
fn join_survives_a_stuck_feed() {
    let mut sensor = Sensor::new(Some("fuscus/beer".into()));
    sensor.attach_feed(Box::new(FakeFeed {
        stopped: Arc::new(AtomicBool::new(false)),
        stop_calls: Arc::new(AtomicUsize::new(0)),
        join_finishes: false,
    }));

    // Must return (and warn) instead of hanging
    sensor.join();
}
