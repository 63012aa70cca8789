//! The 1 Hz control loop and its shutdown plumbing
//!
//! One control thread runs [`ControlLoop::run`]. Every iteration it
//! checks whether a whole second has elapsed (wall clock, not iteration
//! count — I/O jitter must not compress ticks), and if so runs one tick:
//! sensor update, peak detection, PID, state update, actuator commit,
//! display refresh, strictly in that order. Between ticks it services the
//! inbound link for a bounded slice, pushes telemetry every 15 minutes,
//! and sleeps briefly.
//!
//! Termination is cooperative. SIGINT/SIGTERM flip the [`Shutdown`] flag
//! and nothing else; the loop notices at the top of the next iteration
//! and runs the exit sequence exactly once: outputs off first, then the
//! display notice, then link cleanup, then bounded sensor-thread joins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::constants::{LOOP_SLEEP_MS, TELEMETRY_INTERVAL_MS, TICK_INTERVAL_MS};
use crate::errors::SettingsError;
use crate::time::{round_to_second, Clock, SystemClock, Timestamp};
use crate::traits::{Display, Link, SettingsStore, TelemetrySink, TemperatureControl};

/// Cooperative stop flag shared between signal handlers and the loop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    running: Arc<AtomicBool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create a token in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Map SIGINT and SIGTERM to [`request_stop`](Self::request_stop).
    ///
    /// The handler stores one flag and returns; it must never block or
    /// call into filters or actuators.
    pub fn install_signal_handlers(&self) -> Result<(), ctrlc::Error> {
        let running = Arc::clone(&self.running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
    }

    /// Has nobody asked us to stop yet?
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop at its next iteration.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Loop cadence configuration.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Control tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum spacing between telemetry pushes in milliseconds.
    pub telemetry_interval_ms: u64,
    /// Idle sleep between loop iterations in milliseconds.
    pub idle_sleep_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            telemetry_interval_ms: TELEMETRY_INTERVAL_MS,
            idle_sleep_ms: LOOP_SLEEP_MS,
        }
    }
}

impl LoopConfig {
    /// Override the tick period.
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Override the telemetry spacing.
    pub fn telemetry_interval_ms(mut self, ms: u64) -> Self {
        self.telemetry_interval_ms = ms;
        self
    }

    /// Override the idle sleep.
    pub fn idle_sleep_ms(mut self, ms: u64) -> Self {
        self.idle_sleep_ms = ms;
        self
    }
}

/// The scheduler: owns the collaborator graph and drives it.
///
/// Constructed once at startup as an explicit composition root; nothing
/// here is a process-wide singleton.
pub struct ControlLoop<C, L, D, T>
where
    C: TemperatureControl,
    L: Link,
    D: Display,
    T: TelemetrySink,
{
    controller: C,
    link: L,
    display: D,
    telemetry: T,
    clock: Box<dyn Clock>,
    config: LoopConfig,
    last_update: Option<Timestamp>,
    last_telemetry_push: Option<Timestamp>,
}

impl<C, L, D, T> ControlLoop<C, L, D, T>
where
    C: TemperatureControl,
    L: Link,
    D: Display,
    T: TelemetrySink,
{
    /// Assemble the loop with the system clock and default cadences.
    pub fn new(controller: C, link: L, display: D, telemetry: T) -> Self {
        Self {
            controller,
            link,
            display,
            telemetry,
            clock: Box::new(SystemClock),
            config: LoopConfig::default(),
            last_update: None,
            last_telemetry_push: None,
        }
    }

    /// Replace the clock (tests).
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the cadence configuration.
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Borrow the controller, e.g. to inspect state between ticks.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// One-time setup: apply persisted settings and render the initial
    /// display page. A settings failure is fatal by design.
    pub fn setup(&mut self, settings: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        settings.apply_settings()?;
        self.display.print_stationary_text();
        log::info!("init complete");
        Ok(())
    }

    /// Run one control tick if a full tick interval has elapsed.
    ///
    /// Returns whether the tick ran. `last_update` snaps to the nearest
    /// whole second so ticks stay phase-aligned with wall-clock time.
    pub fn tick(&mut self, now: Timestamp) -> bool {
        let due = self
            .last_update
            .map_or(true, |last| now.saturating_sub(last) >= self.config.tick_interval_ms);
        if !due {
            return false;
        }
        self.last_update = Some(round_to_second(now));

        self.controller.update_temperatures();
        self.controller.detect_peaks();
        self.controller.update_pid();

        let old_state = self.controller.state();
        self.controller.update_state();
        let new_state = self.controller.state();

        if old_state != new_state {
            log::info!("state changed from {old_state} to {new_state}");
            // A data point at every state transition, independent of the
            // telemetry cadence
            self.link.print_temperatures();
        }

        self.controller.update_outputs();

        let report = self.controller.temperatures();
        self.display.print_stationary_text();
        self.display.print_mode();
        self.display.print_state(&new_state.to_string());
        self.display.print_all_temperatures(&report);

        true
    }

    /// Push a status record if the telemetry interval has passed.
    pub fn maybe_push_telemetry(&mut self, now: Timestamp) -> bool {
        let due = self.last_telemetry_push.map_or(true, |last| {
            now.saturating_sub(last) > self.config.telemetry_interval_ms
        });
        if !due {
            return false;
        }
        let report = self.controller.temperatures();
        self.telemetry.push(&report);
        self.last_telemetry_push = Some(round_to_second(now));
        true
    }

    /// Main loop: run until `shutdown` flips, then execute the exit
    /// sequence once.
    pub fn run(&mut self, shutdown: &Shutdown) {
        while shutdown.is_running() {
            let now = self.clock.now();
            self.tick(now);

            // Bounded by the Link contract, not by us
            self.link.receive();

            self.maybe_push_telemetry(now);

            thread::sleep(Duration::from_millis(self.config.idle_sleep_ms));
        }
        self.shutdown_sequence();
    }

    /// Exit sequence. Actuators are forced off before any thread join is
    /// attempted, and every step is best-effort.
    fn shutdown_sequence(&mut self) {
        log::info!("stop requested, shutting down");

        self.controller.force_outputs_off();
        self.display.print_at(0, 5, "Shutting down.");
        self.link.cleanup();
        self.controller.stop_sensors();

        log::info!("finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_token_flips_once() {
        let shutdown = Shutdown::new();
        assert!(shutdown.is_running());

        let clone = shutdown.clone();
        clone.request_stop();
        assert!(!shutdown.is_running());

        // Idempotent
        shutdown.request_stop();
        assert!(!shutdown.is_running());
    }

    #[test]
    fn loop_config_builder() {
        let config = LoopConfig::default()
            .tick_interval_ms(500)
            .telemetry_interval_ms(60_000)
            .idle_sleep_ms(10);
        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.telemetry_interval_ms, 60_000);
        assert_eq!(config.idle_sleep_ms, 10);
    }
}
