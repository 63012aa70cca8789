//! Collaborator contracts consumed by the control loop
//!
//! The scheduler drives everything through these traits. The decision
//! logic, serial/TCP link, display, settings store and telemetry endpoint
//! are all external collaborators: the core defines their call contracts
//! and owns nothing about their internals.

use serde::Serialize;

use crate::errors::SettingsError;

/// The three temperatures the system reports downstream. `None` means the
/// corresponding sensor has no data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReport {
    /// Beer (process) temperature, calibrated, slow-filtered.
    pub beer: Option<f64>,
    /// Fridge (chamber) temperature.
    pub fridge: Option<f64>,
    /// Ambient (room) temperature.
    pub room: Option<f64>,
}

/// The external decision logic ("temperature controller").
///
/// Owns the sensors and actuators it reads and drives; the scheduler
/// only sequences the calls. Within one tick the order is fixed:
/// temperatures, peaks, PID, state, outputs — no output commit ever
/// precedes that tick's verdict.
pub trait TemperatureControl {
    /// Opaque state token, compared across ticks to detect transitions.
    type State: Copy + PartialEq + std::fmt::Display;

    /// Pull sensor readings into the controller's model (runs each
    /// sensor's update and staleness recovery).
    fn update_temperatures(&mut self);

    /// Run peak detection over the slow-filtered signals.
    fn detect_peaks(&mut self);

    /// Advance the control algorithm.
    fn update_pid(&mut self);

    /// Compute the new desired state from the updated model.
    fn update_state(&mut self);

    /// Current state token.
    fn state(&self) -> Self::State;

    /// Commit the verdict to the actuators.
    fn update_outputs(&mut self);

    /// Calibrated temperatures for display and telemetry.
    fn temperatures(&self) -> TemperatureReport;

    /// Shutdown hook: force every owned actuator off.
    fn force_outputs_off(&mut self);

    /// Shutdown hook: stop and join every owned sensor thread (bounded).
    fn stop_sensors(&mut self);
}

/// The message/command channel (serial or TCP "link").
pub trait Link {
    /// Service pending inbound requests. Must return within a bounded
    /// slice so the 1 Hz cadence is preserved.
    fn receive(&mut self);

    /// Emit a telemetry line; called on every state transition.
    fn print_temperatures(&mut self);

    /// Release the channel at shutdown. Best-effort.
    fn cleanup(&mut self);
}

/// The LCD (or whatever renders status). Pure side-effecting sinks; the
/// core relies on no return values and treats every call as idempotent.
pub trait Display {
    /// Render the static frame (labels, clock line).
    fn print_stationary_text(&mut self);

    /// Render the current mode field.
    fn print_mode(&mut self);

    /// Render the current state field.
    fn print_state(&mut self, state: &str);

    /// Render all temperature fields.
    fn print_all_temperatures(&mut self, report: &TemperatureReport);

    /// Write `text` at a character position. Used for the shutdown notice.
    fn print_at(&mut self, col: u8, row: u8, text: &str);
}

/// EEPROM-style persisted settings. Consulted exactly once, at startup.
pub trait SettingsStore {
    /// Load persisted settings into the controller. A failure here is the
    /// one fatal error in the system: we refuse to run with unknown
    /// setpoints.
    fn apply_settings(&mut self) -> Result<(), SettingsError>;
}

/// Remote logging endpoint, pushed at most once per telemetry interval.
pub trait TelemetrySink {
    /// Push one status record. Implementations log their own failures;
    /// the scheduler neither retries nor cares.
    fn push(&mut self, report: &TemperatureReport);
}
