//! Core control layer for Fuscus
//!
//! Turns noisy, asynchronously delivered temperature readings into
//! control-grade signals and drives binary actuators at a fixed 1 Hz
//! cadence. Designed around three rules:
//!
//! - Sensor delivery threads never block the control thread; the latest
//!   raw value lives in a guarded cell and the control thread polls it.
//! - Actuator publishes are non-blocking by contract; failures are logged
//!   and counted, never retried inside the loop.
//! - Shutdown is cooperative: a signal flips one flag, the loop notices it
//!   at the top of the next iteration and runs the exit sequence once.
//!
//! ```no_run
//! use fuscus_core::{filter::CascadedFilter, sensor::Sensor};
//!
//! let mut beer = Sensor::new(Some("fuscus/beer".into()));
//! beer.raw_cell().set(19.5);
//! beer.init();
//! beer.update();
//! assert!(beer.read_fast_filtered().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod actuator;
pub mod constants;
pub mod control;
pub mod errors;
pub mod filter;
pub mod sensor;
pub mod time;
pub mod traits;

// Public API
pub use actuator::{Actuator, CommandSink, Relay};
pub use control::{ControlLoop, LoopConfig, Shutdown};
pub use errors::{SensorError, SettingsError, SinkError};
pub use filter::CascadedFilter;
pub use sensor::{RawCell, RawFeed, Sensor};
pub use time::{Clock, FixedClock, SystemClock, Timestamp};
pub use traits::{
    Display, Link, SettingsStore, TelemetrySink, TemperatureControl, TemperatureReport,
};

/// Crate version, for status/telemetry banners.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
