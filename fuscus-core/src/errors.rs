//! Error types for the control core
//!
//! The taxonomy is deliberately small and local: every error is handled by
//! the component that detects it. Sensor problems degrade to "no data"
//! reads, publish problems are logged and counted, and nothing here is
//! process-fatal except a settings failure during setup.

use thiserror::Error;

/// Sensor-side failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No topic configured, or no value has ever arrived. Permanent for
    /// the run; callers hold their last control decision.
    #[error("sensor unavailable: no data source")]
    Unavailable,

    /// A value arrived in the past but the staleness counter exceeds the
    /// re-seed threshold; filtered outputs are suspect until recovery.
    #[error("sensor stale: {failed_reads} consecutive missed reads")]
    Stale {
        /// Saturating count of consecutive missed reads.
        failed_reads: u8,
    },
}

/// Actuator command-channel failures.
///
/// Swallowed at the actuator boundary by contract (the control loop must
/// never stall on a stuck broker); the relay logs and counts them.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The underlying publish call failed.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish {
        /// Channel the command was destined for.
        topic: String,
        /// Broker/transport error text.
        reason: String,
    },

    /// The channel client is not connected.
    #[error("command channel not connected")]
    NotConnected,
}

/// Settings-store failures during setup.
///
/// The only error class the scheduler treats as fatal: a controller with
/// unknown persisted settings must not start driving outputs.
#[derive(Error, Debug)]
#[error("failed to apply persisted settings: {0}")]
pub struct SettingsError(
    /// Reason text from the store.
    pub String,
);
