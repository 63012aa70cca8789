//! Binary actuator over a retained publish channel
//!
//! A [`Relay`] presents a clean boolean interface over a possibly
//! inverted binary output (heater or compressor relay, usually a Tasmota
//! style device on the other side of the broker). The wire value is
//! always `logical XOR inverted`, and every state change goes out as a
//! retained command so the last known state survives a restart of the
//! downstream consumer.
//!
//! There is no readback path: actuator state is write-only and
//! optimistic. Publish failures must never stall the control loop, so
//! they are logged and counted at this boundary instead of propagated.

use crate::errors::SinkError;

/// Where relay commands go: an MQTT client in production, a recording
/// fake in tests.
pub trait CommandSink {
    /// Publish `payload` on `topic` with the retained flag set.
    fn publish_retained(&mut self, topic: &str, payload: &str) -> Result<(), SinkError>;
}

/// Object-safe view of a binary output, for composition roots that hold
/// heterogeneous actuators.
pub trait Actuator {
    /// Set the logical state and publish it.
    fn set_output(&mut self, state: bool);

    /// Current logical state.
    fn is_active(&self) -> bool;

    /// Convenience: `set_output(true)`.
    fn on(&mut self) {
        self.set_output(true);
    }

    /// Convenience: `set_output(false)`.
    fn off(&mut self) {
        self.set_output(false);
    }
}

/// Relay driving one output channel.
pub struct Relay<S: CommandSink> {
    sink: S,
    topic: String,
    payload_on: String,
    payload_off: String,
    inverted: bool,
    state: bool,
    failed_publishes: u64,
}

impl<S: CommandSink> Relay<S> {
    /// Connect a relay and immediately publish its initial state, so
    /// downstream consumers never see an undefined actuator.
    ///
    /// `inverted` marks active-low hardware: the published payload is the
    /// OFF token while the logical state is ON, and vice versa.
    pub fn new(
        sink: S,
        topic: impl Into<String>,
        payload_on: impl Into<String>,
        payload_off: impl Into<String>,
        inverted: bool,
        initial_state: bool,
    ) -> Self {
        let mut relay = Self {
            sink,
            topic: topic.into(),
            payload_on: payload_on.into(),
            payload_off: payload_off.into(),
            inverted,
            state: initial_state,
            failed_publishes: 0,
        };
        relay.publish();
        relay
    }

    /// Relay with the default `"ON"`/`"OFF"` token pair, initially off.
    pub fn with_defaults(sink: S, topic: impl Into<String>, inverted: bool) -> Self {
        Self::new(sink, topic, "ON", "OFF", inverted, false)
    }

    /// Channel this relay publishes on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publishes that failed since construction. Observability hook for
    /// the silent-discard gap in the original design.
    pub fn failed_publishes(&self) -> u64 {
        self.failed_publishes
    }

    /// Access the underlying sink, e.g. for channel teardown at
    /// shutdown.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn publish(&mut self) {
        let physical = self.state ^ self.inverted;
        let payload = if physical {
            self.payload_on.as_str()
        } else {
            self.payload_off.as_str()
        };

        if let Err(e) = self.sink.publish_retained(&self.topic, payload) {
            self.failed_publishes += 1;
            log::warn!("relay '{}': publish failed: {e}", self.topic);
        }
    }
}

impl<S: CommandSink> Actuator for Relay<S> {
    /// Store the new logical state and re-publish unconditionally.
    ///
    /// Publishing even when the state is unchanged is intentional:
    /// callers rely on it to refresh the retained message after a broker
    /// reconnect.
    fn set_output(&mut self, state: bool) {
        self.state = state;
        self.publish();
    }

    fn is_active(&self) -> bool {
        self.state
    }
}
