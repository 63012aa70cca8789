//! Protocol adapters for Fuscus
//!
//! ## Overview
//!
//! The core crate is transport-agnostic: sensors read from a guarded
//! cell, relays write through a [`CommandSink`](fuscus_core::CommandSink)
//! and telemetry goes through a
//! [`TelemetrySink`](fuscus_core::TelemetrySink). This crate provides the
//! real transports behind those seams:
//!
//! - **MQTT** ([`mqtt`]): one synchronous client plus one driver thread
//!   per device, the same shape as one paho client with `loop_start()`
//!   per device in the original deployment. Sensor topics feed raw
//!   values; relay topics carry retained ON/OFF commands so a restarted
//!   Tasmota consumer picks up the last commanded state.
//! - **HTTP telemetry** ([`telemetry`]): a Brewfather-style status push
//!   every 15 minutes. Failures are logged with the response status and
//!   never retried mid-cycle.
//!
//! ## Threading
//!
//! Every MQTT device owns its own connection and driver thread, so a
//! stalled broker session for one device cannot wedge another. All
//! publishes from the control thread are queue-and-return; the driver
//! thread does the actual network I/O.

pub mod mqtt;
pub mod telemetry;

pub use mqtt::{MqttCommandSink, MqttConfig, MqttError, MqttIngress};
pub use telemetry::{TelemetryConfig, TelemetryError, TelemetryStream};
