//! Remote telemetry push over HTTP
//!
//! Pushes a Brewfather-style status record: a small JSON document with
//! the three temperatures, posted to a stream endpoint identified by an
//! opaque id. The scheduler calls this at most once per 15 minutes (plus
//! never from anywhere but the control thread), so the client here is a
//! plain blocking [`ureq`] agent with a request timeout well under the
//! telemetry interval.
//!
//! Failure policy per the control loop's contract: log the status or
//! transport error and move on. No retries, no queueing — a status
//! record is worthless by the time a retry would land, and nothing here
//! may stall the 1 Hz cadence.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use fuscus_core::traits::{TelemetrySink, TemperatureReport};

/// Telemetry push errors. Logged by [`TelemetryStream::push`], surfaced
/// by [`TelemetryStream::try_push`] for callers that want them.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Endpoint answered with a non-2xx status.
    #[error("telemetry endpoint returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Network-level failure.
    #[error("telemetry transport error: {0}")]
    Transport(String),
}

/// Telemetry endpoint settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Base stream URL; the stream id is appended as `?id=`.
    pub endpoint: String,
    /// Opaque stream id issued by the logging service.
    pub stream_id: String,
    /// Device name reported in each record.
    pub name: String,
    /// Batch/beer label reported in each record.
    pub beer: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl TelemetryConfig {
    /// Configuration for the default Brewfather stream endpoint.
    pub fn new(stream_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            endpoint: "http://log.brewfather.net/stream".into(),
            stream_id: stream_id.into(),
            name: name.into(),
            beer: "BeerFridge Beer".into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the reported beer label.
    pub fn beer(mut self, beer: impl Into<String>) -> Self {
        self.beer = beer.into();
        self
    }

    /// Override the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One status record on the wire.
#[derive(Debug, Serialize, PartialEq)]
struct StatusRecord<'a> {
    name: &'a str,
    temp: Option<f64>,
    aux_temp: Option<f64>,
    ext_temp: Option<f64>,
    temp_unit: &'static str,
    beer: &'a str,
}

/// HTTP telemetry stream.
pub struct TelemetryStream {
    config: TelemetryConfig,
    agent: ureq::Agent,
}

impl TelemetryStream {
    /// Build the stream client.
    pub fn new(config: TelemetryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&format!("fuscus/{}", fuscus_core::VERSION))
            .build();
        Self { config, agent }
    }

    fn record<'a>(&'a self, report: &TemperatureReport) -> StatusRecord<'a> {
        StatusRecord {
            name: &self.config.name,
            temp: report.beer,
            aux_temp: report.fridge,
            ext_temp: report.room,
            temp_unit: "C",
            beer: &self.config.beer,
        }
    }

    /// Push one record, returning the outcome.
    pub fn try_push(&self, report: &TemperatureReport) -> Result<u16, TelemetryError> {
        let url = format!("{}?id={}", self.config.endpoint, self.config.stream_id);
        let record = self.record(report);

        match self.agent.post(&url).send_json(&record) {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(status, _)) => Err(TelemetryError::Status { status }),
            Err(ureq::Error::Transport(e)) => Err(TelemetryError::Transport(e.to_string())),
        }
    }
}

impl TelemetrySink for TelemetryStream {
    fn push(&mut self, report: &TemperatureReport) {
        match self.try_push(report) {
            Ok(status) => log::debug!("telemetry push ok, status {status}"),
            Err(e) => log::warn!("telemetry push failed: {e}"),
        }
    }
}
