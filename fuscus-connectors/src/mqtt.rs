//! MQTT ingestion and relay channels
//!
//! Each device — every subscribed sensor and every relay — owns its own
//! synchronous [`rumqttc`] client and a named driver thread pumping the
//! connection event loop. That matches the original deployment (one
//! client per device with its own network loop) and isolates a wedged
//! session to the one device it belongs to.
//!
//! The control thread never does network I/O here: subscribing sensors
//! receive values on the driver thread, which writes them into the
//! sensor's [`RawCell`]; relay publishes are queued to the driver thread
//! and flushed by it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use thiserror::Error;

use fuscus_core::errors::SinkError;
use fuscus_core::sensor::{RawCell, RawFeed};
use fuscus_core::CommandSink;

/// MQTT channel errors.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Subscribe/publish/disconnect request could not be queued.
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The driver thread could not be spawned.
    #[error("failed to spawn mqtt driver thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Broker connection settings shared by all devices.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker hostname or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Prefix for per-device client ids.
    pub client_id_prefix: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
}

impl MqttConfig {
    /// Configuration for `host` with the usual defaults (port 1883,
    /// 30 s keep-alive, `fuscus` client-id prefix).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 1883,
            client_id_prefix: "fuscus".into(),
            keep_alive: Duration::from_secs(30),
        }
    }

    /// Override the broker port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the client-id prefix.
    pub fn client_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.client_id_prefix = prefix.into();
        self
    }

    /// Override the keep-alive interval.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    fn options(&self, device: &str) -> MqttOptions {
        // One client id per device; a slash in a topic is not valid here
        let id = format!("{}-{}", self.client_id_prefix, device.replace('/', "-"));
        let mut options = MqttOptions::new(id, self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options
    }
}

/// Parse a sensor payload as a temperature reading.
fn parse_temperature(payload: &[u8]) -> Option<f64> {
    String::from_utf8_lossy(payload).trim().parse::<f64>().ok()
}

/// Driver thread around one connection's event loop.
struct Driver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Driver {
    /// Pump `connection` on a named thread, handing publishes to
    /// `on_publish`. On every (re)connect ack, `on_connect` runs so a
    /// subscription can be re-issued — the broker may have dropped the
    /// session while we were away.
    fn spawn(
        name: String,
        mut connection: Connection,
        mut on_publish: impl FnMut(rumqttc::Publish) + Send + 'static,
        mut on_connect: impl FnMut() + Send + 'static,
    ) -> Result<Self, std::io::Error> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new().name(name).spawn(move || {
            for event in connection.iter() {
                if thread_stop.load(Ordering::SeqCst) {
                    break;
                }
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => on_publish(publish),
                    Ok(Event::Incoming(Packet::ConnAck(_))) => on_connect(),
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("mqtt connection error: {e}");
                        // iter() keeps reconnecting; don't spin while the
                        // broker is down
                        thread::sleep(Duration::from_secs(1));
                    }
                }
            }
        })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait up to `timeout` for the thread; `false` abandons it.
    fn join_timeout(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        let _ = handle.join();
        true
    }
}

/// Background subscription feeding one sensor topic into a [`RawCell`].
pub struct MqttIngress {
    client: Client,
    driver: Driver,
    topic: String,
    stopped: bool,
}

impl MqttIngress {
    /// Connect, subscribe to `topic` and start delivering values.
    ///
    /// Payloads that do not parse as a number are logged and dropped; the
    /// cell keeps its previous value.
    pub fn subscribe(config: &MqttConfig, topic: &str, cell: RawCell) -> Result<Self, MqttError> {
        let (client, connection) = Client::new(config.options(topic), 10);
        client.subscribe(topic, QoS::AtMostOnce)?;

        let publish_topic = topic.to_string();
        let on_publish = move |publish: rumqttc::Publish| {
            if publish.topic != publish_topic {
                return;
            }
            match parse_temperature(&publish.payload) {
                Some(value) => {
                    log::debug!("update for {publish_topic}: {value}");
                    cell.set(value);
                }
                None => log::warn!(
                    "non-numeric payload on {publish_topic}: {:?}",
                    String::from_utf8_lossy(&publish.payload)
                ),
            }
        };

        let resub_client = client.clone();
        let resub_topic = topic.to_string();
        let on_connect = move || {
            if let Err(e) = resub_client.try_subscribe(&resub_topic, QoS::AtMostOnce) {
                log::warn!("re-subscribe to {resub_topic} failed: {e}");
            }
        };

        let driver = Driver::spawn(format!("mqtt-sub-{topic}"), connection, on_publish, on_connect)?;

        Ok(Self {
            client,
            driver,
            topic: topic.to_string(),
            stopped: false,
        })
    }
}

impl RawFeed for MqttIngress {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.driver.request_stop();
        if let Err(e) = self.client.try_unsubscribe(&self.topic) {
            log::debug!("unsubscribe from {} failed: {e}", self.topic);
        }
        if let Err(e) = self.client.try_disconnect() {
            log::debug!("disconnect for {} failed: {e}", self.topic);
        }
    }

    fn join_timeout(&mut self, timeout: Duration) -> bool {
        self.driver.join_timeout(timeout)
    }
}

/// Command channel for one relay topic.
///
/// Publishes are retained so a restarted consumer (or a late-joining
/// broker session) immediately sees the last commanded state.
pub struct MqttCommandSink {
    client: Client,
    driver: Driver,
}

impl MqttCommandSink {
    /// Connect a command channel for `device` (client-id suffix only;
    /// the topic comes with each publish).
    pub fn connect(config: &MqttConfig, device: &str) -> Result<Self, MqttError> {
        let (client, connection) = Client::new(config.options(device), 10);
        let driver = Driver::spawn(
            format!("mqtt-cmd-{device}"),
            connection,
            |_publish| {},
            || {},
        )?;
        Ok(Self { client, driver })
    }

    /// Stop the driver thread. Called by the composition root at
    /// shutdown, after the relays have published their final OFF.
    pub fn shutdown(&mut self, timeout: Duration) {
        self.driver.request_stop();
        let _ = self.client.try_disconnect();
        if !self.driver.join_timeout(timeout) {
            log::warn!("mqtt command driver did not stop in time, abandoning it");
        }
    }
}

impl CommandSink for MqttCommandSink {
    fn publish_retained(&mut self, topic: &str, payload: &str) -> Result<(), SinkError> {
        // try_publish queues without blocking; a full queue is a publish
        // failure, not a stall
        self.client
            .try_publish(topic, QoS::AtMostOnce, true, payload)
            .map_err(|e| SinkError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}
