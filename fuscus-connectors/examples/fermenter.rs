//! Fermenter Composition Example
//!
//! This example wires the whole stack together the way a real deployment
//! does: two MQTT-fed sensors, two relays on their own command channels,
//! a bang-bang decision layer, console output and the telemetry stream,
//! all driven by the 1 Hz control loop until Ctrl-C.
//!
//! ## What You'll Learn
//!
//! - Attaching an `MqttIngress` feed to a `Sensor`
//! - Driving `Relay`s over `MqttCommandSink` channels
//! - Implementing the `TemperatureControl`, `Link`, `Display` and
//!   `SettingsStore` contracts for a minimal controller
//! - Cooperative shutdown: signal handlers, forced-off outputs, bounded
//!   thread joins
//!
//! ## Running the Example
//!
//! Needs an MQTT broker (default `localhost:1883`; override with
//! `FUSCUS_BROKER`). Telemetry pushes use the stream id from
//! `FUSCUS_STREAM_ID` and fail harmlessly if it is unset.
//!
//! ```bash
//! cargo run --example fermenter
//! ```

use std::env;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use fuscus_connectors::{MqttCommandSink, MqttConfig, MqttIngress, TelemetryConfig, TelemetryStream};
use fuscus_core::{
    Actuator, ControlLoop, Display, Link, Relay, Sensor, SettingsError, SettingsStore, Shutdown,
    TemperatureControl, TemperatureReport,
};

const SETPOINT: f64 = 19.0;
const HYSTERESIS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    Cooling,
    Heating,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "IDLE"),
            Mode::Cooling => write!(f, "COOLING"),
            Mode::Heating => write!(f, "HEATING"),
        }
    }
}

/// Bang-bang controller around a fixed beer setpoint.
struct Fermenter {
    beer: Sensor,
    fridge: Sensor,
    heater: Relay<MqttCommandSink>,
    cooler: Relay<MqttCommandSink>,
    mode: Mode,
}

impl TemperatureControl for Fermenter {
    type State = Mode;

    fn update_temperatures(&mut self) {
        for sensor in [&mut self.beer, &mut self.fridge] {
            sensor.init();
            sensor.update();
        }
    }

    fn detect_peaks(&mut self) {
        if self.fridge.detect_pos_peak() {
            log::info!("fridge temperature peaked");
        }
        if self.fridge.detect_neg_peak() {
            log::info!("fridge temperature bottomed out");
        }
    }

    fn update_pid(&mut self) {
        // Bang-bang control, nothing to integrate
    }

    fn update_state(&mut self) {
        let Some(beer) = self.beer.read_fast_filtered() else {
            self.mode = Mode::Idle;
            return;
        };
        let beer = beer + self.beer.calibration_offset;

        self.mode = if beer > SETPOINT + HYSTERESIS {
            Mode::Cooling
        } else if beer < SETPOINT - HYSTERESIS {
            Mode::Heating
        } else {
            Mode::Idle
        };
    }

    fn state(&self) -> Mode {
        self.mode
    }

    fn update_outputs(&mut self) {
        self.heater.set_output(self.mode == Mode::Heating);
        self.cooler.set_output(self.mode == Mode::Cooling);
    }

    fn temperatures(&self) -> TemperatureReport {
        TemperatureReport {
            beer: self
                .beer
                .read_slow_filtered()
                .map(|t| t + self.beer.calibration_offset),
            fridge: self.fridge.read_slow_filtered(),
            room: None,
        }
    }

    fn force_outputs_off(&mut self) {
        self.heater.off();
        self.cooler.off();
    }

    fn stop_sensors(&mut self) {
        self.beer.join();
        self.fridge.join();
        self.heater.sink_mut().shutdown(Duration::from_secs(5));
        self.cooler.sink_mut().shutdown(Duration::from_secs(5));
    }
}

/// No serial link in this setup.
struct NoLink;

impl Link for NoLink {
    fn receive(&mut self) {}
    fn print_temperatures(&mut self) {}
    fn cleanup(&mut self) {}
}

/// Console stand-in for the LCD: one status line per tick.
struct Console;

impl Display for Console {
    fn print_stationary_text(&mut self) {}
    fn print_mode(&mut self) {}

    fn print_state(&mut self, state: &str) {
        print!("[{state:>7}] ");
    }

    fn print_all_temperatures(&mut self, report: &TemperatureReport) {
        let show = |t: Option<f64>| match t {
            Some(t) => format!("{t:5.2}"),
            None => " --.--".into(),
        };
        println!("beer {} °C  fridge {} °C", show(report.beer), show(report.fridge));
    }

    fn print_at(&mut self, _col: u8, _row: u8, text: &str) {
        println!("{text}");
    }
}

/// No persisted settings; the defaults above are the settings.
struct Defaults;

impl SettingsStore for Defaults {
    fn apply_settings(&mut self) -> Result<(), SettingsError> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let broker = env::var("FUSCUS_BROKER").unwrap_or_else(|_| "localhost".into());
    let config = MqttConfig::new(broker);

    let mut beer = Sensor::new(Some("fuscus/beer".into()));
    let feed = MqttIngress::subscribe(&config, "fuscus/beer", beer.raw_cell())?;
    beer.attach_feed(Box::new(feed));
    beer.calibration_offset = -0.2; // probe reads slightly high

    let mut fridge = Sensor::new(Some("fuscus/fridge".into()));
    let feed = MqttIngress::subscribe(&config, "fuscus/fridge", fridge.raw_cell())?;
    fridge.attach_feed(Box::new(feed));

    let heater = Relay::with_defaults(
        MqttCommandSink::connect(&config, "heater")?,
        "cmnd/fuscus-heater/POWER",
        false,
    );
    let cooler = Relay::with_defaults(
        MqttCommandSink::connect(&config, "cooler")?,
        "cmnd/fuscus-cooler/POWER",
        true, // active-low relay board
    );

    let fermenter = Fermenter {
        beer,
        fridge,
        heater,
        cooler,
        mode: Mode::Idle,
    };

    let stream_id = env::var("FUSCUS_STREAM_ID").unwrap_or_else(|_| "demo".into());
    let telemetry = TelemetryStream::new(TelemetryConfig::new(stream_id, "fermenter-demo"));

    let shutdown = Shutdown::new();
    shutdown.install_signal_handlers()?;

    let mut control = ControlLoop::new(fermenter, NoLink, Console, telemetry);
    control.setup(&mut Defaults)?;
    println!("running; Ctrl-C to stop");
    control.run(&shutdown);

    Ok(())
}
