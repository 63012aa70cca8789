//! Recording mock collaborators for control-loop tests
//!
//! Every mock appends to a shared event log so tests can assert on the
//! exact call ordering the scheduler guarantees.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fuscus_core::control::Shutdown;
use fuscus_core::traits::{
    Display, Link, SettingsStore, TelemetrySink, TemperatureControl, TemperatureReport,
};
use fuscus_core::SettingsError;

pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn record(log: &EventLog, event: &str) {
    log.borrow_mut().push(event.to_string());
}

/// Position of `event` in the log; panics if absent.
pub fn index_of(log: &EventLog, event: &str) -> usize {
    log.borrow()
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("event '{event}' not in log: {:?}", log.borrow()))
}

pub fn count_of(log: &EventLog, event: &str) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Cooling,
    Heating,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "IDLE",
            Mode::Cooling => "COOLING",
            Mode::Heating => "HEATING",
        };
        f.write_str(name)
    }
}

/// Controller whose state transitions follow a pre-written script.
pub struct ScriptedController {
    pub log: EventLog,
    pub current: Mode,
    /// States consumed one per `update_state` call; the last one sticks.
    pub script: Vec<Mode>,
    pub report: TemperatureReport,
}

impl ScriptedController {
    pub fn new(log: EventLog, script: Vec<Mode>) -> Self {
        Self {
            log,
            current: Mode::Idle,
            script,
            report: TemperatureReport {
                beer: Some(19.5),
                fridge: Some(4.0),
                room: None,
            },
        }
    }
}

impl TemperatureControl for ScriptedController {
    type State = Mode;

    fn update_temperatures(&mut self) {
        record(&self.log, "update_temperatures");
    }

    fn detect_peaks(&mut self) {
        record(&self.log, "detect_peaks");
    }

    fn update_pid(&mut self) {
        record(&self.log, "update_pid");
    }

    fn update_state(&mut self) {
        record(&self.log, "update_state");
        if !self.script.is_empty() {
            self.current = self.script.remove(0);
        }
    }

    fn state(&self) -> Mode {
        self.current
    }

    fn update_outputs(&mut self) {
        record(&self.log, "update_outputs");
    }

    fn temperatures(&self) -> TemperatureReport {
        self.report
    }

    fn force_outputs_off(&mut self) {
        record(&self.log, "force_outputs_off");
    }

    fn stop_sensors(&mut self) {
        record(&self.log, "stop_sensors");
    }
}

/// Link that can flip the shutdown flag after N receive calls, so run()
/// terminates deterministically in tests.
pub struct RecordingLink {
    pub log: EventLog,
    pub stop_after: Option<(Shutdown, usize)>,
    receives: usize,
}

impl RecordingLink {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            stop_after: None,
            receives: 0,
        }
    }

    pub fn stop_after(mut self, shutdown: Shutdown, receives: usize) -> Self {
        self.stop_after = Some((shutdown, receives));
        self
    }
}

impl Link for RecordingLink {
    fn receive(&mut self) {
        record(&self.log, "link.receive");
        self.receives += 1;
        if let Some((shutdown, limit)) = &self.stop_after {
            if self.receives >= *limit {
                shutdown.request_stop();
            }
        }
    }

    fn print_temperatures(&mut self) {
        record(&self.log, "link.print_temperatures");
    }

    fn cleanup(&mut self) {
        record(&self.log, "link.cleanup");
    }
}

pub struct RecordingDisplay {
    pub log: EventLog,
}

impl Display for RecordingDisplay {
    fn print_stationary_text(&mut self) {
        record(&self.log, "display.stationary");
    }

    fn print_mode(&mut self) {
        record(&self.log, "display.mode");
    }

    fn print_state(&mut self, state: &str) {
        record(&self.log, &format!("display.state:{state}"));
    }

    fn print_all_temperatures(&mut self, _report: &TemperatureReport) {
        record(&self.log, "display.temperatures");
    }

    fn print_at(&mut self, _col: u8, _row: u8, text: &str) {
        record(&self.log, &format!("display.at:{text}"));
    }
}

pub struct RecordingTelemetry {
    pub log: EventLog,
}

impl TelemetrySink for RecordingTelemetry {
    fn push(&mut self, _report: &TemperatureReport) {
        record(&self.log, "telemetry.push");
    }
}

pub struct OkSettings {
    pub log: EventLog,
}

impl SettingsStore for OkSettings {
    fn apply_settings(&mut self) -> Result<(), SettingsError> {
        record(&self.log, "settings.apply");
        Ok(())
    }
}

pub struct FailingSettings;

impl SettingsStore for FailingSettings {
    fn apply_settings(&mut self) -> Result<(), SettingsError> {
        Err(SettingsError("eeprom image corrupt".into()))
    }
}
