//! Clock abstraction for the control loop
//!
//! The scheduler gates everything on elapsed wall-clock time, so it takes
//! its notion of "now" through a trait: [`SystemClock`] in production,
//! [`FixedClock`] in cadence tests (no sleeping, no flaky timing).

/// Timestamp in milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Source of time for the scheduler.
pub trait Clock: Send {
    /// Current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by the OS.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
}

impl FixedClock {
    /// Create a clock frozen at `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute timestamp.
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance by `ms` milliseconds.
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Round a timestamp to the nearest whole second.
///
/// The scheduler snaps `last_update` to this so ticks stay phase-aligned
/// with wall-clock seconds instead of drifting by the loop's sleep jitter.
pub fn round_to_second(ts: Timestamp) -> Timestamp {
    ((ts + 500) / 1000) * 1000
}
