//! Cascaded smoothing filter with turning-point detection
//!
//! A [`CascadedFilter`] is a short chain of first-order exponential
//! smoothing stages applied to one scalar stream. Each stage updates as
//! `y += a * (x - y)` and feeds the next, so the chain output is a lagged,
//! smoothed estimate of the input. Three differently tuned instances back
//! every sensor: fast (low lag), slow (stable, used for trend and peak
//! detection) and slope (fed pre-scaled per-hour deltas).
//!
//! Peak detection watches the *filtered* output: when the smoothed trend
//! turns from rising to falling the filter reports a positive peak, and
//! vice versa. That turning point is what the decision logic uses to
//! estimate how far the fridge overshoots after the compressor stops.
//!
//! Coefficients can be swapped at any time without resetting stage state;
//! the current path continues and only future responsiveness changes. This
//! mirrors the original tuning behavior where filter responsiveness is a
//! live setting.

use heapless::Vec;

use crate::constants::{DEFAULT_SLOW_COEFFICIENTS, MAX_FILTER_STAGES};

/// One first-order smoothing stage.
#[derive(Debug, Clone, Copy)]
struct Stage {
    /// Smoothing coefficient in (0, 1]. 1.0 passes the input through.
    coeff: f64,
    /// Current smoothed state.
    state: f64,
}

/// Direction of the filtered trend after the last sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Unknown,
    Rising,
    Falling,
}

/// Chain of smoothing stages over one scalar stream.
#[derive(Debug, Clone)]
pub struct CascadedFilter {
    stages: Vec<Stage, MAX_FILTER_STAGES>,
    initialized: bool,
    prev_output: f64,
    trend: Trend,
    pos_peak: bool,
    neg_peak: bool,
}

impl Default for CascadedFilter {
    fn default() -> Self {
        Self::new(&DEFAULT_SLOW_COEFFICIENTS)
    }
}

impl CascadedFilter {
    /// Create a filter with one stage per coefficient.
    ///
    /// Coefficients are clamped to (0, 1]; at most
    /// [`MAX_FILTER_STAGES`] stages are kept. The filter holds no valid
    /// output until [`init`](Self::init) or the first
    /// [`add`](Self::add).
    pub fn new(coeffs: &[f64]) -> Self {
        let mut stages = Vec::new();
        for &coeff in coeffs.iter().take(MAX_FILTER_STAGES) {
            // Vec capacity matches the take() bound, push cannot fail
            let _ = stages.push(Stage {
                coeff: clamp_coeff(coeff),
                state: 0.0,
            });
        }

        Self {
            stages,
            initialized: false,
            prev_output: 0.0,
            trend: Trend::Unknown,
            pos_peak: false,
            neg_peak: false,
        }
    }

    /// Reset every stage to `value`.
    ///
    /// Afterwards [`read_output`](Self::read_output) returns `value`
    /// until the next [`add`](Self::add); no averaging has occurred yet
    /// and the trend history is cleared.
    pub fn init(&mut self, value: f64) {
        for stage in self.stages.iter_mut() {
            stage.state = value;
        }
        self.initialized = true;
        self.prev_output = value;
        self.trend = Trend::Unknown;
        self.pos_peak = false;
        self.neg_peak = false;
    }

    /// Feed one sample through the stage chain.
    ///
    /// An uninitialized filter seeds itself from the first sample instead
    /// of converging up from an arbitrary zero state.
    pub fn add(&mut self, value: f64) {
        if !self.initialized {
            self.init(value);
            return;
        }

        let mut x = value;
        for stage in self.stages.iter_mut() {
            stage.state += stage.coeff * (x - stage.state);
            x = stage.state;
        }

        self.update_trend(x);
        self.prev_output = x;
    }

    /// Current smoothed value, or `None` before the first sample.
    pub fn read_output(&self) -> Option<f64> {
        self.initialized.then_some(self.prev_output)
    }

    /// Replace the smoothing coefficients without resetting stage state.
    ///
    /// Existing stages keep their state and only change responsiveness.
    /// A longer coefficient list appends stages seeded from the current
    /// output; a shorter one drops the tail stages.
    pub fn set_coefficients(&mut self, coeffs: &[f64]) {
        let coeffs = &coeffs[..coeffs.len().min(MAX_FILTER_STAGES)];

        self.stages.truncate(coeffs.len());
        for (stage, &coeff) in self.stages.iter_mut().zip(coeffs) {
            stage.coeff = clamp_coeff(coeff);
        }
        for &coeff in &coeffs[self.stages.len()..] {
            let _ = self.stages.push(Stage {
                coeff: clamp_coeff(coeff),
                state: self.prev_output,
            });
        }
    }

    /// Did the last [`add`](Self::add) turn the trend from rising to
    /// falling (a local maximum)?
    pub fn detect_pos_peak(&self) -> bool {
        self.pos_peak
    }

    /// Did the last [`add`](Self::add) turn the trend from falling to
    /// rising (a local minimum)?
    pub fn detect_neg_peak(&self) -> bool {
        self.neg_peak
    }

    fn update_trend(&mut self, output: f64) {
        self.pos_peak = false;
        self.neg_peak = false;

        let new_trend = if output > self.prev_output {
            Trend::Rising
        } else if output < self.prev_output {
            Trend::Falling
        } else {
            // Flat sample: hold the previous direction
            return;
        };

        match (self.trend, new_trend) {
            (Trend::Rising, Trend::Falling) => self.pos_peak = true,
            (Trend::Falling, Trend::Rising) => self.neg_peak = true,
            _ => {}
        }
        self.trend = new_trend;
    }
}

fn clamp_coeff(coeff: f64) -> f64 {
    coeff.clamp(f64::EPSILON, 1.0)
}
