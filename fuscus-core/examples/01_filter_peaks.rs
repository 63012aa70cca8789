//! Cascaded Filter and Peak Detection Example
//!
//! This example demonstrates the heart of the control core: a cascade of
//! first-order smoothing stages with trend-based peak detection.
//!
//! ## What You'll Learn
//!
//! - Creating and seeding a `CascadedFilter`
//! - How coefficient choice trades lag against noise rejection
//! - Detecting positive and negative peaks in the filtered trend
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_filter_peaks
//! ```

use fuscus_core::constants::{DEFAULT_FAST_COEFFICIENTS, DEFAULT_SLOW_COEFFICIENTS};
use fuscus_core::filter::CascadedFilter;

fn main() {
    println!("Fuscus Cascaded Filter Example");
    println!("==============================\n");

    let mut fast = CascadedFilter::new(&DEFAULT_FAST_COEFFICIENTS);
    let mut slow = CascadedFilter::new(&DEFAULT_SLOW_COEFFICIENTS);

    // Seed both filters at the first real reading so they start on the
    // signal instead of converging from zero
    let start = 20.0;
    fast.init(start);
    slow.init(start);
    println!("Seeded both filters at {start:.2} °C\n");

    // A fridge-door event: the temperature overshoots upward, then the
    // compressor pulls it back down past the setpoint
    println!("{:>6}  {:>8}  {:>8}  {:>8}  peaks", "step", "raw", "fast", "slow");
    for step in 0..40 {
        let t = step as f64;
        // Damped oscillation around 20 °C
        let raw = 20.0 + 2.5 * (-t / 15.0f64).exp() * (t / 4.0).sin();

        fast.add(raw);
        slow.add(raw);

        let mut peaks = String::new();
        if slow.detect_pos_peak() {
            peaks.push_str("POS");
        }
        if slow.detect_neg_peak() {
            peaks.push_str("NEG");
        }

        println!(
            "{:>6}  {:>8.3}  {:>8.3}  {:>8.3}  {}",
            step,
            raw,
            fast.read_output().unwrap_or(f64::NAN),
            slow.read_output().unwrap_or(f64::NAN),
            peaks
        );
    }

    println!("\nNote how the slow filter flags each turn of the oscillation");
    println!("one or two steps late (its lag), while the fast filter tracks");
    println!("the raw value closely but would be too jittery for peaks.");
}
