//! Sensor Pipeline Example
//!
//! This example demonstrates a full `Sensor`: asynchronous value delivery
//! through its `RawCell`, the fast/slow/slope filter triple, and how the
//! staleness counter drives filter seeding.
//!
//! ## What You'll Learn
//!
//! - Feeding a sensor through its shared raw cell
//! - Why the slope output stays at zero through the startup settle window
//! - How a sensor behaves while its source is silent, and how `init()`
//!   seeds the filters in one step when data arrives
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_sensor_pipeline
//! ```

use fuscus_core::sensor::Sensor;

fn main() {
    println!("Fuscus Sensor Pipeline Example");
    println!("==============================\n");

    let mut beer = Sensor::new(Some("fuscus/beer".into()));
    let cell = beer.raw_cell();

    // First reading arrives; the sensor starts saturated-stale, so the
    // per-tick init() call seeds all three filters from it
    cell.set(19.50);
    beer.init();
    beer.update();
    println!(
        "seeded: fast={:.2} slow={:.2} slope={:.2}",
        beer.read_fast_filtered().unwrap(),
        beer.read_slow_filtered().unwrap(),
        beer.read_slope().unwrap()
    );

    // Fermentation warming at 0.01 °C per tick. The slope output holds
    // zero until the startup settle window has elapsed, then updates once
    // every three ticks.
    println!("\nwarming phase:");
    let mut raw = 19.50;
    for tick in 1..=70 {
        raw += 0.01;
        cell.set(raw);
        beer.init(); // no-op while healthy
        beer.update();

        if tick % 10 == 0 {
            println!(
                "  tick {:>3}: raw={:.2} slow={:.3} slope={:+.2} °C/h",
                tick,
                raw,
                beer.read_slow_filtered().unwrap(),
                beer.read_slope().unwrap()
            );
        }
    }

    // A sensor whose source has never answered: every tick bumps the
    // saturating failed-read counter and the filters stay empty
    println!("\nfridge sensor with a silent source:");
    let mut fridge = Sensor::new(Some("fuscus/fridge".into()));
    for _ in 0..20 {
        fridge.init();
        fridge.update();
    }
    println!(
        "  failed reads: {} (saturating), status: {:?}, slow: {:?}",
        fridge.failed_read_count(),
        fridge.status(),
        fridge.read_slow_filtered()
    );

    // First value finally lands; init() seeds the filters from it in one
    // step instead of letting the cascade crawl up from nothing
    fridge.raw_cell().set(4.25);
    fridge.init();
    fridge.update();
    println!("\nfirst reading arrives:");
    println!(
        "  slow after seed: {:.2}, slope {:+.2}, status: {:?}",
        fridge.read_slow_filtered().unwrap(),
        fridge.read_slope().unwrap(),
        fridge.status()
    );
}
