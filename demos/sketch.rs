//! Counts distinct visitors of two sites, merges them and ships the result as bytes.
//!
//! Run with `cargo run --example sketch`.
use cardinality_sketch::{Sketch, SketchConfig, SketchError};

fn main() -> Result<(), SketchError> {
    let config = SketchConfig::new(12).with_seed(2024);
    let mut site_a = Sketch::with_config(config)?;
    let mut site_b = Sketch::with_config(config)?;

    // visitors 0..60k hit site A, 40k..100k hit site B
    for visitor in 0..60_000u64 {
        site_a.insert(&("visitor", visitor));
    }
    for visitor in 40_000..100_000u64 {
        site_b.insert(&("visitor", visitor));
    }

    println!("site A:  {:>7} (actual 60000)", site_a.count());
    println!("site B:  {:>7} (actual 60000)", site_b.count());

    let both = Sketch::union(&site_a, &site_b)?;
    println!("union:   {:>7} (actual 100000)", both.count());
    println!(
        "standard error: {:.2}%, {} bytes",
        both.relative_error() * 100.0,
        both.size_of()
    );

    let bytes = both.to_bytes();
    let restored = Sketch::from_bytes(&bytes)?;
    println!("restored from {} bytes: {:?}", bytes.len(), restored);
    Ok(())
}
