#![no_main]

use cardinality_sketch::Sketch;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut sketch) = Sketch::from_bytes(data) {
        assert_eq!(sketch.to_bytes(), data);
        sketch.insert(&1u32);
        assert!(sketch.estimate() > 0.0);
    }
});
