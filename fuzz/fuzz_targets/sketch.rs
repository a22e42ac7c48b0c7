#![no_main]

use cardinality_sketch::{Sketch, SketchConfig};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);
    let precision = 4 + data[0] % 13;
    let config = SketchConfig::new(precision).with_seed(u32::from(data[data.len() - 1]));

    let mut sketch1 = Sketch::with_config(config).unwrap();
    for chunk in first_half.chunks(4) {
        sketch1.insert_bytes(chunk);
        assert!(sketch1.estimate() > 0.0);
    }

    let mut sketch2 = Sketch::with_config(config).unwrap();
    for chunk in second_half.chunks(4) {
        sketch2.insert_bytes(chunk);
        assert!(sketch2.estimate() > 0.0);
    }

    let union = Sketch::union(&sketch1, &sketch2).unwrap();
    sketch1.merge(&sketch2).unwrap();
    assert_eq!(sketch1, union);
    assert!(sketch1.estimate() >= 1.0);
});
