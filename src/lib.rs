//! `cardinality-sketch` estimates the number of distinct elements in a stream or dataset
//! using HyperLogLog over MurmurHash3.
//!
//! Values are mapped to bytes through a canonical encoding ([`Canonical`]), hashed with a
//! seeded MurmurHash3 variant ([`HashScheme`]) and folded into `2^P` one-byte registers.
//! Sketches with equal configuration merge losslessly, and can be exchanged between
//! processes through a compact binary format.
//!
//! ```
//! use cardinality_sketch::Sketch;
//!
//! let mut sketch = Sketch::new(12)?;
//! for i in 0..1000u32 {
//!     sketch.insert(&i);
//! }
//! let decoded = Sketch::from_bytes(&sketch.to_bytes())?;
//! assert_eq!(decoded.count(), sketch.count());
//! # Ok::<(), cardinality_sketch::SketchError>(())
//! ```
pub mod atomic;
pub mod canonical;
pub mod codec;
pub mod error;
pub mod estimator;
pub mod hash;
pub mod registers;
#[cfg(feature = "with_serde")]
mod serde;
pub mod sketch;

pub use atomic::ConcurrentSketch;
pub use canonical::{hash_value, hash_value_128, Canonical, Record};
pub use error::{DecodeError, SketchError};
pub use hash::{murmur3_x64_128, murmur3_x86_32, HashScheme, Murmur128, Murmur32, SketchHash};
pub use sketch::{Sketch, SketchConfig};
