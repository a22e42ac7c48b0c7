//! `Sketch` estimates the number of distinct elements in a stream or dataset
//! and is configured with:
//! - `precision`: `P` in [4..16] range, defining `M = 2^P` one-byte registers
//!   (16 bytes up to 64 KiB of register memory).
//! - `hasher`: the [`HashScheme`] mapping canonical value bytes onto a hash,
//!   together with its seed.
//!
//! Sketches built with the same configuration can be merged, yielding the sketch of
//! the union of both streams. An estimate is always recomputed from the current
//! register state and never cached.

use std::fmt::{Debug, Formatter};

use tracing::{debug, trace};

use crate::canonical::{with_canonical_bytes, Canonical};
use crate::error::SketchError;
use crate::estimator::Estimator;
use crate::hash::{HashScheme, Murmur128, SketchHash};
use crate::registers::{check_hash_bits, check_precision, RegisterSet};

/// Sketch configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SketchConfig {
    /// Number of bits used for register indices
    pub precision: u8,
    #[cfg_attr(feature = "with_serde", serde(default))]
    pub hasher: HashScheme,
}

impl SketchConfig {
    /// Precision used by `Default`: 1024 registers, ~3.25% standard error.
    pub const DEFAULT_PRECISION: u8 = 10;

    /// Configuration with the given `precision`, 32-bit hashing and seed 0.
    pub fn new(precision: u8) -> Self {
        Self {
            precision,
            hasher: HashScheme::default(),
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.hasher = self.hasher.reseeded(seed);
        self
    }

    /// Switch to 128-bit hashing, keeping the current seed
    pub fn with_wide_hash(mut self) -> Self {
        self.hasher = Murmur128::new(self.hasher.seed()).into();
        self
    }

    pub fn with_hasher(mut self, hasher: HashScheme) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn validate(&self) -> Result<(), SketchError> {
        check_precision(self.precision)?;
        check_hash_bits(self.precision, self.hasher.bits())
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRECISION)
    }
}

/// HyperLogLog sketch over canonically encoded values.
#[derive(Clone, PartialEq)]
pub struct Sketch {
    config: SketchConfig,
    estimator: Estimator,
    registers: RegisterSet,
}

impl Sketch {
    /// Creates new `Sketch` with `2^precision` registers and default hashing
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        Self::with_config(SketchConfig::new(precision))
    }

    /// Creates new `Sketch` from `config`, failing before any allocation if it is invalid
    pub fn with_config(config: SketchConfig) -> Result<Self, SketchError> {
        config.validate()?;
        Ok(Self::zeroed(config))
    }

    /// Empty sketch for a validated `config`
    fn zeroed(config: SketchConfig) -> Self {
        trace!(
            precision = config.precision,
            hash_bits = config.hasher.bits(),
            "created sketch"
        );
        let registers = RegisterSet::zeroed(config.precision, config.hasher.bits());
        Self::from_parts(config, registers)
    }

    /// Assemble a sketch from already validated parts.
    pub(crate) fn from_parts(config: SketchConfig, registers: RegisterSet) -> Self {
        Self {
            estimator: Estimator::new(config.precision, config.hasher.bits()),
            config,
            registers,
        }
    }

    #[inline]
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.config.precision
    }

    #[inline]
    pub fn hasher(&self) -> HashScheme {
        self.config.hasher
    }

    #[inline]
    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    /// Insert a value into `Sketch`
    ///
    /// Values are hashed by their untagged canonical bytes, so values of different types with
    /// equal bytes (`true` and `1u8`, `"a"` and `97u8`) count as one element. Streams mixing
    /// types should insert tuples such as `("user", id)` or [`Record`](crate::canonical::Record)s.
    #[inline]
    pub fn insert<T: Canonical + ?Sized>(&mut self, item: &T) {
        with_canonical_bytes(item, |data| self.insert_bytes(data));
    }

    /// Insert raw bytes into `Sketch`
    #[inline]
    pub fn insert_bytes(&mut self, data: &[u8]) {
        let hash = self.config.hasher.hash_bytes(data);
        self.insert_hash(hash);
    }

    /// Insert hash produced by this sketch's [`HashScheme`]
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        self.registers.update(hash);
    }

    /// Return cardinality estimate
    #[inline]
    pub fn estimate(&self) -> f64 {
        self.estimator.estimate(self.registers.iter())
    }

    /// Return cardinality estimate rounded to the nearest integer
    #[inline]
    pub fn count(&self) -> u64 {
        self.estimate().round() as u64
    }

    /// Whether no register has been set since construction or the last `clear`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Expected relative standard error of estimates, `1.04 / sqrt(m)`
    pub fn relative_error(&self) -> f64 {
        1.04 / (self.registers.len() as f64).sqrt()
    }

    /// Merge `rhs` into `self`, yielding the sketch of the union of both streams
    pub fn merge(&mut self, rhs: &Self) -> Result<(), SketchError> {
        check_compatible(&self.config, &rhs.config)?;
        self.registers.merge(&rhs.registers)?;
        trace!(precision = self.precision(), "merged sketch");
        Ok(())
    }

    /// New sketch of the union of `lhs` and `rhs`
    pub fn union(lhs: &Self, rhs: &Self) -> Result<Self, SketchError> {
        let mut merged = lhs.clone();
        merged.merge(rhs)?;
        Ok(merged)
    }

    /// Reset to the empty state
    pub fn clear(&mut self) {
        self.registers.clear();
    }

    /// Return memory size of `Sketch`
    pub fn size_of(&self) -> usize {
        std::mem::size_of::<Self>() + self.registers.len()
    }
}

/// Sketches are comparable only when they route equal values onto equal registers.
pub(crate) fn check_compatible(lhs: &SketchConfig, rhs: &SketchConfig) -> Result<(), SketchError> {
    if lhs.precision != rhs.precision {
        debug!(
            lhs = lhs.precision,
            rhs = rhs.precision,
            "rejected merge of sketches with different precision"
        );
        return Err(SketchError::IncompatiblePrecision {
            lhs: lhs.precision,
            rhs: rhs.precision,
        });
    }
    if lhs.hasher != rhs.hasher {
        debug!(lhs = ?lhs.hasher, rhs = ?rhs.hasher, "rejected merge of sketches with different hashing");
        return Err(SketchError::IncompatibleHash);
    }
    Ok(())
}

impl Default for Sketch {
    fn default() -> Self {
        Self::zeroed(SketchConfig::default())
    }
}

impl<T: Canonical> Extend<T> for Sketch {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(&item);
        }
    }
}

impl Debug for Sketch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, hash: {}, estimate: {} }}",
            self.precision(),
            scheme_name(&self.config.hasher),
            self.count()
        )
    }
}

fn scheme_name(hasher: &HashScheme) -> &'static str {
    match hasher {
        HashScheme::Murmur32(_) => "murmur3_x86_32",
        HashScheme::Murmur128(_) => "murmur3_x64_128",
    }
}
