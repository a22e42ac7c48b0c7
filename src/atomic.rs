//! ## Shared sketches
//! Register storage that many producers can update through a shared reference.
//!
//! A register update is a monotone max, so `fetch_max` with relaxed ordering is enough:
//! concurrent inserts commute and no update can lower a register. Reads observe some
//! interleaving of completed updates, which is all an estimate needs.

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::trace;

use crate::canonical::{with_canonical_bytes, Canonical};
use crate::error::SketchError;
use crate::estimator::Estimator;
use crate::hash::SketchHash;
use crate::registers::{
    check_hash_bits, check_precision, max_rank, split_hash, RegisterSet, DEFAULT_HASH_BITS,
};
use crate::sketch::{check_compatible, Sketch, SketchConfig};

/// `RegisterSet` counterpart backed by atomics
pub struct AtomicRegisterSet {
    precision: u8,
    hash_bits: u32,
    registers: Box<[AtomicU8]>,
}

impl AtomicRegisterSet {
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        Self::with_hash_bits(precision, DEFAULT_HASH_BITS)
    }

    pub fn with_hash_bits(precision: u8, hash_bits: u32) -> Result<Self, SketchError> {
        check_precision(precision)?;
        check_hash_bits(precision, hash_bits)?;
        let registers = std::iter::repeat_with(|| AtomicU8::new(0))
            .take(1 << precision)
            .collect();
        Ok(Self {
            precision,
            hash_bits,
            registers,
        })
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    #[inline]
    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    #[inline]
    pub fn max_rank(&self) -> u8 {
        max_rank(self.hash_bits, self.precision)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether every register is still zero
    pub fn is_empty(&self) -> bool {
        self.iter().all(|r| r == 0)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.registers.iter().map(|r| r.load(Ordering::Relaxed))
    }

    /// Route `hash` to its register.
    /// Returns true when this call raised the register.
    #[inline]
    pub fn update(&self, hash: u64) -> bool {
        let (idx, rank) = split_hash(hash, self.hash_bits, self.precision);
        self.update_rank(idx, rank)
    }

    #[inline]
    pub(crate) fn update_rank(&self, idx: usize, rank: u8) -> bool {
        self.registers[idx].fetch_max(rank, Ordering::Relaxed) < rank
    }

    /// Raise every register to at least the value held in `rhs`.
    pub fn merge(&self, rhs: &RegisterSet) -> Result<(), SketchError> {
        if self.precision != rhs.precision() {
            return Err(SketchError::IncompatiblePrecision {
                lhs: self.precision,
                rhs: rhs.precision(),
            });
        }
        if self.hash_bits != rhs.hash_bits() {
            return Err(SketchError::IncompatibleHash);
        }
        for (lhs, rank) in self.registers.iter().zip(rhs.iter()) {
            lhs.fetch_max(rank, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy of the current register values
    pub fn snapshot(&self) -> RegisterSet {
        RegisterSet::from_raw(self.precision, self.hash_bits, self.iter().collect())
    }

    pub fn clear(&self) {
        self.registers
            .iter()
            .for_each(|r| r.store(0, Ordering::Relaxed));
    }
}

impl From<&RegisterSet> for AtomicRegisterSet {
    fn from(registers: &RegisterSet) -> Self {
        Self {
            precision: registers.precision(),
            hash_bits: registers.hash_bits(),
            registers: registers.iter().map(AtomicU8::new).collect(),
        }
    }
}

impl Debug for AtomicRegisterSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Sketch accepting inserts through `&self`, for sharing between threads.
///
/// Merging into a `ConcurrentSketch` takes a plain [`Sketch`], so the source of a merge is
/// always a consistent snapshot; use [`ConcurrentSketch::snapshot`] to merge two shared sketches.
pub struct ConcurrentSketch {
    config: SketchConfig,
    estimator: Estimator,
    registers: AtomicRegisterSet,
}

impl ConcurrentSketch {
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        Self::with_config(SketchConfig::new(precision))
    }

    pub fn with_config(config: SketchConfig) -> Result<Self, SketchError> {
        config.validate()?;
        let registers = AtomicRegisterSet::with_hash_bits(config.precision, config.hasher.bits())?;
        trace!(precision = config.precision, "created concurrent sketch");
        Ok(Self {
            estimator: Estimator::new(config.precision, config.hasher.bits()),
            config,
            registers,
        })
    }

    #[inline]
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    #[inline]
    pub fn insert<T: Canonical + ?Sized>(&self, item: &T) {
        with_canonical_bytes(item, |data| self.insert_bytes(data));
    }

    #[inline]
    pub fn insert_bytes(&self, data: &[u8]) {
        self.insert_hash(self.config.hasher.hash_bytes(data));
    }

    #[inline]
    pub fn insert_hash(&self, hash: u64) {
        self.registers.update(hash);
    }

    /// Return cardinality estimate of the registers as currently observed
    pub fn estimate(&self) -> f64 {
        self.estimator.estimate(self.registers.iter())
    }

    pub fn count(&self) -> u64 {
        self.estimate().round() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn merge(&self, rhs: &Sketch) -> Result<(), SketchError> {
        check_compatible(&self.config, rhs.config())?;
        self.registers.merge(rhs.registers())
    }

    /// Plain `Sketch` holding the current register values
    pub fn snapshot(&self) -> Sketch {
        Sketch::from_parts(self.config, self.registers.snapshot())
    }

    pub fn clear(&self) {
        self.registers.clear();
    }
}

impl From<Sketch> for ConcurrentSketch {
    fn from(sketch: Sketch) -> Self {
        Self::from(&sketch)
    }
}

impl From<&Sketch> for ConcurrentSketch {
    fn from(sketch: &Sketch) -> Self {
        let config = *sketch.config();
        Self {
            estimator: Estimator::new(config.precision, config.hasher.bits()),
            config,
            registers: AtomicRegisterSet::from(sketch.registers()),
        }
    }
}

impl Debug for ConcurrentSketch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.snapshot().fmt(f)
    }
}
