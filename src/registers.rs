//! ## Registers
//! `RegisterSet` holds `M = 2^P` one-byte HyperLogLog registers.
//!
//! A hash of width `W` bits is split into:
//! - index: the top `P` bits, selecting a register
//! - payload: the remaining `Q = W - P` bits, whose rank is `1 + leading zeros`
//!   clamped to `Q` when the payload is all zeros
//!
//! Every register keeps the maximum rank routed to it, so updates and merges are
//! commutative, associative and idempotent.

use std::fmt::{Debug, Formatter};

use crate::error::SketchError;

/// Smallest supported precision
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision
pub const MAX_PRECISION: u8 = 16;

/// Validate `precision` against the supported `[MIN_PRECISION, MAX_PRECISION]` range.
#[inline]
pub(crate) fn check_precision(precision: u8) -> Result<(), SketchError> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(())
    } else {
        Err(SketchError::InvalidPrecision(precision))
    }
}

/// Validate hash width `bits` against `precision`: the payload needs at least one bit.
#[inline]
pub(crate) fn check_hash_bits(precision: u8, bits: u32) -> Result<(), SketchError> {
    if bits > u32::from(precision) && bits <= 64 {
        Ok(())
    } else {
        Err(SketchError::InvalidHashWidth { bits, precision })
    }
}

/// Split `hash` of width `bits` into register index and rank.
///
/// `bits` must have passed `check_hash_bits` for `precision`.
#[inline]
pub(crate) fn split_hash(hash: u64, bits: u32, precision: u8) -> (usize, u8) {
    let p = u32::from(precision);
    let q = bits - p;
    let payload_mask = (1u64 << q) - 1;
    let idx = ((hash >> q) & ((1u64 << p) - 1)) as usize;
    let payload = hash & payload_mask;
    // leading zeros counted within the `q` payload bits only
    let zeros = payload.leading_zeros() - (64 - q);
    let rank = (zeros + 1).min(q);
    (idx, rank as u8)
}

/// Highest rank a register may hold for the given hash width and precision.
#[inline]
pub(crate) fn max_rank(bits: u32, precision: u8) -> u8 {
    (bits - u32::from(precision)) as u8
}

/// Hash width assumed by `RegisterSet::new`
pub const DEFAULT_HASH_BITS: u32 = 32;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RegisterSet {
    precision: u8,
    hash_bits: u32,
    registers: Box<[u8]>,
}

impl RegisterSet {
    /// Create new set of `2^precision` zeroed registers fed by 32-bit hashes
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        Self::with_hash_bits(precision, DEFAULT_HASH_BITS)
    }

    /// Create new set of `2^precision` zeroed registers fed by `hash_bits`-wide hashes
    pub fn with_hash_bits(precision: u8, hash_bits: u32) -> Result<Self, SketchError> {
        check_precision(precision)?;
        check_hash_bits(precision, hash_bits)?;
        Ok(Self::zeroed(precision, hash_bits))
    }

    /// Allocate zeroed registers for an already validated configuration.
    pub(crate) fn zeroed(precision: u8, hash_bits: u32) -> Self {
        Self::from_raw(
            precision,
            hash_bits,
            vec![0u8; 1 << precision].into_boxed_slice(),
        )
    }

    /// Rebuild register set from raw register values.
    ///
    /// The caller is responsible for checking `registers.len() == 2^precision`
    /// and that no register exceeds `max_rank(hash_bits, precision)`.
    pub(crate) fn from_raw(precision: u8, hash_bits: u32, registers: Box<[u8]>) -> Self {
        debug_assert_eq!(registers.len(), 1 << precision);
        Self {
            precision,
            hash_bits,
            registers,
        }
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Width of the hashes routed to this set
    #[inline]
    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    /// Largest value a register can reach
    #[inline]
    pub fn max_rank(&self) -> u8 {
        max_rank(self.hash_bits, self.precision)
    }

    /// Number of registers
    #[inline]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// True while every register is zero; `len()` is never zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.registers
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.registers.iter().copied()
    }

    /// Number of registers still set to zero
    #[inline]
    pub fn zeros(&self) -> usize {
        self.registers.iter().filter(|&&r| r == 0).count()
    }

    /// Route `hash` to its register; bits above the hash width are ignored.
    /// Returns true when the register was raised.
    #[inline]
    pub fn update(&mut self, hash: u64) -> bool {
        let (idx, rank) = split_hash(hash, self.hash_bits, self.precision);
        self.update_rank(idx, rank)
    }

    /// Raise register `idx` to `rank` unless it already holds an equal or larger value.
    #[inline]
    pub(crate) fn update_rank(&mut self, idx: usize, rank: u8) -> bool {
        let register = &mut self.registers[idx];
        if rank > *register {
            *register = rank;
            true
        } else {
            false
        }
    }

    /// Elementwise maximum of `self` and `rhs`, stored into `self`.
    pub fn merge(&mut self, rhs: &RegisterSet) -> Result<(), SketchError> {
        if self.precision != rhs.precision {
            return Err(SketchError::IncompatiblePrecision {
                lhs: self.precision,
                rhs: rhs.precision,
            });
        }
        if self.hash_bits != rhs.hash_bits {
            return Err(SketchError::IncompatibleHash);
        }
        // equal lengths let the compiler vectorize the loop
        for (lhs, &rhs) in self.registers.iter_mut().zip(rhs.registers.iter()) {
            *lhs = (*lhs).max(rhs);
        }
        Ok(())
    }

    /// Reset all registers to zero
    pub fn clear(&mut self) {
        self.registers.fill(0);
    }
}

impl Debug for RegisterSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, registers: {}, zeros: {} }}",
            self.precision,
            self.len(),
            self.zeros()
        )
    }
}
