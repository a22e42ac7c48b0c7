//! ## Binary format
//! Self-describing encoding of a [`Sketch`], the unit exchanged between processes that
//! merge sketches out of process.
//!
//! - byte 0        - format version (`FORMAT_VERSION`)
//! - byte 1        - precision `P`
//! - byte 2        - hash scheme tag (`1` = 32-bit MurmurHash3, `2` = 128-bit MurmurHash3)
//! - bytes 3..7    - hash seed (`u32` little-endian)
//! - bytes 7..     - `2^P` register values, one byte each, in index order

use tracing::debug;

use crate::error::{DecodeError, SketchError};
use crate::hash::{HashScheme, SketchHash};
use crate::registers::{max_rank, RegisterSet, MAX_PRECISION, MIN_PRECISION};
use crate::sketch::{Sketch, SketchConfig};

/// Current version of the binary format
pub const FORMAT_VERSION: u8 = 1;
/// Size of the header preceding register values
pub const HEADER_LEN: usize = 7;

impl Sketch {
    /// Encode `Sketch` into its binary representation
    pub fn to_bytes(&self) -> Vec<u8> {
        let registers = self.registers().as_slice();
        let mut out = Vec::with_capacity(HEADER_LEN + registers.len());
        out.push(FORMAT_VERSION);
        out.push(self.precision());
        out.push(self.hasher().tag());
        out.extend_from_slice(&self.hasher().seed().to_le_bytes());
        out.extend_from_slice(registers);
        out
    }

    /// Decode `Sketch` from its binary representation
    pub fn from_bytes(data: &[u8]) -> Result<Self, SketchError> {
        decode(data).map_err(|e| {
            debug!(error = %e, len = data.len(), "rejected encoded sketch");
            SketchError::from(e)
        })
    }
}

fn decode(data: &[u8]) -> Result<Sketch, DecodeError> {
    if data.len() < HEADER_LEN {
        return Err(DecodeError::Truncated(data.len()));
    }
    let (header, registers) = data.split_at(HEADER_LEN);
    let seed = u32::from_le_bytes([header[3], header[4], header[5], header[6]]);
    from_parts(header[0], header[1], header[2], seed, registers.into())
}

/// Validate decoded sketch fields and assemble a `Sketch` out of them.
pub(crate) fn from_parts(
    version: u8,
    precision: u8,
    scheme: u8,
    seed: u32,
    registers: Box<[u8]>,
) -> Result<Sketch, DecodeError> {
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        return Err(DecodeError::InvalidPrecision(precision));
    }
    let hasher = HashScheme::from_tag(scheme, seed).ok_or(DecodeError::UnknownHashScheme(scheme))?;

    let expected = 1usize << precision;
    if registers.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: registers.len(),
        });
    }
    let max = max_rank(hasher.bits(), precision);
    if let Some(index) = registers.iter().position(|&rank| rank > max) {
        return Err(DecodeError::RegisterOutOfRange {
            index,
            rank: registers[index],
            max,
        });
    }

    let config = SketchConfig::new(precision).with_hasher(hasher);
    Ok(Sketch::from_parts(
        config,
        RegisterSet::from_raw(precision, hasher.bits(), registers),
    ))
}
