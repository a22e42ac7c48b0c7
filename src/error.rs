use thiserror::Error;

/// Errors returned by sketch construction, merge and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    #[error("precision {0} is not supported, expected a value in [4, 16]")]
    InvalidPrecision(u8),
    #[error("hash width of {bits} bits leaves no payload at precision {precision}, expected ({precision}, 64]")]
    InvalidHashWidth { bits: u32, precision: u8 },
    #[error("cannot merge sketches with precision {lhs} and {rhs}")]
    IncompatiblePrecision { lhs: u8, rhs: u8 },
    #[error("cannot merge sketches built with different hash schemes or seeds")]
    IncompatibleHash,
    #[error("malformed sketch: {0}")]
    Decode(#[from] DecodeError),
}

/// Binary sketch decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input of {0} bytes is shorter than the header")]
    Truncated(usize),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("precision {0} is out of range")]
    InvalidPrecision(u8),
    #[error("unknown hash scheme {0}")]
    UnknownHashScheme(u8),
    #[error("expected {expected} registers, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("register {index} holds rank {rank} above the limit {max}")]
    RegisterOutOfRange { index: usize, rank: u8, max: u8 },
}
