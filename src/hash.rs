//! ## MurmurHash3
//! Non-cryptographic hashing used to route values onto sketch registers.
//!
//! Both variants follow the reference implementation:
//! https://github.com/aappleby/smhasher/blob/master/src/MurmurHash3.cpp
//!
//! - `murmur3_x86_32` consumes 4-byte blocks with a single 32-bit accumulator.
//! - `murmur3_x64_128` consumes 16-byte blocks with two 64-bit accumulators.
//!
//! Blocks are read little-endian regardless of the host, so hashes are stable across platforms.

use enum_dispatch::enum_dispatch;

const X86_32_C1: u32 = 0xcc9e_2d51;
const X86_32_C2: u32 = 0x1b87_3593;

const X64_128_C1: u64 = 0x87c3_7b91_1142_53d5;
const X64_128_C2: u64 = 0x4cf5_ad43_2745_937f;

/// Wire tag of [`Murmur32`]
pub(crate) const TAG_MURMUR32: u8 = 1;
/// Wire tag of [`Murmur128`]
pub(crate) const TAG_MURMUR128: u8 = 2;

/// Compute 32-bit MurmurHash3 of `data` (x86 variant).
#[inline]
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    let mut h1 = seed;

    let mut blocks = data.chunks_exact(4);
    for block in blocks.by_ref() {
        let k1 = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h1 ^= mix_k1_32(k1);
        h1 = h1.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    // Fold 1..3 trailing bytes into a partial block
    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k1 = 0u32;
        for (i, &b) in tail.iter().enumerate().rev() {
            k1 ^= u32::from(b) << (8 * i);
        }
        h1 ^= mix_k1_32(k1);
    }

    // Only the low 32 bits of the length take part, as in the reference code
    h1 ^= data.len() as u32;
    fmix32(h1)
}

/// Compute 128-bit MurmurHash3 of `data` (x64 variant).
///
/// Returns `h1 << 64 | h2` where `h1` and `h2` are the two output words of the reference code.
#[inline]
pub fn murmur3_x64_128(data: &[u8], seed: u32) -> u128 {
    let mut h1 = u64::from(seed);
    let mut h2 = u64::from(seed);

    let mut blocks = data.chunks_exact(16);
    for block in blocks.by_ref() {
        let k1 = read_u64_le(&block[..8]);
        let k2 = read_u64_le(&block[8..]);

        h1 ^= mix_k1_64(k1);
        h1 = h1
            .rotate_left(27)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dc_e729);

        h2 ^= mix_k2_64(k2);
        h2 = h2
            .rotate_left(31)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x3849_5ab5);
    }

    let tail = blocks.remainder();
    if tail.len() > 8 {
        let mut k2 = 0u64;
        for (i, &b) in tail[8..].iter().enumerate().rev() {
            k2 ^= u64::from(b) << (8 * i);
        }
        h2 ^= mix_k2_64(k2);
    }
    if !tail.is_empty() {
        let mut k1 = 0u64;
        for (i, &b) in tail.iter().take(8).enumerate().rev() {
            k1 ^= u64::from(b) << (8 * i);
        }
        h1 ^= mix_k1_64(k1);
    }

    let len = data.len() as u64;
    h1 ^= len;
    h2 ^= len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (u128::from(h1) << 64) | u128::from(h2)
}

/// Little-endian `u64` out of an 8-byte block
#[inline(always)]
fn read_u64_le(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

#[inline(always)]
fn mix_k1_32(k1: u32) -> u32 {
    k1.wrapping_mul(X86_32_C1)
        .rotate_left(15)
        .wrapping_mul(X86_32_C2)
}

#[inline(always)]
fn mix_k1_64(k1: u64) -> u64 {
    k1.wrapping_mul(X64_128_C1)
        .rotate_left(31)
        .wrapping_mul(X64_128_C2)
}

#[inline(always)]
fn mix_k2_64(k2: u64) -> u64 {
    k2.wrapping_mul(X64_128_C2)
        .rotate_left(33)
        .wrapping_mul(X64_128_C1)
}

/// Finalization mix, forces all bits of the 32-bit state to avalanche.
#[inline(always)]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Finalization mix, forces all bits of the 64-bit state to avalanche.
#[inline(always)]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Hash schemes a sketch can be configured with.
///
/// The scheme decides the hash width, which in turn bounds register ranks and
/// the large range correction of the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "snake_case"))]
#[enum_dispatch]
pub enum HashScheme {
    Murmur32(Murmur32),
    Murmur128(Murmur128),
}

/// Hashing strategy trait which must be implemented by all schemes.
#[enum_dispatch(HashScheme)]
pub trait SketchHash {
    /// Hash `data`, returning a value whose low `bits()` bits are significant.
    fn hash_bytes(&self, data: &[u8]) -> u64;
    /// Width of the produced hash in bits
    fn bits(&self) -> u32;
    fn seed(&self) -> u32;
    /// One-byte identifier used by the binary format
    fn tag(&self) -> u8;
}

impl HashScheme {
    /// Resolve a scheme from its wire `tag` and `seed`.
    pub(crate) fn from_tag(tag: u8, seed: u32) -> Option<Self> {
        match tag {
            TAG_MURMUR32 => Some(Murmur32::new(seed).into()),
            TAG_MURMUR128 => Some(Murmur128::new(seed).into()),
            _ => None,
        }
    }

    /// Same scheme with a different seed
    pub(crate) fn reseeded(self, seed: u32) -> Self {
        match self {
            HashScheme::Murmur32(_) => Murmur32::new(seed).into(),
            HashScheme::Murmur128(_) => Murmur128::new(seed).into(),
        }
    }
}

impl Default for HashScheme {
    fn default() -> Self {
        Murmur32::default().into()
    }
}

/// 32-bit MurmurHash3, the default scheme.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Murmur32 {
    pub seed: u32,
}

impl Murmur32 {
    pub const fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl SketchHash for Murmur32 {
    #[inline]
    fn hash_bytes(&self, data: &[u8]) -> u64 {
        u64::from(murmur3_x86_32(data, self.seed))
    }

    fn bits(&self) -> u32 {
        32
    }

    fn seed(&self) -> u32 {
        self.seed
    }

    fn tag(&self) -> u8 {
        TAG_MURMUR32
    }
}

/// 128-bit MurmurHash3 truncated to its high 64 bits.
///
/// Leaves a wider payload per register and pushes hash space saturation far
/// beyond any practical cardinality.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Murmur128 {
    pub seed: u32,
}

impl Murmur128 {
    pub const fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl SketchHash for Murmur128 {
    #[inline]
    fn hash_bytes(&self, data: &[u8]) -> u64 {
        (murmur3_x64_128(data, self.seed) >> 64) as u64
    }

    fn bits(&self) -> u32 {
        64
    }

    fn seed(&self) -> u32 {
        self.seed
    }

    fn tag(&self) -> u8 {
        TAG_MURMUR128
    }
}
