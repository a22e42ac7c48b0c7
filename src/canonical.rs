//! ## Canonical value encoding
//! Typed values are turned into bytes before hashing so that logically equal values,
//! however they were constructed, always hash the same way.
//!
//! Encoding rules:
//! - text is encoded as UTF-8
//! - integers and booleans use fixed width little-endian bytes, `usize`/`isize` are widened
//!   to 8 bytes so sketches built on 32-bit and 64-bit hosts agree
//! - floats use their bit pattern with `-0.0` folded into `0.0` and a single NaN
//! - records (tuples, `Option` and user types built with [`Record`]) encode each field as
//!   `tag | length (u32 LE) | bytes` in declaration order
//!
//! A top-level value carries no tag, so `hash_value("abc", seed)` equals
//! `murmur3_x86_32(b"abc", seed)`. Values of different widths (e.g. `true` and `1i32`)
//! still differ because the length takes part in the hash, but values of equal width do not:
//! `true`, `1u8` and `"\u{1}"` share one encoding, as do `1u32` and `1i32`. Wrap values in a
//! tuple or a [`Record`] when a stream mixes types.

use std::cell::RefCell;

use crate::hash::{murmur3_x64_128, murmur3_x86_32};

/// Type tags written in front of every record field.
pub mod tag {
    pub const BYTES: u8 = 0x01;
    pub const STR: u8 = 0x02;
    pub const BOOL: u8 = 0x03;
    pub const U8: u8 = 0x10;
    pub const U16: u8 = 0x11;
    pub const U32: u8 = 0x12;
    pub const U64: u8 = 0x13;
    pub const U128: u8 = 0x14;
    pub const I8: u8 = 0x18;
    pub const I16: u8 = 0x19;
    pub const I32: u8 = 0x1a;
    pub const I64: u8 = 0x1b;
    pub const I128: u8 = 0x1c;
    pub const F32: u8 = 0x20;
    pub const F64: u8 = 0x21;
    pub const CHAR: u8 = 0x22;
    pub const OPTION: u8 = 0x30;
    pub const RECORD: u8 = 0x31;
}

/// Values with a canonical byte encoding.
///
/// `TAG` only takes effect inside records: a value hashed on its own is identified by its
/// bytes alone, so `true` and `1u8` hash equally while `(true,)` and `(1u8,)` do not.
///
/// Implement it for your own types by listing their fields through [`Record`]:
///
/// ```
/// use cardinality_sketch::canonical::{tag, Canonical, Record};
///
/// struct Visit {
///     user: String,
///     page: u32,
/// }
///
/// impl Canonical for Visit {
///     const TAG: u8 = tag::RECORD;
///
///     fn encode(&self, out: &mut Vec<u8>) {
///         Record::new(out).field(&self.user).field(&self.page);
///     }
/// }
/// ```
pub trait Canonical {
    /// Tag identifying the logical type when used as a record field
    const TAG: u8;

    /// Append canonical bytes of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

/// Writer of record fields into a canonical buffer.
pub struct Record<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> Record<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out }
    }

    /// Append `value` as the next field of the record.
    pub fn field<T: Canonical + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.out.push(T::TAG);
        let len_at = self.out.len();
        self.out.extend_from_slice(&[0; 4]);
        value.encode(self.out);
        let len = (self.out.len() - len_at - 4) as u32;
        self.out[len_at..len_at + 4].copy_from_slice(&len.to_le_bytes());
        self
    }
}

/// Encode `value` into a fresh buffer.
#[inline]
pub fn to_canonical_bytes<T: Canonical + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    value.encode(&mut out);
    out
}

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(64));
}

/// Run `f` over the canonical encoding of `value`, reusing a per-thread buffer.
///
/// Falls back to a fresh buffer when `value.encode` itself re-enters this function.
#[inline]
pub(crate) fn with_canonical_bytes<T, R>(value: &T, f: impl FnOnce(&[u8]) -> R) -> R
where
    T: Canonical + ?Sized,
{
    SCRATCH.with(|scratch| match scratch.try_borrow_mut() {
        Ok(mut buf) => {
            buf.clear();
            value.encode(&mut buf);
            f(&buf)
        }
        Err(_) => f(&to_canonical_bytes(value)),
    })
}

/// 32-bit hash of the canonical encoding of `value`.
#[inline]
pub fn hash_value<T: Canonical + ?Sized>(value: &T, seed: u32) -> u32 {
    with_canonical_bytes(value, |data| murmur3_x86_32(data, seed))
}

/// 128-bit hash of the canonical encoding of `value`.
#[inline]
pub fn hash_value_128<T: Canonical + ?Sized>(value: &T, seed: u32) -> u128 {
    with_canonical_bytes(value, |data| murmur3_x64_128(data, seed))
}

impl<T: Canonical + ?Sized> Canonical for &T {
    const TAG: u8 = T::TAG;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        (**self).encode(out)
    }
}

impl<T: Canonical + ?Sized> Canonical for Box<T> {
    const TAG: u8 = T::TAG;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        (**self).encode(out)
    }
}

impl Canonical for str {
    const TAG: u8 = tag::STR;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes())
    }
}

impl Canonical for String {
    const TAG: u8 = tag::STR;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes())
    }
}

impl Canonical for [u8] {
    const TAG: u8 = tag::BYTES;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self)
    }
}

impl<const N: usize> Canonical for [u8; N] {
    const TAG: u8 = tag::BYTES;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self)
    }
}

impl Canonical for Vec<u8> {
    const TAG: u8 = tag::BYTES;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self)
    }
}

impl Canonical for bool {
    const TAG: u8 = tag::BOOL;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self))
    }
}

macro_rules! canonical_int {
    ($($type:ty => $tag:ident),* $(,)?) => {
        $(
            impl Canonical for $type {
                const TAG: u8 = tag::$tag;

                #[inline]
                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes())
                }
            }
        )*
    };
}

canonical_int! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
}

impl Canonical for usize {
    const TAG: u8 = tag::U64;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as u64).to_le_bytes())
    }
}

impl Canonical for isize {
    const TAG: u8 = tag::I64;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as i64).to_le_bytes())
    }
}

impl Canonical for char {
    const TAG: u8 = tag::CHAR;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u32::from(*self).to_le_bytes())
    }
}

impl Canonical for f32 {
    const TAG: u8 = tag::F32;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        let bits = if self.is_nan() {
            f32::NAN.to_bits()
        } else if *self == 0.0 {
            0
        } else {
            self.to_bits()
        };
        out.extend_from_slice(&bits.to_le_bytes())
    }
}

impl Canonical for f64 {
    const TAG: u8 = tag::F64;

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        let bits = if self.is_nan() {
            f64::NAN.to_bits()
        } else if *self == 0.0 {
            0
        } else {
            self.to_bits()
        };
        out.extend_from_slice(&bits.to_le_bytes())
    }
}

impl<T: Canonical> Canonical for Option<T> {
    const TAG: u8 = tag::OPTION;

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            None => out.push(0),
            Some(value) => {
                out.push(1);
                Record::new(out).field(value);
            }
        }
    }
}

macro_rules! canonical_tuple {
    ($(($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name: Canonical),+> Canonical for ($($name,)+) {
                const TAG: u8 = tag::RECORD;

                #[allow(non_snake_case)]
                fn encode(&self, out: &mut Vec<u8>) {
                    let ($($name,)+) = self;
                    let mut record = Record::new(out);
                    $(record.field($name);)+
                }
            }
        )*
    };
}

canonical_tuple! {
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
}
