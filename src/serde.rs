//! # Serde module for Sketch
//!
//! `Sketch` is serialized as a tuple mirroring the binary format:
//! `(version, precision, scheme tag, seed, registers)`.
//!
//! Deserialization goes through the same validation as [`Sketch::from_bytes`], so a
//! sketch can't be built out of registers that its configuration could never produce.
//!
//! Refer to the serde documentation for more details on custom serialization and deserialization:
//! - [Serialization](https://serde.rs/impl-serialize.html)
//! - [Deserialization](https://serde.rs/impl-deserialize.html)
use serde::de::Error;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::codec::{from_parts, FORMAT_VERSION};
use crate::hash::SketchHash;
use crate::sketch::Sketch;

impl Serialize for Sketch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(5)?;
        tup.serialize_element(&FORMAT_VERSION)?;
        tup.serialize_element(&self.precision())?;
        tup.serialize_element(&self.hasher().tag())?;
        tup.serialize_element(&self.hasher().seed())?;
        tup.serialize_element(self.registers().as_slice())?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for Sketch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (version, precision, scheme, seed, registers): (u8, u8, u8, u32, Vec<u8>) =
            Deserialize::deserialize(deserializer)?;
        from_parts(version, precision, scheme, seed, registers.into_boxed_slice())
            .map_err(Error::custom)
    }
}
