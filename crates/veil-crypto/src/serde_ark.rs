//! Serde adapters for arkworks types.
//!
//! Points, scalars and pairing outputs are written as lowercase hex of their
//! compressed canonical encoding, and validated on the way back in.

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

/// Use with `#[serde_as(as = "ArkObjectBytes")]`.
pub struct ArkObjectBytes;

impl<T: CanonicalSerialize> SerializeAs<T> for ArkObjectBytes {
    fn serialize_as<S>(source: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut bytes = Vec::with_capacity(source.compressed_size());
        source
            .serialize_compressed(&mut bytes)
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&hex::encode(bytes))
    }
}

impl<'de, T: CanonicalDeserialize> DeserializeAs<'de, T> for ArkObjectBytes {
    fn deserialize_as<D>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        T::deserialize_compressed(bytes.as_slice()).map_err(D::Error::custom)
    }
}
