use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier of an issuer.
    IssuerId
);
identifier!(
    /// Identifier under which a schema is published.
    SchemaId
);
identifier!(
    /// Identifier under which a credential definition is published.
    CredentialDefinitionId
);
identifier!(
    /// Identifier under which a revocation registry definition is published.
    RevocationRegistryDefinitionId
);

/// Supported attribute-signature schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    /// Pairing-based multi-message signature over BLS12-381 with blind issuance.
    #[serde(rename = "CL")]
    Cl,
}

impl SignatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cl => "CL",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignatureType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CL" => Ok(Self::Cl),
            other => Err(CoreError::UnsupportedSignatureType(other.to_string())),
        }
    }
}

/// Supported revocation accumulator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryType {
    /// Pairing-based positive accumulator with tails-derived witnesses.
    #[serde(rename = "CL_ACCUM")]
    ClAccum,
}

impl RegistryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClAccum => "CL_ACCUM",
        }
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegistryType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CL_ACCUM" => Ok(Self::ClAccum),
            other => Err(CoreError::UnsupportedRegistryType(other.to_string())),
        }
    }
}

/// A credential attribute value in its raw and encoded forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Value as supplied by the issuer.
    pub raw: String,
    /// Decimal encoding that gets signed.
    pub encoded: String,
}

impl AttributeValue {
    /// Build a value, deriving the encoding from the raw form.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let encoded = encode_attribute(&raw);
        Self { raw, encoded }
    }

    /// Whether the encoded form is the one `raw` produces.
    pub fn is_consistent(&self) -> bool {
        encode_attribute(&self.raw) == self.encoded
    }

    /// The raw value as an integer, if it is one. Only such values take part
    /// in predicates.
    pub fn as_i32(&self) -> Option<i32> {
        self.raw.parse::<i32>().ok()
    }
}

/// Encode a raw attribute value as a decimal string.
///
/// 32-bit integers encode as themselves so predicates can be proven over them.
/// Anything else encodes as the decimal value of its BLAKE3 digest.
pub fn encode_attribute(raw: &str) -> String {
    match raw.parse::<i32>() {
        Ok(value) => value.to_string(),
        Err(_) => BigUint::from_bytes_be(blake3::hash(raw.as_bytes()).as_bytes()).to_string(),
    }
}

/// Canonical form used when comparing attribute names.
pub fn normalize_attribute_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Window in which a holder must show its credential was not revoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRevokedInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl NonRevokedInterval {
    pub fn new(from: Option<u64>, to: Option<u64>) -> Self {
        Self { from, to }
    }

    /// Reject intervals whose bounds are inverted.
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(CoreError::InvalidInterval { from, to }),
            _ => Ok(()),
        }
    }

    /// Whether `timestamp` lies within the interval (bounds inclusive).
    pub fn contains(&self, timestamp: u64) -> bool {
        self.from.map_or(true, |from| from <= timestamp)
            && self.to.map_or(true, |to| timestamp <= to)
    }

    /// The interval that applies to one referent: its own if set, else the
    /// request-wide one.
    pub fn resolve(global: Option<&Self>, local: Option<&Self>) -> Option<Self> {
        local.or(global).copied()
    }
}
