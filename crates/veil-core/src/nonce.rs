use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Freshness token for offers and presentation requests.
///
/// A 128-bit random value carried as its decimal string so it survives any
/// text encoding unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh random nonce.
    pub fn new() -> Self {
        let value: u128 = rand::thread_rng().gen();
        Self(value.to_string())
    }

    /// Parse a nonce from its decimal form.
    pub fn from_dec(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidNonce(format!(
                "nonce must be a decimal string, got: {:?}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// The decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes fed into proof transcripts.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Nonce {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_dec(value)
    }
}

impl From<Nonce> for String {
    fn from(nonce: Nonce) -> Self {
        nonce.0
    }
}
