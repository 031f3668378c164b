use bbs_plus::prelude::BBSPlusError;
use schnorr_pok::error::SchnorrError;
use vb_accumulator::prelude::VBAccumulatorError;

/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGenerationError(String),

    #[error("invalid message count: expected {expected}, got {actual}")]
    InvalidMessageCount { expected: usize, actual: usize },

    #[error("message index {index} out of range for {count} messages")]
    MessageIndexOutOfRange { index: usize, count: usize },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("zero-knowledge proof error: {0}")]
    ZkpError(String),

    #[error("tails too short: need {needed} powers, have {available}")]
    TailsTooShort { needed: usize, available: usize },
}

impl From<BBSPlusError> for CryptoError {
    fn from(e: BBSPlusError) -> Self {
        match e {
            BBSPlusError::InvalidSignature => Self::SignatureVerificationFailed,
            BBSPlusError::MessageCountIncompatibleWithSigParams(actual, expected) => {
                Self::InvalidMessageCount { expected, actual }
            }
            other => Self::ZkpError(format!("signature: {:?}", other)),
        }
    }
}

impl From<VBAccumulatorError> for CryptoError {
    fn from(e: VBAccumulatorError) -> Self {
        Self::ZkpError(format!("accumulator: {:?}", e))
    }
}

impl From<SchnorrError> for CryptoError {
    fn from(e: SchnorrError) -> Self {
        Self::ZkpError(format!("schnorr: {:?}", e))
    }
}
