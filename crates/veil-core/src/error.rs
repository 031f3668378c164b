use crate::issuance_state::IssuanceState;

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: IssuanceState,
        to: IssuanceState,
    },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("unsupported signature type: {0}")]
    UnsupportedSignatureType(String),

    #[error("unsupported revocation registry type: {0}")]
    UnsupportedRegistryType(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("invalid encoded attribute value: {0}")]
    InvalidEncoding(String),

    #[error("invalid non-revocation interval: from {from} is after to {to}")]
    InvalidInterval { from: u64, to: u64 },

    #[error("telemetry error: {0}")]
    Telemetry(String),
}
