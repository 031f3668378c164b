use veil_core::CoreError;
use veil_crypto::CryptoError;

/// Credential lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("schema already registered: {0}")]
    DuplicateSchema(String),

    #[error("key generation failed: {0}")]
    KeyGenerationError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("attribute mismatch: {0}")]
    AttributeMismatch(String),

    #[error("revocation index {index} out of range for registry of size {max}")]
    IndexOutOfRange { index: u32, max: u32 },

    #[error("revocation registry is full ({max} indices assigned)")]
    RevocationCapacity { max: u32 },

    #[error("revocation index {0} is already assigned")]
    IndexAlreadyAssigned(u32),

    #[error("revocation index {0} is not active")]
    IndexNotActive(u32),

    #[error("non-monotonic status list timestamp: {next} does not follow {last}")]
    NonMonotonicTimestamp { last: u64, next: u64 },

    #[error("tails hash mismatch: expected {expected}, got {actual}")]
    TailsMismatch { expected: String, actual: String },

    #[error("tails not found at {0}")]
    TailsNotFound(String),

    #[error("key correctness proof does not verify")]
    InvalidCorrectnessProof,

    #[error("blinded link secret proof does not verify")]
    InvalidBlindedSecretProof,

    #[error("credential signature does not verify")]
    SignatureVerification,

    #[error("inconsistent attribute encoding: {0}")]
    InconsistentAttribute(String),

    #[error("revocation witness does not verify")]
    InvalidWitness,

    #[error("missing revocation registry definition: {0}")]
    MissingRegistryDefinition(String),

    #[error("invalid link secret: {0}")]
    InvalidLinkSecret(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
