use veil_core::CoreError;
use veil_credentials::CredentialError;
use veil_crypto::CryptoError;

/// Presentation errors. Proofs that fail to verify are reported as
/// `Ok(false)` by the verifier, not as errors.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("invalid presentation request: {0}")]
    InvalidRequest(String),

    #[error("nonce mismatch: request carries {expected}, presentation carries {actual}")]
    NonceMismatch { expected: String, actual: String },

    #[error("unknown referent: {0}")]
    UnknownReferent(String),

    #[error("referent not answered: {0}")]
    MissingReferent(String),

    #[error("credential entry {0} does not exist")]
    InvalidEntry(usize),

    #[error("schema not found: {0}")]
    MissingSchema(String),

    #[error("credential definition not found: {0}")]
    MissingCredentialDefinition(String),

    #[error("revocation registry definition not found: {0}")]
    MissingRegistryDefinition(String),

    #[error("no status list for registry {rev_reg_id} at timestamp {timestamp}")]
    MissingStatusList { rev_reg_id: String, timestamp: u64 },

    #[error("attribute {0} is not part of the credential")]
    AttributeNotInCredential(String),

    #[error("attribute {0} is both revealed and used in a predicate")]
    RevealedPredicateAttribute(String),

    #[error("predicate attribute {0} is not a 32-bit integer")]
    PredicateNotNumeric(String),

    #[error("predicate on {0} is not satisfied")]
    PredicateNotSatisfied(String),

    #[error("insufficient witness: {0}")]
    InsufficientWitness(String),

    #[error("invalid proof data: {0}")]
    InvalidProofData(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
