//! Veil Core — Identifiers, attribute encoding, freshness nonces, the issuance
//! state machine, and engine configuration shared by every Veil crate.

pub mod config;
pub mod error;
pub mod issuance_state;
pub mod nonce;
pub mod telemetry;
pub mod types;

pub use config::{EngineConfig, LoggingConfig, RevocationSettings, TimestampPolicy};
pub use error::CoreError;
pub use issuance_state::{IssuanceEvent, IssuanceState, IssuanceStateMachine};
pub use nonce::Nonce;
pub use types::{
    encode_attribute, normalize_attribute_name, AttributeValue, CredentialDefinitionId,
    IssuerId, NonRevokedInterval, RegistryType, RevocationRegistryDefinitionId, SchemaId,
    SignatureType,
};
