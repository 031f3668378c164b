//! Veil Credentials — Schemas, credential definitions, link secrets, blind
//! issuance, holder wallet, and accumulator revocation registries.

pub mod definition;
pub mod error;
pub mod holder;
pub mod issuance;
pub mod link_secret;
pub mod revocation;
pub mod schema;

pub use definition::{
    verify_correctness, CredentialDefinition, CredentialDefinitionConfig,
    CredentialDefinitionPrivate, LINK_SECRET_INDEX,
};
pub use error::CredentialError;
pub use holder::CredentialWallet;
pub use issuance::{
    create_credential, create_offer, create_request, process_credential, Credential,
    CredentialOffer, CredentialRequest, CredentialRequestMetadata, CredentialRevocationInfo,
    CredentialValues, IssuanceExchange, IssuedCredential, RevocationHandle,
};
pub use link_secret::LinkSecret;
pub use revocation::{
    witness_for, CredentialRevocationState, InMemoryTailsStore, RegistryContext,
    RevocationConfig, RevocationRegistryDefinition, RevocationRegistryDefinitionPrivate,
    RevocationRegistryDefinitionValue, RevocationStatusList, TailsReader, TailsWriter,
};
pub use schema::{Schema, SchemaRegistry};
