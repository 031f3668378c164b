//! Accumulator-based revocation: registry definitions, timestamped status
//! lists, the owner-side registry context, tails storage and holder
//! witnesses.

pub mod context;
pub mod registry;
pub mod status_list;
pub mod tails;
pub mod witness;

pub use context::{RegistryContext, RevocationConfig};
pub use registry::{
    RevocationRegistryDefinition, RevocationRegistryDefinitionPrivate,
    RevocationRegistryDefinitionValue,
};
pub use status_list::RevocationStatusList;
pub use tails::{InMemoryTailsStore, TailsReader, TailsWriter};
pub use witness::{witness_for, CredentialRevocationState};
