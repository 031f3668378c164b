use dashmap::DashMap;

use veil_core::CredentialDefinitionId;
use veil_crypto::Tails;

use crate::error::CredentialError;
use crate::issuance::Credential;
use crate::revocation::{
    witness_for, CredentialRevocationState, RevocationRegistryDefinition, RevocationStatusList,
};

/// Holder-side store of processed credentials bound to one link secret.
pub struct CredentialWallet {
    link_secret_id: String,
    /// Credential ID → credential.
    credentials: DashMap<String, Credential>,
}

impl CredentialWallet {
    pub fn new(link_secret_id: impl Into<String>) -> Self {
        Self {
            link_secret_id: link_secret_id.into(),
            credentials: DashMap::new(),
        }
    }

    /// Name of the link secret every stored credential is bound to.
    pub fn link_secret_id(&self) -> &str {
        &self.link_secret_id
    }

    pub fn store(&self, id: impl Into<String>, credential: Credential) {
        let id = id.into();
        tracing::debug!(
            credential_id = %id,
            cred_def_id = %credential.cred_def_id,
            "credential stored in wallet"
        );
        self.credentials.insert(id, credential);
    }

    pub fn get(&self, id: &str) -> Option<Credential> {
        self.credentials.get(id).map(|e| e.clone())
    }

    pub fn list(&self) -> Vec<String> {
        self.credentials.iter().map(|e| e.key().clone()).collect()
    }

    pub fn list_by_cred_def(&self, cred_def_id: &CredentialDefinitionId) -> Vec<Credential> {
        self.credentials
            .iter()
            .filter(|e| &e.cred_def_id == cred_def_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn remove(&self, id: &str) -> Option<Credential> {
        self.credentials.remove(id).map(|(_, c)| c)
    }

    pub fn revocation_state(&self, id: &str) -> Option<CredentialRevocationState> {
        self.credentials.get(id).and_then(|e| e.witness.clone())
    }

    /// Replace the stored witness. Only a witness that verifies for the
    /// credential's element is accepted.
    pub fn update_revocation_state(
        &self,
        id: &str,
        state: CredentialRevocationState,
    ) -> Result<(), CredentialError> {
        let mut entry = self
            .credentials
            .get_mut(id)
            .ok_or_else(|| CredentialError::InvalidConfiguration(format!("no credential {}", id)))?;
        let info = entry.revocation.as_ref().ok_or_else(|| {
            CredentialError::InvalidConfiguration(format!("credential {} is not revocable", id))
        })?;
        if !state.verify(&info.element) {
            return Err(CredentialError::InvalidWitness);
        }
        tracing::debug!(credential_id = %id, timestamp = state.timestamp, "revocation state updated");
        entry.witness = Some(state);
        Ok(())
    }

    /// Recompute the witness of credential `id` against `status_list`.
    pub fn refresh_revocation_state(
        &self,
        id: &str,
        status_list: &RevocationStatusList,
        definition: &RevocationRegistryDefinition,
        tails: &Tails,
    ) -> Result<CredentialRevocationState, CredentialError> {
        let index = self
            .credentials
            .get(id)
            .and_then(|e| e.revocation.as_ref().map(|r| r.index))
            .ok_or_else(|| {
                CredentialError::InvalidConfiguration(format!("no revocable credential {}", id))
            })?;
        let state = witness_for(index, status_list, definition, tails)?;
        self.update_revocation_state(id, state.clone())?;
        Ok(state)
    }
}
