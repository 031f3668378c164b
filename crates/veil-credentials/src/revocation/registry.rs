use rand::RngCore;
use serde::{Deserialize, Serialize};

use veil_core::{CredentialDefinitionId, IssuerId, RegistryType};
use veil_crypto::{
    element_for_index, AccumulatorParams, AccumulatorPublicKey, AccumulatorSecretKey, Scalar,
    Tails,
};

use crate::definition::CredentialDefinition;
use crate::error::CredentialError;
use crate::revocation::tails::TailsWriter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDefinitionValue {
    /// Size of the index space `[0, max_cred_num)`.
    pub max_cred_num: u32,
    pub accum_key: AccumulatorPublicKey,
    pub tails_location: String,
    pub tails_hash: String,
    /// Hex seed from which per-index accumulator elements are derived.
    pub element_seed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDefinition {
    pub issuer_id: IssuerId,
    pub revoc_def_type: RegistryType,
    pub tag: String,
    pub cred_def_id: CredentialDefinitionId,
    pub value: RevocationRegistryDefinitionValue,
}

/// Accumulator trapdoor. Never serialised.
#[derive(Debug)]
pub struct RevocationRegistryDefinitionPrivate {
    pub(crate) secret_key: AccumulatorSecretKey,
}

impl RevocationRegistryDefinition {
    /// Allocate a registry over `[0, max_cred_num)` for `cred_def`.
    ///
    /// The tails are published through `tails_writer`; its location and the
    /// tails hash are recorded in the definition.
    pub fn create<W: TailsWriter + ?Sized>(
        cred_def: &CredentialDefinition,
        cred_def_id: CredentialDefinitionId,
        issuer_id: IssuerId,
        tag: &str,
        registry_type: &str,
        max_cred_num: u32,
        tails_writer: &W,
    ) -> Result<(Self, RevocationRegistryDefinitionPrivate), CredentialError> {
        let revoc_def_type = registry_type.parse::<RegistryType>()?;
        if !cred_def.support_revocation {
            return Err(CredentialError::InvalidConfiguration(format!(
                "credential definition {} does not support revocation",
                cred_def_id
            )));
        }
        if max_cred_num == 0 {
            return Err(CredentialError::InvalidConfiguration(
                "registry must hold at least one index".into(),
            ));
        }

        let mut rng = rand::thread_rng();
        let params = AccumulatorParams::generate();
        let secret_key = AccumulatorSecretKey::generate(&mut rng);
        let accum_key = AccumulatorPublicKey::from_secret(&secret_key, &params);
        let tails = Tails::generate(&secret_key, &params, max_cred_num);
        let tails_hash = tails.content_hash();
        let tails_location = tails_writer.write(&tails)?;

        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);

        let definition = Self {
            issuer_id,
            revoc_def_type,
            tag: tag.to_string(),
            cred_def_id,
            value: RevocationRegistryDefinitionValue {
                max_cred_num,
                accum_key,
                tails_location,
                tails_hash,
                element_seed: hex::encode(seed),
            },
        };

        tracing::info!(
            cred_def_id = %definition.cred_def_id,
            max_cred_num,
            tails_location = %definition.value.tails_location,
            "revocation registry created"
        );

        Ok((definition, RevocationRegistryDefinitionPrivate { secret_key }))
    }

    pub fn max_cred_num(&self) -> u32 {
        self.value.max_cred_num
    }

    pub fn check_index(&self, index: u32) -> Result<(), CredentialError> {
        if index >= self.value.max_cred_num {
            return Err(CredentialError::IndexOutOfRange {
                index,
                max: self.value.max_cred_num,
            });
        }
        Ok(())
    }

    /// Accumulator element standing for `index`.
    pub fn element(&self, index: u32) -> Result<Scalar, CredentialError> {
        self.check_index(index)?;
        let seed = hex::decode(&self.value.element_seed)
            .map_err(|e| CredentialError::Serialization(format!("element seed: {}", e)))?;
        Ok(element_for_index(&seed, index))
    }

    /// Elements for every index in `indices`.
    pub fn elements(
        &self,
        indices: impl IntoIterator<Item = u32>,
    ) -> Result<Vec<Scalar>, CredentialError> {
        indices.into_iter().map(|i| self.element(i)).collect()
    }
}
