use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use veil_core::{IssuerId, RevocationRegistryDefinitionId, TimestampPolicy};
use veil_crypto::{Accumulator, AccumulatorParams};

use crate::error::CredentialError;
use crate::revocation::registry::{RevocationRegistryDefinition, RevocationRegistryDefinitionPrivate};

pub(crate) fn now_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// Accumulator value and revoked set of one registry at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationStatusList {
    pub rev_reg_def_id: RevocationRegistryDefinitionId,
    pub issuer_id: IssuerId,
    pub revoked: BTreeSet<u32>,
    pub accum: Accumulator,
    pub timestamp: u64,
}

fn accumulate(
    def: &RevocationRegistryDefinition,
    private: &RevocationRegistryDefinitionPrivate,
    revoked: &BTreeSet<u32>,
) -> Result<Accumulator, CredentialError> {
    let active = def.elements((0..def.max_cred_num()).filter(|i| !revoked.contains(i)))?;
    Ok(Accumulator::from_members(
        &private.secret_key,
        &AccumulatorParams::generate(),
        &active,
    ))
}

impl RevocationStatusList {
    /// First snapshot of a registry. With `issuance_by_default` every index
    /// starts active, otherwise every index starts revoked.
    pub fn create(
        def: &RevocationRegistryDefinition,
        rev_reg_def_id: RevocationRegistryDefinitionId,
        private: &RevocationRegistryDefinitionPrivate,
        issuance_by_default: bool,
        timestamp: Option<u64>,
    ) -> Result<Self, CredentialError> {
        let revoked: BTreeSet<u32> = if issuance_by_default {
            BTreeSet::new()
        } else {
            (0..def.max_cred_num()).collect()
        };
        let accum = accumulate(def, private, &revoked)?;
        let list = Self {
            rev_reg_def_id,
            issuer_id: def.issuer_id.clone(),
            revoked,
            accum,
            timestamp: timestamp.unwrap_or_else(now_timestamp),
        };
        tracing::info!(
            rev_reg_def_id = %list.rev_reg_def_id,
            timestamp = list.timestamp,
            issuance_by_default,
            "status list issued"
        );
        Ok(list)
    }

    /// Next snapshot after flipping the given indices.
    ///
    /// Indices already in the requested state are left alone. The timestamp
    /// must follow this snapshot's under `policy`.
    pub fn update(
        &self,
        def: &RevocationRegistryDefinition,
        private: &RevocationRegistryDefinitionPrivate,
        policy: TimestampPolicy,
        timestamp: Option<u64>,
        revoked: &BTreeSet<u32>,
        unrevoked: &BTreeSet<u32>,
    ) -> Result<Self, CredentialError> {
        let timestamp = timestamp.unwrap_or_else(now_timestamp);
        if !policy.permits(self.timestamp, timestamp) {
            return Err(CredentialError::NonMonotonicTimestamp {
                last: self.timestamp,
                next: timestamp,
            });
        }
        for index in revoked.iter().chain(unrevoked.iter()) {
            def.check_index(*index)?;
        }
        if let Some(index) = revoked.intersection(unrevoked).next() {
            return Err(CredentialError::InvalidConfiguration(format!(
                "index {} is both revoked and unrevoked",
                index
            )));
        }

        let mut next = self.revoked.clone();
        next.extend(revoked.iter().copied());
        for index in unrevoked {
            next.remove(index);
        }

        let accum = if next == self.revoked {
            self.accum
        } else {
            accumulate(def, private, &next)?
        };

        tracing::info!(
            rev_reg_def_id = %self.rev_reg_def_id,
            timestamp,
            revoked = next.len(),
            changed = next != self.revoked,
            "status list updated"
        );

        Ok(Self {
            rev_reg_def_id: self.rev_reg_def_id.clone(),
            issuer_id: self.issuer_id.clone(),
            revoked: next,
            accum,
            timestamp,
        })
    }

    pub fn is_revoked(&self, index: u32) -> bool {
        self.revoked.contains(&index)
    }

    /// Indices active in this snapshot.
    pub fn active_indices(&self, max_cred_num: u32) -> impl Iterator<Item = u32> + '_ {
        (0..max_cred_num).filter(move |i| !self.revoked.contains(i))
    }
}
