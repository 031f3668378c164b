use serde::{Deserialize, Serialize};

use veil_crypto::{
    Accumulator, AccumulatorParams, AccumulatorPublicKey, MembershipWitness, Scalar, Tails,
};

use crate::error::CredentialError;
use crate::revocation::registry::RevocationRegistryDefinition;
use crate::revocation::status_list::RevocationStatusList;

/// A holder's non-revocation witness, valid for one status-list snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRevocationState {
    pub witness: MembershipWitness,
    pub accumulator: Accumulator,
    pub accum_key: AccumulatorPublicKey,
    pub timestamp: u64,
}

impl CredentialRevocationState {
    /// Whether `element` is a member of the snapshot this state was made for.
    pub fn verify(&self, element: &Scalar) -> bool {
        self.accumulator.verify_membership(
            element,
            &self.witness,
            &self.accum_key,
            &AccumulatorParams::generate(),
        )
    }
}

/// Recompute the witness for `index` from a public snapshot and the tails.
///
/// A revoked index still gets a witness; it will not verify.
pub fn witness_for(
    index: u32,
    status_list: &RevocationStatusList,
    def: &RevocationRegistryDefinition,
    tails: &Tails,
) -> Result<CredentialRevocationState, CredentialError> {
    def.check_index(index)?;
    let actual = tails.content_hash();
    if actual != def.value.tails_hash {
        return Err(CredentialError::TailsMismatch {
            expected: def.value.tails_hash.clone(),
            actual,
        });
    }
    if status_list.is_revoked(index) {
        tracing::warn!(
            rev_reg_def_id = %status_list.rev_reg_def_id,
            index,
            timestamp = status_list.timestamp,
            "computing witness for a revoked index"
        );
    }

    let others = def.elements(
        status_list
            .active_indices(def.max_cred_num())
            .filter(|i| *i != index),
    )?;
    let witness = tails.witness(&others)?;

    tracing::debug!(
        rev_reg_def_id = %status_list.rev_reg_def_id,
        index,
        timestamp = status_list.timestamp,
        "witness recomputed"
    );

    Ok(CredentialRevocationState {
        witness,
        accumulator: status_list.accum,
        accum_key: def.value.accum_key.clone(),
        timestamp: status_list.timestamp,
    })
}
