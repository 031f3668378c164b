use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use veil_core::{
    normalize_attribute_name, AttributeValue, CredentialDefinitionId, NonRevokedInterval,
    RevocationRegistryDefinitionId, SchemaId,
};
use veil_credentials::{
    CredentialDefinition, RevocationRegistryDefinition, RevocationStatusList, Schema,
    LINK_SECRET_INDEX,
};
use veil_crypto::{
    scalar_from_encoded, scalar_from_i64, AccumulatorParams, BoundGenerators, BoundStatement,
    MembershipProvingKey, MembershipStatement, Scalar, Transcript,
};

use crate::error::ProofError;
use crate::presentation::{
    append_predicate, PredicateProof, Presentation, SubProof, TRANSCRIPT_LABEL,
};
use crate::request::{restrictions_satisfied, PresentationRequest, RestrictionContext};

/// Lets a verifier accept a status list published later than the `from` it
/// asked for, for one registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonRevokedIntervalOverride {
    pub rev_reg_def_id: RevocationRegistryDefinitionId,
    pub requested_from_timestamp: u64,
    pub override_rev_status_list_timestamp: u64,
}

/// Verifies presentations against a fixed set of published artifacts.
pub struct PresentationVerifier<'a> {
    schemas: &'a BTreeMap<SchemaId, Schema>,
    cred_defs: &'a BTreeMap<CredentialDefinitionId, CredentialDefinition>,
    rev_reg_defs: &'a BTreeMap<RevocationRegistryDefinitionId, RevocationRegistryDefinition>,
    status_lists: &'a [RevocationStatusList],
    overrides: BTreeMap<(RevocationRegistryDefinitionId, u64), u64>,
    bound_gens: BoundGenerators,
    accumulator_params: AccumulatorParams,
    proving_key: MembershipProvingKey,
}

struct PreparedPredicate<'p> {
    index: usize,
    statement: BoundStatement,
    proof: &'p PredicateProof,
}

struct PreparedRevocation<'a> {
    status_list: &'a RevocationStatusList,
    registry: &'a RevocationRegistryDefinition,
    index: usize,
}

struct Prepared<'a, 'p> {
    sub_proof: &'p SubProof,
    definition: &'a CredentialDefinition,
    revealed: BTreeMap<usize, Scalar>,
    predicates: Vec<PreparedPredicate<'p>>,
    revocation: Option<PreparedRevocation<'a>>,
}

fn fail(sub_proof_index: usize, reason: &str) -> bool {
    tracing::warn!(sub_proof_index, reason, "presentation rejected");
    false
}

fn reject<T>(sub_proof_index: usize, reason: &str) -> Result<Option<T>, ProofError> {
    fail(sub_proof_index, reason);
    Ok(None)
}

impl<'a> PresentationVerifier<'a> {
    pub fn new(
        schemas: &'a BTreeMap<SchemaId, Schema>,
        cred_defs: &'a BTreeMap<CredentialDefinitionId, CredentialDefinition>,
        rev_reg_defs: &'a BTreeMap<RevocationRegistryDefinitionId, RevocationRegistryDefinition>,
        status_lists: &'a [RevocationStatusList],
    ) -> Self {
        Self {
            schemas,
            cred_defs,
            rev_reg_defs,
            status_lists,
            overrides: BTreeMap::new(),
            bound_gens: BoundGenerators::generate(),
            accumulator_params: AccumulatorParams::generate(),
            proving_key: MembershipProvingKey::generate(),
        }
    }

    pub fn with_overrides(mut self, overrides: &[NonRevokedIntervalOverride]) -> Self {
        for o in overrides {
            self.overrides.insert(
                (o.rev_reg_def_id.clone(), o.requested_from_timestamp),
                o.override_rev_status_list_timestamp,
            );
        }
        self
    }

    /// The snapshot of `rev_reg_id` a presentation for `interval` must prove
    /// against: the latest supplied list inside the interval. The last one
    /// published wins when several share a timestamp.
    fn authoritative_status_list(
        &self,
        rev_reg_id: &RevocationRegistryDefinitionId,
        interval: &NonRevokedInterval,
    ) -> Option<&'a RevocationStatusList> {
        self.status_lists
            .iter()
            .filter(|l| &l.rev_reg_def_id == rev_reg_id && interval.contains(l.timestamp))
            .fold(None, |latest: Option<&'a RevocationStatusList>, l| match latest {
                Some(latest) if latest.timestamp > l.timestamp => Some(latest),
                _ => Some(l),
            })
    }

    /// Check `presentation` against `request`.
    ///
    /// Malformed input is an error: a nonce mismatch, a referent the request
    /// does not know or the presentation does not answer, or a missing
    /// schema, definition, registry or status list. Anything that merely
    /// fails to verify is `Ok(false)`.
    pub fn verify(
        &self,
        presentation: &Presentation,
        request: &PresentationRequest,
    ) -> Result<bool, ProofError> {
        if presentation.nonce != request.nonce {
            return Err(ProofError::NonceMismatch {
                expected: request.nonce.to_string(),
                actual: presentation.nonce.to_string(),
            });
        }
        request.validate()?;
        let proof = &presentation.requested_proof;
        if presentation.sub_proofs.len() != presentation.identifiers.len() {
            return Err(ProofError::InvalidProofData(format!(
                "{} sub-proofs but {} identifiers",
                presentation.sub_proofs.len(),
                presentation.identifiers.len()
            )));
        }

        for referent in proof
            .revealed_attrs
            .keys()
            .chain(proof.revealed_attr_groups.keys())
            .chain(proof.unrevealed_attrs.keys())
        {
            if !request.requested_attributes.contains_key(referent) {
                return Err(ProofError::UnknownReferent(referent.clone()));
            }
        }
        if let Some(referent) = proof
            .predicates
            .keys()
            .find(|r| !request.requested_predicates.contains_key(*r))
        {
            return Err(ProofError::UnknownReferent(referent.clone()));
        }

        let mut by_sub_proof: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for referent in request.referents() {
            let index = proof
                .sub_proof_index(referent)
                .ok_or_else(|| ProofError::MissingReferent(referent.to_string()))?;
            if index >= presentation.sub_proofs.len() {
                return Err(ProofError::InvalidProofData(format!(
                    "referent {} points at missing sub-proof {}",
                    referent, index
                )));
            }
            by_sub_proof.entry(index).or_default().push(referent);
        }

        let mut prepared = Vec::with_capacity(presentation.sub_proofs.len());
        for index in 0..presentation.sub_proofs.len() {
            let referents = by_sub_proof.remove(&index).unwrap_or_default();
            match self.prepare(presentation, request, index, &referents)? {
                Some(p) => prepared.push(p),
                None => return Ok(false),
            }
        }

        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        transcript.append_message(b"nonce", request.nonce.as_bytes());
        for (p, identifier) in prepared.iter().zip(&presentation.identifiers) {
            identifier.append_to(&mut transcript);
            p.sub_proof
                .signature_proof
                .challenge_contribution(&p.revealed, &p.definition.params, &mut transcript)?;
            for predicate in &p.predicates {
                append_predicate(
                    &mut transcript,
                    predicate.index,
                    predicate.proof.p_type,
                    predicate.proof.p_value,
                );
                predicate
                    .proof
                    .proof
                    .challenge_contribution(&predicate.statement, &self.bound_gens, &mut transcript)?;
            }
            if let (Some(r), Some(membership)) = (&p.revocation, &p.sub_proof.non_revocation) {
                membership.challenge_contribution(&self.membership_statement(r), &mut transcript)?;
            }
        }
        let challenge = transcript.challenge(b"challenge");

        let mut link_response = None;
        for (index, p) in prepared.iter().enumerate() {
            let signature = &p.sub_proof.signature_proof;
            if !signature.verify(
                &p.revealed,
                &challenge,
                &p.definition.public_key,
                &p.definition.params,
            ) {
                return Ok(fail(index, "signature proof does not verify"));
            }

            let revealed: BTreeSet<usize> = p.revealed.keys().copied().collect();
            let response = signature.response_for_message(LINK_SECRET_INDEX, &revealed);
            match (link_response, response) {
                (_, None) => return Ok(fail(index, "link secret revealed")),
                (None, Some(r)) => link_response = Some(r),
                (Some(expected), Some(r)) if expected != r => {
                    return Ok(fail(index, "credentials bound to different link secrets"))
                }
                _ => {}
            }

            for predicate in &p.predicates {
                let linked = signature.response_for_message(predicate.index, &revealed)
                    == Some(predicate.proof.proof.response_for_value());
                if !linked
                    || !predicate.proof.proof.verify(
                        &predicate.statement,
                        &challenge,
                        &self.bound_gens,
                    )
                {
                    return Ok(fail(index, "predicate proof does not verify"));
                }
            }

            if let (Some(r), Some(membership)) = (&p.revocation, &p.sub_proof.non_revocation) {
                let linked = matches!(
                    (signature.response_for_message(r.index, &revealed), membership.response_for_element()),
                    (Some(a), Some(b)) if a == b
                );
                if !linked || !membership.verify(&self.membership_statement(r), &challenge) {
                    return Ok(fail(index, "non-revocation proof does not verify"));
                }
            }
        }

        tracing::info!(
            request = %request.name,
            sub_proofs = prepared.len(),
            "presentation verified"
        );
        Ok(true)
    }

    /// Verify independent presentations in parallel.
    pub fn verify_batch(
        &self,
        items: &[(&Presentation, &PresentationRequest)],
    ) -> Vec<Result<bool, ProofError>> {
        items
            .par_iter()
            .map(|(presentation, request)| self.verify(presentation, request))
            .collect()
    }

    fn membership_statement<'s>(&'s self, r: &'s PreparedRevocation<'a>) -> MembershipStatement<'s> {
        MembershipStatement {
            accumulator: &r.status_list.accum,
            public_key: &r.registry.value.accum_key,
            params: &self.accumulator_params,
            proving_key: &self.proving_key,
        }
    }

    /// Resolve everything sub-proof `index` refers to. `Ok(None)` means the
    /// presentation is well formed but does not satisfy the request.
    fn prepare<'p>(
        &self,
        presentation: &'p Presentation,
        request: &PresentationRequest,
        index: usize,
        referents: &[&str],
    ) -> Result<Option<Prepared<'a, 'p>>, ProofError> {
        let sub_proof = &presentation.sub_proofs[index];
        let identifier = &presentation.identifiers[index];
        let proof = &presentation.requested_proof;

        let schema = self
            .schemas
            .get(&identifier.schema_id)
            .ok_or_else(|| ProofError::MissingSchema(identifier.schema_id.to_string()))?;
        let definition = self.cred_defs.get(&identifier.cred_def_id).ok_or_else(|| {
            ProofError::MissingCredentialDefinition(identifier.cred_def_id.to_string())
        })?;
        if definition.schema_id != identifier.schema_id {
            return reject(index, "credential definition is for another schema");
        }

        let mut revealed = BTreeMap::new();
        let mut revealed_raw = BTreeMap::new();
        let mut reveal = |name: &str, value: &AttributeValue| -> bool {
            let Some(message_index) = definition.attribute_index(name) else {
                return false;
            };
            if !value.is_consistent() {
                return false;
            }
            let Ok(scalar) = scalar_from_encoded(&value.encoded) else {
                return false;
            };
            if revealed.insert(message_index, scalar).is_some_and(|prev| prev != scalar) {
                return false;
            }
            revealed_raw.insert(normalize_attribute_name(name), value.raw.clone());
            true
        };

        for (referent, attr) in proof.revealed_attrs.iter().filter(|(_, a)| a.sub_proof_index == index) {
            let Some(name) = request
                .requested_attributes
                .get(referent)
                .and_then(|info| info.name.as_deref())
            else {
                return reject(index, "revealed attribute answers an attribute group");
            };
            if !reveal(name, &attr.value()) {
                return reject(index, "revealed attribute is inconsistent");
            }
        }
        for (referent, group) in proof
            .revealed_attr_groups
            .iter()
            .filter(|(_, g)| g.sub_proof_index == index)
        {
            let expected: BTreeSet<&str> = request
                .requested_attributes
                .get(referent)
                .map(|info| info.attribute_names().into_iter().collect())
                .unwrap_or_default();
            let actual: BTreeSet<&str> = group.values.keys().map(String::as_str).collect();
            if expected != actual {
                return reject(index, "revealed group does not match the request");
            }
            for (name, value) in &group.values {
                if !reveal(name, value) {
                    return reject(index, "revealed attribute is inconsistent");
                }
            }
        }
        for referent in proof
            .unrevealed_attrs
            .iter()
            .filter(|(_, r)| r.sub_proof_index == index)
            .map(|(referent, _)| referent)
        {
            let known = request
                .requested_attributes
                .get(referent)
                .is_some_and(|info| {
                    info.attribute_names()
                        .iter()
                        .all(|n| definition.attribute_index(n).is_some())
                });
            if !known {
                return reject(index, "unrevealed attribute is not in the credential");
            }
        }

        let mut predicates = Vec::with_capacity(sub_proof.predicates.len());
        for predicate in &sub_proof.predicates {
            let Some(message_index) = definition.attribute_index(&predicate.attr_name) else {
                return reject(index, "predicate attribute is not in the credential");
            };
            if revealed.contains_key(&message_index) {
                return reject(index, "predicate attribute is revealed");
            }
            let (negate, offset) = predicate.p_type.statement(predicate.p_value);
            predicates.push(PreparedPredicate {
                index: message_index,
                statement: BoundStatement {
                    negate,
                    offset: scalar_from_i64(offset),
                },
                proof: predicate,
            });
        }
        for referent in proof
            .predicates
            .iter()
            .filter(|(_, r)| r.sub_proof_index == index)
            .map(|(referent, _)| referent)
        {
            let Some(info) = request.requested_predicates.get(referent) else {
                return Err(ProofError::UnknownReferent(referent.clone()));
            };
            let attr_name = normalize_attribute_name(&info.name);
            let answered = sub_proof.predicates.iter().any(|p| {
                p.attr_name == attr_name && p.p_type == info.p_type && p.p_value == info.p_value
            });
            if !answered {
                return reject(index, "requested predicate is not proven");
            }
        }

        let ctx = RestrictionContext {
            schema_id: &identifier.schema_id,
            schema,
            cred_def_id: &identifier.cred_def_id,
            definition,
            revealed: &revealed_raw,
        };
        if !referents
            .iter()
            .all(|r| restrictions_satisfied(request.restrictions_for(r), &ctx))
        {
            return reject(index, "restrictions not satisfied");
        }

        let interval = request.interval_for_all(referents.iter().copied());
        let revocation = match (interval, &identifier.rev_reg_id) {
            (Some(interval), Some(rev_reg_id)) => {
                let (Some(timestamp), Some(_)) = (identifier.timestamp, &sub_proof.non_revocation)
                else {
                    return reject(index, "non-revocation proof missing");
                };
                let from = interval
                    .from
                    .map(|from| {
                        self.overrides
                            .get(&(rev_reg_id.clone(), from))
                            .copied()
                            .unwrap_or(from)
                    });
                let effective = NonRevokedInterval::new(from, interval.to);
                if !effective.contains(timestamp) {
                    return reject(index, "status list timestamp outside the requested interval");
                }
                let registry = self.rev_reg_defs.get(rev_reg_id).ok_or_else(|| {
                    ProofError::MissingRegistryDefinition(rev_reg_id.to_string())
                })?;
                if registry.cred_def_id != identifier.cred_def_id {
                    return reject(index, "registry belongs to another credential definition");
                }
                let status_list = self
                    .authoritative_status_list(rev_reg_id, &effective)
                    .ok_or_else(|| ProofError::MissingStatusList {
                        rev_reg_id: rev_reg_id.to_string(),
                        timestamp,
                    })?;
                if status_list.timestamp != timestamp {
                    tracing::debug!(
                        rev_reg_id = %rev_reg_id,
                        presented = timestamp,
                        latest = status_list.timestamp,
                        "presentation proves against a superseded status list"
                    );
                    return reject(index, "status list superseded inside the requested interval");
                }
                let Some(message_index) = definition.revocation_index() else {
                    return reject(index, "definition does not support revocation");
                };
                Some(PreparedRevocation {
                    status_list,
                    registry,
                    index: message_index,
                })
            }
            (Some(_), None) if definition.support_revocation => {
                return reject(index, "revocable credential presented without registry");
            }
            _ => {
                if sub_proof.non_revocation.is_some() {
                    return reject(index, "unexpected non-revocation proof");
                }
                None
            }
        };

        Ok(Some(Prepared {
            sub_proof,
            definition,
            revealed,
            predicates,
            revocation,
        }))
    }
}

/// Verify one presentation; see [`PresentationVerifier::verify`].
pub fn verify_presentation(
    presentation: &Presentation,
    request: &PresentationRequest,
    schemas: &BTreeMap<SchemaId, Schema>,
    cred_defs: &BTreeMap<CredentialDefinitionId, CredentialDefinition>,
    rev_reg_defs: &BTreeMap<RevocationRegistryDefinitionId, RevocationRegistryDefinition>,
    status_lists: &[RevocationStatusList],
    overrides: &[NonRevokedIntervalOverride],
) -> Result<bool, ProofError> {
    PresentationVerifier::new(schemas, cred_defs, rev_reg_defs, status_lists)
        .with_overrides(overrides)
        .verify(presentation, request)
}
