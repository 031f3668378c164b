use std::collections::{BTreeMap, BTreeSet};

use veil_core::{normalize_attribute_name, CredentialDefinitionId, SchemaId};
use veil_credentials::{
    Credential, CredentialDefinition, CredentialRevocationInfo, CredentialRevocationState,
    LinkSecret, Schema, LINK_SECRET_INDEX,
};
use veil_crypto::{
    random_scalar, scalar_from_i64, AccumulatorParams, BoundGenerators, BoundProofProtocol,
    BoundStatement, MembershipProofProtocol, MembershipProvingKey, MembershipStatement,
    PokSignatureProtocol, Scalar, Transcript,
};

use crate::error::ProofError;
use crate::presentation::{
    append_predicate, Identifier, Presentation, PredicateProof, RequestedProof,
    RevealedAttribute, RevealedAttributeGroup, SubProof, SubProofReference, TRANSCRIPT_LABEL,
};
use crate::request::{PredicateInfo, PresentationRequest};

/// A credential offered for a presentation, with the revocation state to
/// prove non-revocation from.
#[derive(Debug, Clone, Copy)]
pub struct CredentialEntry<'a> {
    pub credential: &'a Credential,
    /// Timestamp of the status list the revocation state belongs to.
    pub timestamp: Option<u64>,
    /// Falls back to the witness stored on the credential when absent.
    pub revocation_state: Option<&'a CredentialRevocationState>,
}

impl<'a> CredentialEntry<'a> {
    pub fn new(credential: &'a Credential) -> Self {
        Self {
            credential,
            timestamp: None,
            revocation_state: None,
        }
    }

    pub fn with_revocation_state(
        mut self,
        timestamp: u64,
        state: &'a CredentialRevocationState,
    ) -> Self {
        self.timestamp = Some(timestamp);
        self.revocation_state = Some(state);
        self
    }
}

/// Which entry answers which referent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialProve {
    pub entry_idx: usize,
    pub referent: String,
    pub is_predicate: bool,
    pub reveal: bool,
}

impl CredentialProve {
    pub fn attribute(entry_idx: usize, referent: &str, reveal: bool) -> Self {
        Self {
            entry_idx,
            referent: referent.to_string(),
            is_predicate: false,
            reveal,
        }
    }

    pub fn predicate(entry_idx: usize, referent: &str) -> Self {
        Self {
            entry_idx,
            referent: referent.to_string(),
            is_predicate: true,
            reveal: false,
        }
    }
}

struct PendingPredicate {
    attr_name: String,
    info: PredicateInfo,
    protocol: BoundProofProtocol,
}

struct PendingSubProof {
    signature: PokSignatureProtocol,
    predicates: Vec<PendingPredicate>,
    membership: Option<MembershipProofProtocol>,
}

struct Revocation<'c> {
    info: &'c CredentialRevocationInfo,
    state: &'c CredentialRevocationState,
    index: usize,
    blinding: Scalar,
}

/// Build a presentation answering `request` from `credentials`.
///
/// All sub-proofs share one challenge, which also covers the request nonce
/// and every sub-proof identifier. The link secret gets one blinding across
/// credentials so the verifier can tell they belong to the same holder.
pub fn create_presentation(
    request: &PresentationRequest,
    credentials: &[CredentialEntry<'_>],
    credentials_prove: &[CredentialProve],
    link_secret: &LinkSecret,
    schemas: &BTreeMap<SchemaId, Schema>,
    cred_defs: &BTreeMap<CredentialDefinitionId, CredentialDefinition>,
) -> Result<Presentation, ProofError> {
    request.validate()?;

    let mut by_entry: BTreeMap<usize, Vec<&CredentialProve>> = BTreeMap::new();
    let mut answered = BTreeSet::new();
    for prove in credentials_prove {
        let known = if prove.is_predicate {
            request.requested_predicates.contains_key(&prove.referent)
        } else {
            request.requested_attributes.contains_key(&prove.referent)
        };
        if !known {
            return Err(ProofError::UnknownReferent(prove.referent.clone()));
        }
        if !answered.insert(prove.referent.as_str()) {
            return Err(ProofError::InvalidProofData(format!(
                "referent {} answered twice",
                prove.referent
            )));
        }
        if prove.entry_idx >= credentials.len() {
            return Err(ProofError::InvalidEntry(prove.entry_idx));
        }
        by_entry.entry(prove.entry_idx).or_default().push(prove);
    }
    if let Some(missing) = request.referents().into_iter().find(|r| !answered.contains(r)) {
        return Err(ProofError::MissingReferent(missing.to_string()));
    }

    let mut rng = rand::thread_rng();
    let link_blinding = random_scalar(&mut rng);
    let bound_gens = BoundGenerators::generate();
    let accumulator_params = AccumulatorParams::generate();
    let proving_key = MembershipProvingKey::generate();

    let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
    transcript.append_message(b"nonce", request.nonce.as_bytes());

    let mut pending = Vec::with_capacity(by_entry.len());
    let mut identifiers = Vec::with_capacity(by_entry.len());
    let mut requested_proof = RequestedProof::default();

    for (sub_proof_index, (entry_idx, proves)) in by_entry.iter().enumerate() {
        let entry = &credentials[*entry_idx];
        let credential = entry.credential;
        let definition = cred_defs.get(&credential.cred_def_id).ok_or_else(|| {
            ProofError::MissingCredentialDefinition(credential.cred_def_id.to_string())
        })?;
        if !schemas.contains_key(&credential.schema_id) {
            return Err(ProofError::MissingSchema(credential.schema_id.to_string()));
        }
        let messages = credential.messages(link_secret, definition)?;

        let mut revealed = BTreeSet::new();
        let mut predicates: Vec<(&PredicateInfo, usize)> = Vec::new();
        for prove in proves {
            let referent = prove.referent.clone();
            if prove.is_predicate {
                let info = request
                    .requested_predicates
                    .get(&prove.referent)
                    .ok_or_else(|| ProofError::UnknownReferent(referent.clone()))?;
                let index = definition
                    .attribute_index(&info.name)
                    .ok_or_else(|| ProofError::AttributeNotInCredential(info.name.clone()))?;
                predicates.push((info, index));
                requested_proof
                    .predicates
                    .insert(referent, SubProofReference { sub_proof_index });
                continue;
            }

            let info = request
                .requested_attributes
                .get(&prove.referent)
                .ok_or_else(|| ProofError::UnknownReferent(referent.clone()))?;
            let mut values = BTreeMap::new();
            for name in info.attribute_names() {
                let index = definition
                    .attribute_index(name)
                    .ok_or_else(|| ProofError::AttributeNotInCredential(name.to_string()))?;
                let value = credential
                    .attribute(name)
                    .ok_or_else(|| ProofError::AttributeNotInCredential(name.to_string()))?;
                if prove.reveal {
                    revealed.insert(index);
                    values.insert(name.to_string(), value.clone());
                }
            }

            if !prove.reveal {
                requested_proof
                    .unrevealed_attrs
                    .insert(referent, SubProofReference { sub_proof_index });
            } else if info.is_group() {
                requested_proof.revealed_attr_groups.insert(
                    referent,
                    RevealedAttributeGroup {
                        sub_proof_index,
                        values,
                    },
                );
            } else if let Some(value) = values.into_values().next() {
                requested_proof.revealed_attrs.insert(
                    referent,
                    RevealedAttribute {
                        sub_proof_index,
                        raw: value.raw,
                        encoded: value.encoded,
                    },
                );
            }
        }

        if let Some((info, _)) = predicates.iter().find(|(_, i)| revealed.contains(i)) {
            return Err(ProofError::RevealedPredicateAttribute(info.name.clone()));
        }

        let mut blindings = BTreeMap::new();
        blindings.insert(LINK_SECRET_INDEX, link_blinding);
        for (_, index) in &predicates {
            blindings
                .entry(*index)
                .or_insert_with(|| random_scalar(&mut rng));
        }

        let interval = request.interval_for_all(proves.iter().map(|p| p.referent.as_str()));
        let revocation = match (&credential.revocation, interval) {
            (Some(info), Some(interval)) => {
                let state = entry
                    .revocation_state
                    .or(credential.witness.as_ref())
                    .ok_or_else(|| {
                        ProofError::InsufficientWitness(format!(
                            "entry {} has no revocation state",
                            entry_idx
                        ))
                    })?;
                if interval.to.is_some_and(|to| state.timestamp > to) {
                    return Err(ProofError::InsufficientWitness(format!(
                        "revocation state at {} is newer than the requested interval",
                        state.timestamp
                    )));
                }
                if entry.timestamp.is_some_and(|ts| ts != state.timestamp) {
                    return Err(ProofError::InsufficientWitness(format!(
                        "revocation state is for {}, entry claims {:?}",
                        state.timestamp, entry.timestamp
                    )));
                }
                let index = definition.revocation_index().ok_or_else(|| {
                    ProofError::InvalidProofData(format!(
                        "definition {} has no revocation slot",
                        credential.cred_def_id
                    ))
                })?;
                let blinding = random_scalar(&mut rng);
                blindings.insert(index, blinding);
                Some(Revocation {
                    info,
                    state,
                    index,
                    blinding,
                })
            }
            _ => None,
        };

        let identifier = Identifier {
            schema_id: credential.schema_id.clone(),
            cred_def_id: credential.cred_def_id.clone(),
            rev_reg_id: revocation.as_ref().map(|r| r.info.rev_reg_id.clone()),
            timestamp: revocation.as_ref().map(|r| r.state.timestamp),
        };
        identifier.append_to(&mut transcript);

        let revealed_messages: BTreeMap<usize, Scalar> =
            revealed.iter().map(|i| (*i, messages[*i])).collect();
        let signature = PokSignatureProtocol::init(
            &mut rng,
            &credential.signature,
            &definition.params,
            &messages,
            &revealed,
            blindings.clone(),
        )?;
        signature.challenge_contribution(&revealed_messages, &definition.params, &mut transcript)?;

        let mut pending_predicates = Vec::with_capacity(predicates.len());
        for (info, index) in predicates {
            let value = credential
                .attribute(&info.name)
                .and_then(|v| v.as_i32())
                .ok_or_else(|| ProofError::PredicateNotNumeric(info.name.clone()))?;
            let delta = info
                .p_type
                .delta(value, info.p_value)
                .ok_or_else(|| ProofError::PredicateNotSatisfied(info.name.clone()))?;
            let (negate, offset) = info.p_type.statement(info.p_value);
            let statement = BoundStatement {
                negate,
                offset: scalar_from_i64(offset),
            };
            let blinding = blindings.get(&index).copied().ok_or_else(|| {
                ProofError::InvalidProofData(format!("no blinding for message {}", index))
            })?;
            let protocol = BoundProofProtocol::init(
                &mut rng,
                messages[index],
                blinding,
                delta,
                statement,
                &bound_gens,
            )?;
            append_predicate(&mut transcript, index, info.p_type, info.p_value);
            protocol.challenge_contribution(&bound_gens, &mut transcript)?;
            pending_predicates.push(PendingPredicate {
                attr_name: normalize_attribute_name(&info.name),
                info: info.clone(),
                protocol,
            });
        }

        let membership = match &revocation {
            Some(r) => {
                let statement = MembershipStatement {
                    accumulator: &r.state.accumulator,
                    public_key: &r.state.accum_key,
                    params: &accumulator_params,
                    proving_key: &proving_key,
                };
                let protocol = MembershipProofProtocol::init(
                    &mut rng,
                    messages[r.index],
                    Some(r.blinding),
                    &r.state.witness,
                    &statement,
                );
                protocol.challenge_contribution(&statement, &mut transcript)?;
                Some(protocol)
            }
            None => None,
        };

        pending.push(PendingSubProof {
            signature,
            predicates: pending_predicates,
            membership,
        });
        identifiers.push(identifier);
    }

    let challenge = transcript.challenge(b"challenge");
    let sub_proofs = pending
        .into_iter()
        .map(|p| -> Result<SubProof, ProofError> {
            Ok(SubProof {
                signature_proof: p.signature.gen_proof(&challenge)?,
                predicates: p
                    .predicates
                    .into_iter()
                    .map(|pp| PredicateProof {
                        attr_name: pp.attr_name,
                        p_type: pp.info.p_type,
                        p_value: pp.info.p_value,
                        proof: pp.protocol.gen_proof(&challenge),
                    })
                    .collect(),
                non_revocation: p
                    .membership
                    .map(|m| m.gen_proof(&challenge))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        request = %request.name,
        sub_proofs = sub_proofs.len(),
        revealed = requested_proof.revealed_attrs.len() + requested_proof.revealed_attr_groups.len(),
        predicates = requested_proof.predicates.len(),
        "presentation built"
    );

    Ok(Presentation {
        nonce: request.nonce.clone(),
        sub_proofs,
        identifiers,
        requested_proof,
    })
}
