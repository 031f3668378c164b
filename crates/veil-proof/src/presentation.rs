use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use veil_core::{
    AttributeValue, CredentialDefinitionId, Nonce, RevocationRegistryDefinitionId, SchemaId,
};
use veil_crypto::{BoundProof, MembershipProof, PokSignatureProof, Transcript};

use crate::error::ProofError;
use crate::request::PredicateType;

pub(crate) const TRANSCRIPT_LABEL: &[u8] = b"veil/presentation/v1";

/// Which credential a sub-proof is about, and the status list its
/// non-revocation proof was made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryDefinitionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Identifier {
    pub(crate) fn append_to(&self, transcript: &mut Transcript) {
        transcript.append_message(b"schema_id", self.schema_id.as_str().as_bytes());
        transcript.append_message(b"cred_def_id", self.cred_def_id.as_str().as_bytes());
        match &self.rev_reg_id {
            Some(id) => transcript.append_message(b"rev_reg_id", id.as_str().as_bytes()),
            None => transcript.append_message(b"rev_reg_id", b""),
        }
        transcript.append_u64(b"has_timestamp", self.timestamp.is_some() as u64);
        transcript.append_u64(b"timestamp", self.timestamp.unwrap_or_default());
    }
}

pub(crate) fn append_predicate(
    transcript: &mut Transcript,
    index: usize,
    p_type: PredicateType,
    p_value: i32,
) {
    transcript.append_u64(b"predicate_index", index as u64);
    transcript.append_message(b"p_type", p_type.as_str().as_bytes());
    transcript.append_message(b"p_value", &p_value.to_le_bytes());
}

/// Range proof that a hidden attribute satisfies a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateProof {
    /// Normalised attribute name.
    pub attr_name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    pub proof: BoundProof,
}

/// Everything proven about one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProof {
    pub signature_proof: PokSignatureProof,
    #[serde(default)]
    pub predicates: Vec<PredicateProof>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revocation: Option<MembershipProof>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttribute {
    pub sub_proof_index: usize,
    pub raw: String,
    pub encoded: String,
}

impl RevealedAttribute {
    pub fn value(&self) -> AttributeValue {
        AttributeValue {
            raw: self.raw.clone(),
            encoded: self.encoded.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttributeGroup {
    pub sub_proof_index: usize,
    /// Values keyed by the names used in the request.
    pub values: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofReference {
    pub sub_proof_index: usize,
}

/// How each requested referent was answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttribute>,
    #[serde(default)]
    pub revealed_attr_groups: BTreeMap<String, RevealedAttributeGroup>,
    #[serde(default)]
    pub unrevealed_attrs: BTreeMap<String, SubProofReference>,
    #[serde(default)]
    pub predicates: BTreeMap<String, SubProofReference>,
}

impl RequestedProof {
    /// Sub-proof answering `referent`, if it was answered at all.
    pub fn sub_proof_index(&self, referent: &str) -> Option<usize> {
        self.revealed_attrs
            .get(referent)
            .map(|a| a.sub_proof_index)
            .or_else(|| self.revealed_attr_groups.get(referent).map(|g| g.sub_proof_index))
            .or_else(|| self.unrevealed_attrs.get(referent).map(|r| r.sub_proof_index))
            .or_else(|| self.predicates.get(referent).map(|r| r.sub_proof_index))
    }

    pub fn referents(&self) -> impl Iterator<Item = &String> {
        self.revealed_attrs
            .keys()
            .chain(self.revealed_attr_groups.keys())
            .chain(self.unrevealed_attrs.keys())
            .chain(self.predicates.keys())
    }
}

/// A holder's answer to a presentation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    /// Nonce of the request this answers.
    pub nonce: Nonce,
    pub sub_proofs: Vec<SubProof>,
    pub identifiers: Vec<Identifier>,
    pub requested_proof: RequestedProof,
}

impl Presentation {
    pub fn to_json(&self) -> Result<String, ProofError> {
        serde_json::to_string(self).map_err(|e| ProofError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ProofError> {
        serde_json::from_str(json).map_err(|e| ProofError::Serialization(e.to_string()))
    }

    /// Raw value of a revealed single attribute.
    pub fn revealed(&self, referent: &str) -> Option<&str> {
        self.requested_proof
            .revealed_attrs
            .get(referent)
            .map(|a| a.raw.as_str())
    }
}
