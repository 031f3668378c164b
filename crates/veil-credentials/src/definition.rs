//! Issuer signing material for a schema.
//!
//! Message layout of every credential signed under a definition:
//! index 0 is the holder's link secret, indices `1..=n` carry the schema
//! attributes in declaration order, and index `n + 1` carries the
//! revocation element when the definition supports revocation.

use serde::{Deserialize, Serialize};

use veil_core::{normalize_attribute_name, IssuerId, SchemaId, SignatureType};
use veil_crypto::{KeyCorrectnessProof, PublicKey, SecretKey, SignatureParams};

use crate::error::CredentialError;
use crate::schema::Schema;

/// Message index of the link secret.
pub const LINK_SECRET_INDEX: usize = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinitionConfig {
    #[serde(default)]
    pub support_revocation: bool,
}

impl CredentialDefinitionConfig {
    pub fn new(support_revocation: bool) -> Self {
        Self { support_revocation }
    }
}

/// Public half of a credential definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    pub schema_id: SchemaId,
    pub issuer_id: IssuerId,
    pub signature_type: SignatureType,
    pub tag: String,
    /// Normalised attribute names in message order.
    pub attr_names: Vec<String>,
    pub support_revocation: bool,
    pub params: SignatureParams,
    pub public_key: PublicKey,
}

/// Signing key. Never serialised.
#[derive(Debug)]
pub struct CredentialDefinitionPrivate {
    pub(crate) secret_key: SecretKey,
}

fn params_label(issuer_id: &IssuerId, schema_id: &SchemaId, tag: &str) -> String {
    format!("{}|{}|{}", issuer_id, schema_id, tag)
}

impl CredentialDefinition {
    /// Generate signing keys for `schema`, along with a proof that the
    /// public key was honestly derived.
    pub fn create(
        schema_id: SchemaId,
        schema: &Schema,
        issuer_id: IssuerId,
        tag: &str,
        signature_type: &str,
        config: CredentialDefinitionConfig,
    ) -> Result<(Self, CredentialDefinitionPrivate, KeyCorrectnessProof), CredentialError> {
        let signature_type = signature_type
            .parse::<SignatureType>()
            .map_err(|e| CredentialError::KeyGenerationError(e.to_string()))?;

        let attr_names = schema.normalized_attr_names();
        let message_count = 1 + attr_names.len() + usize::from(config.support_revocation);
        let params = SignatureParams::generate(
            &params_label(&issuer_id, &schema_id, tag),
            message_count,
        )?;

        let mut rng = rand::thread_rng();
        let secret_key = SecretKey::generate(&mut rng);
        let public_key = PublicKey::from_secret(&secret_key, &params);

        let definition = Self {
            schema_id,
            issuer_id,
            signature_type,
            tag: tag.to_string(),
            attr_names,
            support_revocation: config.support_revocation,
            params,
            public_key,
        };
        let proof = KeyCorrectnessProof::create(
            &mut rng,
            &secret_key,
            &definition.public_key,
            &definition.params,
            &definition.proof_context(),
        )?;

        tracing::info!(
            schema_id = %definition.schema_id,
            issuer_id = %definition.issuer_id,
            tag = %definition.tag,
            attributes = definition.attr_names.len(),
            revocable = definition.support_revocation,
            "credential definition created"
        );

        Ok((definition, CredentialDefinitionPrivate { secret_key }, proof))
    }

    fn expected_message_count(&self) -> usize {
        1 + self.attr_names.len() + usize::from(self.support_revocation)
    }

    fn proof_context(&self) -> Vec<u8> {
        let mut context = Vec::new();
        for name in &self.attr_names {
            context.extend_from_slice(name.as_bytes());
            context.push(0);
        }
        context.push(u8::from(self.support_revocation));
        context
    }

    pub fn message_count(&self) -> usize {
        self.params.message_count()
    }

    /// Message index of an attribute, by any spelling of its name.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        let normalized = normalize_attribute_name(name);
        self.attr_names
            .iter()
            .position(|a| *a == normalized)
            .map(|position| position + 1)
    }

    /// Message index of the revocation element, if the definition has one.
    pub fn revocation_index(&self) -> Option<usize> {
        self.support_revocation.then(|| self.attr_names.len() + 1)
    }

    /// Check the key proof against the definition's own layout.
    pub fn verify_key_proof(&self, proof: &KeyCorrectnessProof) -> bool {
        if self.message_count() != self.expected_message_count() {
            return false;
        }
        if self.params.label != params_label(&self.issuer_id, &self.schema_id, &self.tag) {
            return false;
        }
        proof.verify(&self.public_key, &self.params, &self.proof_context())
    }
}

/// Audit a published definition: its generators must be the public
/// derivation of its label, its layout must match `schema`, and `proof`
/// must show knowledge of the signing key.
pub fn verify_correctness(
    definition: &CredentialDefinition,
    schema: &Schema,
    proof: &KeyCorrectnessProof,
) -> bool {
    if definition.attr_names != schema.normalized_attr_names() {
        tracing::warn!(schema_id = %definition.schema_id, "definition layout does not match schema");
        return false;
    }
    let valid = definition.verify_key_proof(proof);
    if !valid {
        tracing::warn!(schema_id = %definition.schema_id, "key correctness proof rejected");
    }
    valid
}
