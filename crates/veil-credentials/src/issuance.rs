//! Blind issuance: offer, blinded request, signing, holder-side processing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use uuid::Uuid;
use zeroize::Zeroize;

use veil_core::{
    normalize_attribute_name, AttributeValue, CredentialDefinitionId, IssuanceEvent,
    IssuanceState, IssuanceStateMachine, Nonce, RevocationRegistryDefinitionId, SchemaId,
};
use veil_crypto::{
    random_scalar, scalar_from_encoded, ArkObjectBytes, BlindedSecretProof, G1Affine,
    KeyCorrectnessProof, Scalar, Signature,
};

use crate::definition::{CredentialDefinition, CredentialDefinitionPrivate, LINK_SECRET_INDEX};
use crate::error::CredentialError;
use crate::link_secret::LinkSecret;
use crate::revocation::{CredentialRevocationState, RevocationConfig, RevocationRegistryDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOffer {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub key_correctness_proof: KeyCorrectnessProof,
    pub nonce: Nonce,
    pub revocable: bool,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub cred_def_id: CredentialDefinitionId,
    pub entropy: String,
    #[serde_as(as = "ArkObjectBytes")]
    pub blinded_link_secret: G1Affine,
    pub blinded_link_secret_proof: BlindedSecretProof,
}

/// Holder-private state kept between request and processing.
pub struct CredentialRequestMetadata {
    link_secret_blinding: Scalar,
    nonce: Nonce,
    link_secret_name: String,
}

impl CredentialRequestMetadata {
    pub fn link_secret_name(&self) -> &str {
        &self.link_secret_name
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }
}

impl Drop for CredentialRequestMetadata {
    fn drop(&mut self) {
        self.link_secret_blinding.zeroize();
    }
}

impl fmt::Debug for CredentialRequestMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequestMetadata")
            .field("nonce", &self.nonce)
            .field("link_secret_name", &self.link_secret_name)
            .finish_non_exhaustive()
    }
}

/// Attribute values keyed by normalised name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialValues(pub BTreeMap<String, AttributeValue>);

impl CredentialValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, encoding it from its raw form.
    pub fn add_raw(&mut self, name: &str, raw: &str) -> &mut Self {
        self.0
            .insert(normalize_attribute_name(name), AttributeValue::new(raw));
        self
    }

    /// Add a value with a caller-supplied encoding.
    pub fn add_encoded(&mut self, name: &str, raw: &str, encoded: &str) -> &mut Self {
        self.0.insert(
            normalize_attribute_name(name),
            AttributeValue {
                raw: raw.to_string(),
                encoded: encoded.to_string(),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(&normalize_attribute_name(name))
    }

    fn check(&self, definition: &CredentialDefinition) -> Result<(), CredentialError> {
        let expected: BTreeSet<&String> = definition.attr_names.iter().collect();
        let actual: BTreeSet<&String> = self.0.keys().collect();
        if expected != actual {
            return Err(CredentialError::AttributeMismatch(format!(
                "expected {:?}, got {:?}",
                expected, actual
            )));
        }
        if let Some((name, _)) = self.0.iter().find(|(_, v)| !v.is_consistent()) {
            return Err(CredentialError::InconsistentAttribute(name.clone()));
        }
        Ok(())
    }

    /// Attribute messages keyed by message index.
    fn messages(
        &self,
        definition: &CredentialDefinition,
    ) -> Result<BTreeMap<usize, Scalar>, CredentialError> {
        let mut messages = BTreeMap::new();
        for (position, name) in definition.attr_names.iter().enumerate() {
            let value = self
                .0
                .get(name)
                .ok_or_else(|| CredentialError::AttributeMismatch(format!("missing {}", name)))?;
            messages.insert(position + 1, scalar_from_encoded(&value.encoded)?);
        }
        Ok(messages)
    }
}

/// Registry binding of a revocable credential as issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationHandle {
    pub rev_reg_id: RevocationRegistryDefinitionId,
    pub index: u32,
}

/// Issuer output, still bound to the holder's blinding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredential {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub values: CredentialValues,
    pub signature: Signature,
    pub revocation: Option<RevocationHandle>,
    pub witness: Option<CredentialRevocationState>,
}

/// Holder-side registry binding, with the accumulator element the
/// signature covers.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRevocationInfo {
    pub rev_reg_id: RevocationRegistryDefinitionId,
    pub index: u32,
    #[serde_as(as = "ArkObjectBytes")]
    pub element: Scalar,
}

/// A processed credential, ready to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub values: CredentialValues,
    pub signature: Signature,
    pub revocation: Option<CredentialRevocationInfo>,
    pub witness: Option<CredentialRevocationState>,
}

impl Credential {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn is_revocable(&self) -> bool {
        self.revocation.is_some()
    }

    /// Full signed message vector in definition layout.
    pub fn messages(
        &self,
        link_secret: &LinkSecret,
        definition: &CredentialDefinition,
    ) -> Result<Vec<Scalar>, CredentialError> {
        let mut indexed = self.values.messages(definition)?;
        indexed.insert(LINK_SECRET_INDEX, *link_secret.value());
        match (definition.revocation_index(), &self.revocation) {
            (Some(index), Some(info)) => {
                indexed.insert(index, info.element);
            }
            (None, None) => {}
            _ => {
                return Err(CredentialError::InvalidConfiguration(
                    "credential and definition disagree on revocation".into(),
                ))
            }
        }
        Ok(indexed.into_values().collect())
    }
}

fn request_context(nonce: &Nonce, entropy: &str, cred_def_id: &CredentialDefinitionId) -> Vec<u8> {
    let mut context = Vec::new();
    for part in [nonce.as_bytes(), entropy.as_bytes(), cred_def_id.as_str().as_bytes()] {
        context.extend_from_slice(&(part.len() as u64).to_le_bytes());
        context.extend_from_slice(part);
    }
    context
}

pub fn create_offer(
    schema_id: SchemaId,
    cred_def_id: CredentialDefinitionId,
    definition: &CredentialDefinition,
    correctness_proof: &KeyCorrectnessProof,
    revocable: bool,
) -> Result<CredentialOffer, CredentialError> {
    if revocable && !definition.support_revocation {
        return Err(CredentialError::InvalidConfiguration(format!(
            "credential definition {} does not support revocation",
            cred_def_id
        )));
    }
    if !revocable && definition.support_revocation {
        return Err(CredentialError::InvalidConfiguration(format!(
            "credential definition {} only issues revocable credentials",
            cred_def_id
        )));
    }
    if definition.schema_id != schema_id {
        return Err(CredentialError::InvalidConfiguration(format!(
            "credential definition {} is not for schema {}",
            cred_def_id, schema_id
        )));
    }
    let offer = CredentialOffer {
        schema_id,
        cred_def_id,
        key_correctness_proof: correctness_proof.clone(),
        nonce: Nonce::new(),
        revocable,
    };
    tracing::debug!(cred_def_id = %offer.cred_def_id, revocable, "credential offer created");
    Ok(offer)
}

/// Blind the link secret for `offer`. A missing `entropy` is replaced by a
/// fresh UUIDv7.
pub fn create_request(
    entropy: Option<&str>,
    definition: &CredentialDefinition,
    link_secret: &LinkSecret,
    link_secret_id: &str,
    offer: &CredentialOffer,
) -> Result<(CredentialRequest, CredentialRequestMetadata), CredentialError> {
    if !definition.verify_key_proof(&offer.key_correctness_proof) {
        tracing::warn!(cred_def_id = %offer.cred_def_id, "offer carries an invalid key correctness proof");
        return Err(CredentialError::InvalidCorrectnessProof);
    }
    let entropy = entropy
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let mut rng = rand::thread_rng();
    let blinding = random_scalar(&mut rng);
    let context = request_context(&offer.nonce, &entropy, &offer.cred_def_id);
    let (blinded_link_secret, proof) = BlindedSecretProof::create(
        &mut rng,
        &definition.params,
        link_secret.value(),
        &blinding,
        &context,
    )?;

    let request = CredentialRequest {
        cred_def_id: offer.cred_def_id.clone(),
        entropy,
        blinded_link_secret,
        blinded_link_secret_proof: proof,
    };
    let metadata = CredentialRequestMetadata {
        link_secret_blinding: blinding,
        nonce: offer.nonce.clone(),
        link_secret_name: link_secret_id.to_string(),
    };
    Ok((request, metadata))
}

/// Sign `values` for the holder behind `request`. A revocable offer needs a
/// registry binding; its witness is computed for the snapshot in `revocation`.
/// The binding's index is committed only when a credential is produced.
pub fn create_credential(
    definition: &CredentialDefinition,
    private: &CredentialDefinitionPrivate,
    offer: &CredentialOffer,
    request: &CredentialRequest,
    values: CredentialValues,
    revocation: Option<RevocationConfig<'_>>,
) -> Result<IssuedCredential, CredentialError> {
    if request.cred_def_id != offer.cred_def_id {
        return Err(CredentialError::InvalidConfiguration(format!(
            "request for {} does not answer offer for {}",
            request.cred_def_id, offer.cred_def_id
        )));
    }
    let context = request_context(&offer.nonce, &request.entropy, &offer.cred_def_id);
    if !request
        .blinded_link_secret_proof
        .verify(&definition.params, &request.blinded_link_secret, &context)
    {
        tracing::warn!(cred_def_id = %offer.cred_def_id, "blinded link secret proof rejected");
        return Err(CredentialError::InvalidBlindedSecretProof);
    }
    values.check(definition)?;
    let mut messages = values.messages(definition)?;

    let (handle, witness) = match (offer.revocable, revocation.as_ref()) {
        (false, None) => (None, None),
        (false, Some(_)) => {
            return Err(CredentialError::InvalidConfiguration(
                "registry binding supplied for a non-revocable offer".into(),
            ))
        }
        (true, None) => {
            return Err(CredentialError::InvalidConfiguration(
                "revocable offer requires a registry binding".into(),
            ))
        }
        (true, Some(config)) => {
            let registry = config.context.definition();
            if registry.cred_def_id != offer.cred_def_id {
                return Err(CredentialError::InvalidConfiguration(format!(
                    "registry {} belongs to {}",
                    config.context.id(),
                    registry.cred_def_id
                )));
            }
            if config.status_list.is_revoked(config.index) {
                return Err(CredentialError::IndexNotActive(config.index));
            }
            let revocation_index = definition.revocation_index().ok_or_else(|| {
                CredentialError::InvalidConfiguration("definition lacks a revocation slot".into())
            })?;
            let element = registry.element(config.index)?;
            messages.insert(revocation_index, element);
            let witness = config
                .status_list
                .accum
                .witness_with_secret(&config.context.private().secret_key, &element)?;
            let state = CredentialRevocationState {
                witness,
                accumulator: config.status_list.accum,
                accum_key: registry.value.accum_key.clone(),
                timestamp: config.status_list.timestamp,
            };
            let handle = RevocationHandle {
                rev_reg_id: config.context.id().clone(),
                index: config.index,
            };
            (Some(handle), Some(state))
        }
    };

    let signature = Signature::new_with_committed_messages(
        &mut rand::thread_rng(),
        &request.blinded_link_secret,
        &messages,
        &private.secret_key,
        &definition.params,
    )?;
    if let Some(config) = revocation {
        config.commit();
    }

    tracing::info!(
        cred_def_id = %offer.cred_def_id,
        rev_reg_id = ?handle.as_ref().map(|h| h.rev_reg_id.to_string()),
        index = ?handle.as_ref().map(|h| h.index),
        "credential issued"
    );

    Ok(IssuedCredential {
        schema_id: offer.schema_id.clone(),
        cred_def_id: offer.cred_def_id.clone(),
        values,
        signature,
        revocation: handle,
        witness,
    })
}

/// Unblind and check an issued credential.
pub fn process_credential(
    issued: IssuedCredential,
    link_secret: &LinkSecret,
    metadata: &CredentialRequestMetadata,
    definition: &CredentialDefinition,
    registry: Option<&RevocationRegistryDefinition>,
) -> Result<Credential, CredentialError> {
    issued.values.check(definition)?;

    let revocation = match &issued.revocation {
        None => None,
        Some(handle) => {
            let registry = registry.ok_or_else(|| {
                CredentialError::MissingRegistryDefinition(handle.rev_reg_id.to_string())
            })?;
            if registry.cred_def_id != issued.cred_def_id {
                return Err(CredentialError::InvalidConfiguration(format!(
                    "registry {} does not belong to {}",
                    handle.rev_reg_id, issued.cred_def_id
                )));
            }
            Some((
                CredentialRevocationInfo {
                    rev_reg_id: handle.rev_reg_id.clone(),
                    index: handle.index,
                    element: registry.element(handle.index)?,
                },
                registry,
            ))
        }
    };

    let credential = Credential {
        schema_id: issued.schema_id,
        cred_def_id: issued.cred_def_id,
        values: issued.values,
        signature: issued.signature.unblind(&metadata.link_secret_blinding),
        revocation: revocation.as_ref().map(|(info, _)| info.clone()),
        witness: issued.witness,
    };

    let messages = credential.messages(link_secret, definition)?;
    credential
        .signature
        .verify(&messages, &definition.public_key, &definition.params)
        .map_err(|_| CredentialError::SignatureVerification)?;

    match (&credential.witness, &revocation) {
        (Some(state), Some((info, registry))) => {
            if state.accum_key != registry.value.accum_key || !state.verify(&info.element) {
                return Err(CredentialError::InvalidWitness);
            }
        }
        (Some(_), None) => return Err(CredentialError::InvalidWitness),
        _ => {}
    }

    tracing::debug!(cred_def_id = %credential.cred_def_id, "credential processed");
    Ok(credential)
}

/// One offer-to-credential exchange driven through the issuance state machine.
pub struct IssuanceExchange {
    id: Uuid,
    state: IssuanceState,
    offer: CredentialOffer,
    request: Option<CredentialRequest>,
    issued: Option<IssuedCredential>,
}

impl IssuanceExchange {
    pub fn offer(
        schema_id: SchemaId,
        cred_def_id: CredentialDefinitionId,
        definition: &CredentialDefinition,
        correctness_proof: &KeyCorrectnessProof,
        revocable: bool,
    ) -> Result<Self, CredentialError> {
        let offer = create_offer(schema_id, cred_def_id, definition, correctness_proof, revocable)?;
        let exchange = Self {
            id: Uuid::now_v7(),
            state: IssuanceState::Offered,
            offer,
            request: None,
            issued: None,
        };
        tracing::info!(exchange_id = %exchange.id, cred_def_id = %exchange.offer.cred_def_id, "issuance exchange started");
        Ok(exchange)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> IssuanceState {
        self.state
    }

    pub fn credential_offer(&self) -> &CredentialOffer {
        &self.offer
    }

    pub fn credential_request(&self) -> Option<&CredentialRequest> {
        self.request.as_ref()
    }

    fn advance<T>(
        &mut self,
        event: IssuanceEvent,
        step: impl FnOnce(&mut Self) -> Result<T, CredentialError>,
    ) -> Result<T, CredentialError> {
        let target = IssuanceStateMachine::transition(self.state, event)?;
        match step(self) {
            Ok(value) => {
                self.state = target;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(exchange_id = %self.id, error = %e, "issuance step failed");
                self.reject();
                Err(e)
            }
        }
    }

    pub fn request(
        &mut self,
        entropy: Option<&str>,
        definition: &CredentialDefinition,
        link_secret: &LinkSecret,
        link_secret_id: &str,
    ) -> Result<CredentialRequestMetadata, CredentialError> {
        self.advance(IssuanceEvent::Request, |exchange| {
            let (request, metadata) =
                create_request(entropy, definition, link_secret, link_secret_id, &exchange.offer)?;
            exchange.request = Some(request);
            Ok(metadata)
        })
    }

    pub fn issue(
        &mut self,
        definition: &CredentialDefinition,
        private: &CredentialDefinitionPrivate,
        values: CredentialValues,
        revocation: Option<RevocationConfig<'_>>,
    ) -> Result<IssuedCredential, CredentialError> {
        self.advance(IssuanceEvent::Issue, |exchange| {
            let request = exchange.request.as_ref().ok_or_else(|| {
                CredentialError::InvalidConfiguration("exchange has no request".into())
            })?;
            let issued =
                create_credential(definition, private, &exchange.offer, request, values, revocation)?;
            exchange.issued = Some(issued.clone());
            Ok(issued)
        })
    }

    pub fn process(
        &mut self,
        link_secret: &LinkSecret,
        metadata: &CredentialRequestMetadata,
        definition: &CredentialDefinition,
        registry: Option<&RevocationRegistryDefinition>,
    ) -> Result<Credential, CredentialError> {
        self.advance(IssuanceEvent::Process, |exchange| {
            let issued = exchange.issued.clone().ok_or_else(|| {
                CredentialError::InvalidConfiguration("exchange has no issued credential".into())
            })?;
            process_credential(issued, link_secret, metadata, definition, registry)
        })
    }

    /// Abandon the exchange. No-op once it has finished.
    pub fn reject(&mut self) {
        if let Ok(state) = IssuanceStateMachine::transition(self.state, IssuanceEvent::Reject) {
            tracing::info!(exchange_id = %self.id, from = %self.state, "issuance exchange rejected");
            self.state = state;
        }
    }
}
