//! Fixtures shared by the cross-crate scenarios in `tests/`.

use std::collections::BTreeMap;
use std::sync::Arc;

use veil_core::{
    CredentialDefinitionId, IssuerId, NonRevokedInterval, RevocationRegistryDefinitionId,
    RevocationSettings, SchemaId,
};
use veil_credentials::{
    create_credential, create_offer, create_request, process_credential, Credential,
    CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionPrivate,
    CredentialRevocationState, CredentialValues, InMemoryTailsStore, LinkSecret, RegistryContext,
    RevocationRegistryDefinition, RevocationStatusList, Schema, TailsReader,
};
use veil_crypto::{KeyCorrectnessProof, Tails};
use veil_proof::{
    create_presentation, derive_presentation_request, verify_presentation, AttributeInfo,
    CredentialEntry, CredentialProve, NonRevokedIntervalOverride, Presentation,
    PresentationRequest, ProofError, Restriction, VerifierPolicy,
};

/// An issuer of single-attribute `test` credentials backed by one
/// revocation registry.
pub struct RevocableIssuer {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub rev_reg_id: RevocationRegistryDefinitionId,
    pub schema: Schema,
    pub definition: CredentialDefinition,
    pub private: CredentialDefinitionPrivate,
    pub proof: KeyCorrectnessProof,
    pub registry: RegistryContext,
    pub tails: Tails,
}

impl RevocableIssuer {
    /// Registry of `max` indices whose first status list is published at
    /// `timestamp`.
    pub fn new(max: u32, settings: RevocationSettings, timestamp: u64) -> Self {
        let issuer_id = IssuerId::new("did:veil:issuer");
        let schema_id = SchemaId::new("did:veil:issuer/schema/test/1.0");
        let cred_def_id = CredentialDefinitionId::new("did:veil:issuer/creddef/test");
        let rev_reg_id = RevocationRegistryDefinitionId::new("did:veil:issuer/revreg/test");

        let schema = Schema::create("test", "1.0", issuer_id.clone(), &["test"]).unwrap();
        let (definition, private, proof) = CredentialDefinition::create(
            schema_id.clone(),
            &schema,
            issuer_id.clone(),
            "default",
            "CL",
            CredentialDefinitionConfig::new(true),
        )
        .unwrap();

        let store = InMemoryTailsStore::new();
        let (rev_def, rev_private) = RevocationRegistryDefinition::create(
            &definition,
            cred_def_id.clone(),
            issuer_id,
            "default",
            "CL_ACCUM",
            max,
            &store,
        )
        .unwrap();
        let tails = store.read(&rev_def.value.tails_location).unwrap();
        let registry = RegistryContext::new(
            rev_reg_id.clone(),
            rev_def,
            rev_private,
            &settings,
            Some(timestamp),
        )
        .unwrap();

        Self {
            schema_id,
            cred_def_id,
            rev_reg_id,
            schema,
            definition,
            private,
            proof,
            registry,
            tails,
        }
    }

    /// Run the whole offer/request/issue/process exchange for `index`.
    pub fn issue(&self, link_secret: &LinkSecret, index: u32, value: &str) -> Credential {
        let offer = create_offer(
            self.schema_id.clone(),
            self.cred_def_id.clone(),
            &self.definition,
            &self.proof,
            true,
        )
        .unwrap();
        let (request, metadata) =
            create_request(None, &self.definition, link_secret, "default", &offer).unwrap();
        let mut values = CredentialValues::new();
        values.add_raw("test", value);
        let issued = create_credential(
            &self.definition,
            &self.private,
            &offer,
            &request,
            values,
            Some(self.registry.revocation_config(Some(index)).unwrap()),
        )
        .unwrap();
        process_credential(
            issued,
            link_secret,
            &metadata,
            &self.definition,
            Some(self.registry.definition()),
        )
        .unwrap()
    }

    /// Witness for `credential` against `status_list`.
    pub fn witness(
        &self,
        credential: &Credential,
        status_list: &RevocationStatusList,
    ) -> CredentialRevocationState {
        let index = credential.revocation.as_ref().unwrap().index;
        veil_credentials::witness_for(index, status_list, self.registry.definition(), &self.tails)
            .unwrap()
    }

    pub fn schemas(&self) -> BTreeMap<SchemaId, Schema> {
        [(self.schema_id.clone(), self.schema.clone())].into_iter().collect()
    }

    pub fn cred_defs(&self) -> BTreeMap<CredentialDefinitionId, CredentialDefinition> {
        [(self.cred_def_id.clone(), self.definition.clone())]
            .into_iter()
            .collect()
    }

    pub fn rev_reg_defs(
        &self,
    ) -> BTreeMap<RevocationRegistryDefinitionId, RevocationRegistryDefinition> {
        [(self.rev_reg_id.clone(), self.registry.definition().clone())]
            .into_iter()
            .collect()
    }

    /// Every status list published so far, oldest first.
    pub fn status_lists(&self) -> Vec<RevocationStatusList> {
        self.registry
            .history()
            .iter()
            .map(|list| list.as_ref().clone())
            .collect()
    }

    pub fn latest(&self) -> Arc<RevocationStatusList> {
        self.registry.current().unwrap()
    }

    /// Request revealing `test` from this issuer's credentials, active
    /// somewhere in `interval`.
    pub fn request(&self, interval: NonRevokedInterval) -> PresentationRequest {
        derive_presentation_request(
            &VerifierPolicy::new("revocation", "1.0")
                .attribute(
                    "test",
                    AttributeInfo::group(&["test"])
                        .with_restrictions(vec![Restriction::for_cred_def(self.cred_def_id.clone())]),
                )
                .non_revoked(interval),
        )
        .unwrap()
    }

    /// Present `credential` with `state` as its non-revocation witness.
    pub fn present(
        &self,
        request: &PresentationRequest,
        credential: &Credential,
        state: &CredentialRevocationState,
        link_secret: &LinkSecret,
    ) -> Result<Presentation, ProofError> {
        create_presentation(
            request,
            &[CredentialEntry::new(credential).with_revocation_state(state.timestamp, state)],
            &[CredentialProve::attribute(0, "test", true)],
            link_secret,
            &self.schemas(),
            &self.cred_defs(),
        )
    }

    /// Verify against everything the registry has published.
    pub fn verify(
        &self,
        presentation: &Presentation,
        request: &PresentationRequest,
        overrides: &[NonRevokedIntervalOverride],
    ) -> Result<bool, ProofError> {
        self.verify_with(presentation, request, &self.status_lists(), overrides)
    }

    pub fn verify_with(
        &self,
        presentation: &Presentation,
        request: &PresentationRequest,
        status_lists: &[RevocationStatusList],
        overrides: &[NonRevokedIntervalOverride],
    ) -> Result<bool, ProofError> {
        verify_presentation(
            presentation,
            request,
            &self.schemas(),
            &self.cred_defs(),
            &self.rev_reg_defs(),
            status_lists,
            overrides,
        )
    }

    /// Override letting a request starting at `from` accept the list at `to`.
    pub fn override_from(&self, from: u64, to: u64) -> NonRevokedIntervalOverride {
        NonRevokedIntervalOverride {
            rev_reg_def_id: self.rev_reg_id.clone(),
            requested_from_timestamp: from,
            override_rev_status_list_timestamp: to,
        }
    }
}
