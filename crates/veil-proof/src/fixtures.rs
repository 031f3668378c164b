use std::collections::BTreeMap;

use veil_core::{CredentialDefinitionId, IssuerId, SchemaId};
use veil_credentials::{
    create_credential, create_offer, create_request, process_credential, Credential,
    CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionPrivate,
    CredentialValues, LinkSecret, Schema,
};
use veil_crypto::KeyCorrectnessProof;

pub(crate) struct Issuer {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub schema: Schema,
    pub definition: CredentialDefinition,
    pub private: CredentialDefinitionPrivate,
    pub proof: KeyCorrectnessProof,
}

impl Issuer {
    /// Non-revocable issuer of `name`/`age` credentials.
    pub fn new(label: &str) -> Self {
        let issuer_id = IssuerId::new(label);
        let schema_id = SchemaId::new(format!("{}/schema", label));
        let cred_def_id = CredentialDefinitionId::new(format!("{}/definition", label));
        let schema = Schema::create("person", "1.0", issuer_id.clone(), &["name", "age"]).unwrap();
        let (definition, private, proof) = CredentialDefinition::create(
            schema_id.clone(),
            &schema,
            issuer_id,
            "tag",
            "CL",
            CredentialDefinitionConfig::new(false),
        )
        .unwrap();
        Self {
            schema_id,
            cred_def_id,
            schema,
            definition,
            private,
            proof,
        }
    }

    pub fn issue(&self, link_secret: &LinkSecret, name: &str, age: &str) -> Credential {
        let offer = create_offer(
            self.schema_id.clone(),
            self.cred_def_id.clone(),
            &self.definition,
            &self.proof,
            false,
        )
        .unwrap();
        let (request, metadata) =
            create_request(None, &self.definition, link_secret, "default", &offer).unwrap();
        let mut values = CredentialValues::new();
        values.add_raw("name", name).add_raw("age", age);
        let issued =
            create_credential(&self.definition, &self.private, &offer, &request, values, None)
                .unwrap();
        process_credential(issued, link_secret, &metadata, &self.definition, None).unwrap()
    }

    pub fn schemas(&self) -> BTreeMap<SchemaId, Schema> {
        [(self.schema_id.clone(), self.schema.clone())].into_iter().collect()
    }

    pub fn cred_defs(&self) -> BTreeMap<CredentialDefinitionId, CredentialDefinition> {
        [(self.cred_def_id.clone(), self.definition.clone())]
            .into_iter()
            .collect()
    }
}
