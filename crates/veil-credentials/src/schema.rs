use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use veil_core::{normalize_attribute_name, IssuerId, SchemaId};

use crate::error::CredentialError;

/// Declared attribute set for a credential type.
///
/// Immutable once created: every field is read-only outside this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    issuer_id: IssuerId,
    name: String,
    version: String,
    attr_names: Vec<String>,
}

impl Schema {
    /// Create a schema. Attribute names must be unique after normalisation.
    pub fn create(
        name: &str,
        version: &str,
        issuer_id: IssuerId,
        attr_names: &[&str],
    ) -> Result<Self, CredentialError> {
        if attr_names.is_empty() {
            return Err(CredentialError::InvalidSchema(
                "schema must have at least one attribute".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for attr in attr_names {
            let normalized = normalize_attribute_name(attr);
            if normalized.is_empty() {
                return Err(CredentialError::InvalidSchema(
                    "attribute names cannot be blank".into(),
                ));
            }
            if !seen.insert(normalized) {
                return Err(CredentialError::InvalidSchema(format!(
                    "duplicate attribute: {}",
                    attr
                )));
            }
        }

        Ok(Self {
            issuer_id,
            name: name.to_string(),
            version: version.to_string(),
            attr_names: attr_names.iter().map(|a| a.to_string()).collect(),
        })
    }

    pub fn issuer_id(&self) -> &IssuerId {
        &self.issuer_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Attribute names as declared, in order.
    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }

    /// Attribute names in normalised form, in declaration order.
    pub fn normalized_attr_names(&self) -> Vec<String> {
        self.attr_names
            .iter()
            .map(|a| normalize_attribute_name(a))
            .collect()
    }
}

/// Registry of published schemas.
pub struct SchemaRegistry {
    schemas: DashMap<SchemaId, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    /// Publish a schema under `id`. Published schemas cannot be replaced.
    pub fn register(&self, id: SchemaId, schema: Schema) -> Result<(), CredentialError> {
        match self.schemas.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(CredentialError::DuplicateSchema(id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                tracing::info!(schema_id = %id, name = %schema.name, "schema registered");
                slot.insert(schema);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &SchemaId) -> Option<Schema> {
        self.schemas.get(id).map(|entry| entry.clone())
    }

    pub fn list(&self) -> Vec<SchemaId> {
        self.schemas.iter().map(|e| e.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.schemas.len()
    }

    /// Check that `names` is exactly the schema's attribute set.
    pub fn validate_attributes<'a>(
        &self,
        id: &SchemaId,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), CredentialError> {
        let schema = self
            .get(id)
            .ok_or_else(|| CredentialError::SchemaNotFound(id.to_string()))?;
        let expected: BTreeSet<String> = schema.normalized_attr_names().into_iter().collect();
        let actual: BTreeSet<String> = names.into_iter().map(normalize_attribute_name).collect();
        if expected != actual {
            return Err(CredentialError::AttributeMismatch(format!(
                "expected {:?}, got {:?}",
                expected, actual
            )));
        }
        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
