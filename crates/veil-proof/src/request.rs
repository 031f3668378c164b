use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use veil_core::{
    normalize_attribute_name, CredentialDefinitionId, IssuerId, NonRevokedInterval, Nonce,
    SchemaId,
};
use veil_credentials::{CredentialDefinition, Schema};

use crate::error::ProofError;

/// Relation a predicate proves between a hidden attribute and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateType {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "<")]
    Less,
}

impl PredicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::Less => "<",
        }
    }

    /// `(negate, offset)` such that the predicate holds iff
    /// `±value + offset >= 0`.
    pub fn statement(&self, threshold: i32) -> (bool, i64) {
        let t = i64::from(threshold);
        match self {
            Self::GreaterOrEqual => (false, -t),
            Self::Greater => (false, -t - 1),
            Self::LessOrEqual => (true, t),
            Self::Less => (true, t - 1),
        }
    }

    /// The non-negative difference the range proof is made over, or `None`
    /// when the predicate does not hold.
    pub fn delta(&self, value: i32, threshold: i32) -> Option<u64> {
        let (negate, offset) = self.statement(threshold);
        let value = i64::from(value);
        let delta = if negate { offset - value } else { value + offset };
        u64::try_from(delta).ok()
    }
}

impl std::fmt::Display for PredicateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One acceptable credential origin. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SchemaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_id: Option<IssuerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<IssuerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<CredentialDefinitionId>,
    /// Required raw values of revealed attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attr_values: BTreeMap<String, String>,
}

/// What a restriction is evaluated against.
pub struct RestrictionContext<'a> {
    pub schema_id: &'a SchemaId,
    pub schema: &'a Schema,
    pub cred_def_id: &'a CredentialDefinitionId,
    pub definition: &'a CredentialDefinition,
    /// Revealed raw values keyed by normalised attribute name.
    pub revealed: &'a BTreeMap<String, String>,
}

impl Restriction {
    pub fn for_cred_def(cred_def_id: impl Into<CredentialDefinitionId>) -> Self {
        Self {
            cred_def_id: Some(cred_def_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, ctx: &RestrictionContext<'_>) -> bool {
        fn check<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
            wanted.as_ref().map_or(true, |w| w == actual)
        }

        check(&self.schema_id, ctx.schema_id)
            && check(&self.schema_issuer_id, ctx.schema.issuer_id())
            && check(&self.schema_name, &ctx.schema.name().to_string())
            && check(&self.schema_version, &ctx.schema.version().to_string())
            && check(&self.issuer_id, &ctx.definition.issuer_id)
            && check(&self.cred_def_id, ctx.cred_def_id)
            && self.attr_values.iter().all(|(name, value)| {
                ctx.revealed.get(&normalize_attribute_name(name)) == Some(value)
            })
    }
}

/// Any one restriction in the list is enough; an absent or empty list
/// accepts every credential.
pub fn restrictions_satisfied(
    restrictions: Option<&[Restriction]>,
    ctx: &RestrictionContext<'_>,
) -> bool {
    match restrictions {
        None | Some([]) => true,
        Some(list) => list.iter().any(|r| r.matches(ctx)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Restriction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl AttributeInfo {
    pub fn single(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn group(names: &[&str]) -> Self {
        Self {
            names: Some(names.iter().map(|n| n.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = Some(restrictions);
        self
    }

    pub fn with_non_revoked(mut self, interval: NonRevokedInterval) -> Self {
        self.non_revoked = Some(interval);
        self
    }

    /// Requested names, whether given singly or as a group.
    pub fn attribute_names(&self) -> Vec<&str> {
        match (&self.name, &self.names) {
            (Some(name), _) => vec![name.as_str()],
            (None, Some(names)) => names.iter().map(String::as_str).collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.name.is_none()
    }

    fn validate(&self, referent: &str) -> Result<(), ProofError> {
        match (&self.name, &self.names) {
            (Some(_), Some(_)) => {
                return Err(ProofError::InvalidRequest(format!(
                    "{}: name and names are mutually exclusive",
                    referent
                )))
            }
            (None, None) => {
                return Err(ProofError::InvalidRequest(format!(
                    "{}: no attribute name",
                    referent
                )))
            }
            (None, Some(names)) if names.is_empty() => {
                return Err(ProofError::InvalidRequest(format!(
                    "{}: empty attribute group",
                    referent
                )))
            }
            _ => {}
        }
        if let Some(interval) = &self.non_revoked {
            interval.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateInfo {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Restriction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PredicateInfo {
    pub fn new(name: &str, p_type: PredicateType, p_value: i32) -> Self {
        Self {
            name: name.to_string(),
            p_type,
            p_value,
            restrictions: None,
            non_revoked: None,
        }
    }

    pub fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = Some(restrictions);
        self
    }

    pub fn with_non_revoked(mut self, interval: NonRevokedInterval) -> Self {
        self.non_revoked = Some(interval);
        self
    }
}

/// What a verifier asks a holder to prove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRequest {
    pub name: String,
    pub version: String,
    pub nonce: Nonce,
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, AttributeInfo>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, PredicateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PresentationRequest {
    pub fn validate(&self) -> Result<(), ProofError> {
        if self.requested_attributes.is_empty() && self.requested_predicates.is_empty() {
            return Err(ProofError::InvalidRequest("nothing requested".into()));
        }
        if let Some(referent) = self
            .requested_attributes
            .keys()
            .find(|r| self.requested_predicates.contains_key(*r))
        {
            return Err(ProofError::InvalidRequest(format!(
                "referent {} names both an attribute and a predicate",
                referent
            )));
        }
        for (referent, info) in &self.requested_attributes {
            info.validate(referent)?;
        }
        for info in self.requested_predicates.values() {
            if let Some(interval) = &info.non_revoked {
                interval.validate()?;
            }
        }
        if let Some(interval) = &self.non_revoked {
            interval.validate()?;
        }
        Ok(())
    }

    /// Non-revocation window that applies to `referent`, if any.
    pub fn interval_for(&self, referent: &str) -> Option<NonRevokedInterval> {
        let local = self
            .requested_attributes
            .get(referent)
            .and_then(|a| a.non_revoked.as_ref())
            .or_else(|| {
                self.requested_predicates
                    .get(referent)
                    .and_then(|p| p.non_revoked.as_ref())
            });
        NonRevokedInterval::resolve(self.non_revoked.as_ref(), local)
    }

    /// Tightest window covering every referent in `referents`.
    pub fn interval_for_all<'r>(
        &self,
        referents: impl IntoIterator<Item = &'r str>,
    ) -> Option<NonRevokedInterval> {
        referents
            .into_iter()
            .filter_map(|r| self.interval_for(r))
            .reduce(|a, b| NonRevokedInterval {
                from: a.from.max(b.from),
                to: match (a.to, b.to) {
                    (Some(x), Some(y)) => Some(x.min(y)),
                    (x, y) => x.or(y),
                },
            })
    }

    pub fn restrictions_for(&self, referent: &str) -> Option<&[Restriction]> {
        self.requested_attributes
            .get(referent)
            .and_then(|a| a.restrictions.as_deref())
            .or_else(|| {
                self.requested_predicates
                    .get(referent)
                    .and_then(|p| p.restrictions.as_deref())
            })
    }

    pub fn referents(&self) -> BTreeSet<&str> {
        self.requested_attributes
            .keys()
            .chain(self.requested_predicates.keys())
            .map(String::as_str)
            .collect()
    }
}

/// A verifier's standing requirements, from which fresh requests are derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierPolicy {
    pub name: String,
    pub version: String,
    pub attributes: BTreeMap<String, AttributeInfo>,
    pub predicates: BTreeMap<String, PredicateInfo>,
    pub non_revoked: Option<NonRevokedInterval>,
}

impl VerifierPolicy {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            ..Self::default()
        }
    }

    pub fn attribute(mut self, referent: &str, info: AttributeInfo) -> Self {
        self.attributes.insert(referent.to_string(), info);
        self
    }

    pub fn predicate(mut self, referent: &str, info: PredicateInfo) -> Self {
        self.predicates.insert(referent.to_string(), info);
        self
    }

    pub fn non_revoked(mut self, interval: NonRevokedInterval) -> Self {
        self.non_revoked = Some(interval);
        self
    }
}

/// Build a validated request with a fresh nonce.
pub fn derive_presentation_request(
    policy: &VerifierPolicy,
) -> Result<PresentationRequest, ProofError> {
    let request = PresentationRequest {
        name: policy.name.clone(),
        version: policy.version.clone(),
        nonce: Nonce::new(),
        requested_attributes: policy.attributes.clone(),
        requested_predicates: policy.predicates.clone(),
        non_revoked: policy.non_revoked,
    };
    request.validate()?;
    tracing::debug!(
        name = %request.name,
        attributes = request.requested_attributes.len(),
        predicates = request.requested_predicates.len(),
        "presentation request derived"
    );
    Ok(request)
}
