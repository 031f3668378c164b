//! Integration test: the offer → request → issue → process exchange.

use veil_core::{
    CoreError, IssuanceState, NonRevokedInterval, RevocationSettings, TimestampPolicy,
};
use veil_credentials::{
    Credential, CredentialError, CredentialValues, IssuanceExchange, LinkSecret,
    RevocationStatusList,
};
use veil_integration_tests::RevocableIssuer;

fn values(value: &str) -> CredentialValues {
    let mut values = CredentialValues::new();
    values.add_raw("test", value);
    values
}

// =========================================================================
// Exchange state machine
// =========================================================================

#[test]
fn test_exchange_happy_path() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();

    let mut exchange = IssuanceExchange::offer(
        issuer.schema_id.clone(),
        issuer.cred_def_id.clone(),
        &issuer.definition,
        &issuer.proof,
        true,
    )
    .unwrap();
    assert_eq!(exchange.state(), IssuanceState::Offered);
    assert!(exchange.credential_request().is_none());

    let metadata = exchange
        .request(Some("holder-entropy"), &issuer.definition, &link_secret, "default")
        .unwrap();
    assert_eq!(exchange.state(), IssuanceState::Requested);
    assert_eq!(exchange.credential_request().unwrap().entropy, "holder-entropy");
    assert_eq!(metadata.nonce(), &exchange.credential_offer().nonce);

    let issued = exchange
        .issue(
            &issuer.definition,
            &issuer.private,
            values("value"),
            Some(issuer.registry.revocation_config(None).unwrap()),
        )
        .unwrap();
    assert_eq!(exchange.state(), IssuanceState::Issued);
    assert_eq!(issued.revocation.as_ref().unwrap().index, 0);

    let credential = exchange
        .process(
            &link_secret,
            &metadata,
            &issuer.definition,
            Some(issuer.registry.definition()),
        )
        .unwrap();
    assert_eq!(exchange.state(), IssuanceState::Processed);
    assert_eq!(credential.attribute("test").unwrap().raw, "value");
    assert!(credential.is_revocable());
}

#[test]
fn test_exchange_out_of_order() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let mut exchange = IssuanceExchange::offer(
        issuer.schema_id.clone(),
        issuer.cred_def_id.clone(),
        &issuer.definition,
        &issuer.proof,
        true,
    )
    .unwrap();

    let result = exchange.issue(&issuer.definition, &issuer.private, values("value"), None);
    assert!(matches!(
        result,
        Err(CredentialError::Core(CoreError::InvalidStateTransition {
            from: IssuanceState::Offered,
            to: IssuanceState::Issued,
        }))
    ));
    assert_eq!(exchange.state(), IssuanceState::Offered);
}

#[test]
fn test_exchange_rejected_on_foreign_link_secret() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let mut exchange = IssuanceExchange::offer(
        issuer.schema_id.clone(),
        issuer.cred_def_id.clone(),
        &issuer.definition,
        &issuer.proof,
        true,
    )
    .unwrap();
    let metadata = exchange
        .request(None, &issuer.definition, &LinkSecret::new(), "default")
        .unwrap();
    exchange
        .issue(
            &issuer.definition,
            &issuer.private,
            values("value"),
            Some(issuer.registry.revocation_config(None).unwrap()),
        )
        .unwrap();

    let result = exchange.process(
        &LinkSecret::new(),
        &metadata,
        &issuer.definition,
        Some(issuer.registry.definition()),
    );
    assert!(matches!(result, Err(CredentialError::SignatureVerification)));
    assert_eq!(exchange.state(), IssuanceState::Rejected);

    exchange.reject();
    assert_eq!(exchange.state(), IssuanceState::Rejected);
}

#[test]
fn test_issuance_missing_registry_binding() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let mut exchange = IssuanceExchange::offer(
        issuer.schema_id.clone(),
        issuer.cred_def_id.clone(),
        &issuer.definition,
        &issuer.proof,
        true,
    )
    .unwrap();
    exchange
        .request(None, &issuer.definition, &LinkSecret::new(), "default")
        .unwrap();
    let result = exchange.issue(&issuer.definition, &issuer.private, values("value"), None);
    assert!(matches!(result, Err(CredentialError::InvalidConfiguration(_))));
    assert_eq!(exchange.state(), IssuanceState::Rejected);
}

#[test]
fn test_revoked_index_cannot_be_issued() {
    let settings = RevocationSettings {
        timestamp_policy: TimestampPolicy::Strict,
        issuance_by_default: true,
    };
    let issuer = RevocableIssuer::new(10, settings, 100);
    issuer.registry.revoke(Some(150), &[3]).unwrap();

    let mut exchange = IssuanceExchange::offer(
        issuer.schema_id.clone(),
        issuer.cred_def_id.clone(),
        &issuer.definition,
        &issuer.proof,
        true,
    )
    .unwrap();
    exchange
        .request(None, &issuer.definition, &LinkSecret::new(), "default")
        .unwrap();
    let result = exchange.issue(
        &issuer.definition,
        &issuer.private,
        values("value"),
        Some(issuer.registry.revocation_config(Some(3)).unwrap()),
    );
    assert!(matches!(result, Err(CredentialError::IndexNotActive(3))));
    assert_eq!(issuer.registry.assigned_count(), 0);
}

#[test]
fn test_rejected_issuance_frees_the_only_index() {
    let issuer = RevocableIssuer::new(1, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();
    let mut exchange = IssuanceExchange::offer(
        issuer.schema_id.clone(),
        issuer.cred_def_id.clone(),
        &issuer.definition,
        &issuer.proof,
        true,
    )
    .unwrap();
    exchange
        .request(None, &issuer.definition, &link_secret, "default")
        .unwrap();
    let mut wrong = CredentialValues::new();
    wrong.add_raw("other", "value");
    let result = exchange.issue(
        &issuer.definition,
        &issuer.private,
        wrong,
        Some(issuer.registry.revocation_config(None).unwrap()),
    );
    assert!(matches!(result, Err(CredentialError::AttributeMismatch(_))));
    assert_eq!(issuer.registry.assigned_count(), 0);

    let credential = issuer.issue(&link_secret, 0, "value");
    assert_eq!(credential.revocation.as_ref().unwrap().index, 0);
    assert_eq!(issuer.registry.assigned_count(), 1);
}

// =========================================================================
// Serialization
// =========================================================================

#[test]
fn test_credential_and_status_list_json_roundtrip() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();
    let credential = issuer.issue(&link_secret, 2, "value");

    let json = serde_json::to_string(&credential).unwrap();
    let decoded: Credential = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, credential);

    let list = issuer.latest();
    let json = serde_json::to_string(list.as_ref()).unwrap();
    let decoded_list: RevocationStatusList = serde_json::from_str(&json).unwrap();
    assert_eq!(&decoded_list, list.as_ref());

    let request = issuer.request(NonRevokedInterval::new(Some(100), Some(200)));
    let presentation = issuer
        .present(
            &request,
            &decoded,
            decoded.witness.as_ref().unwrap(),
            &link_secret,
        )
        .unwrap();
    assert!(issuer
        .verify_with(&presentation, &request, &[decoded_list], &[])
        .unwrap());
}
