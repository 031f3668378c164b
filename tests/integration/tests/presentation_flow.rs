//! Integration test: presentations over revocable credentials.

use std::collections::BTreeSet;

use veil_core::{NonRevokedInterval, RevocationSettings};
use veil_credentials::{LinkSecret, LINK_SECRET_INDEX};
use veil_integration_tests::RevocableIssuer;
use veil_proof::{
    create_presentation, derive_presentation_request, AttributeInfo, CredentialEntry,
    CredentialProve, Presentation, PresentationVerifier, VerifierPolicy,
};

fn window() -> NonRevokedInterval {
    NonRevokedInterval::new(Some(100), Some(200))
}

#[test]
fn test_two_credentials_one_holder() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();
    let first = issuer.issue(&link_secret, 1, "first");
    let second = issuer.issue(&link_secret, 2, "second");

    let request = derive_presentation_request(
        &VerifierPolicy::new("both", "1.0")
            .attribute("a", AttributeInfo::single("test"))
            .attribute("b", AttributeInfo::single("test"))
            .non_revoked(window()),
    )
    .unwrap();
    let (w1, w2) = (first.witness.as_ref().unwrap(), second.witness.as_ref().unwrap());
    let presentation = create_presentation(
        &request,
        &[
            CredentialEntry::new(&first).with_revocation_state(w1.timestamp, w1),
            CredentialEntry::new(&second).with_revocation_state(w2.timestamp, w2),
        ],
        &[
            CredentialProve::attribute(0, "a", true),
            CredentialProve::attribute(1, "b", true),
        ],
        &link_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
    )
    .unwrap();

    assert_eq!(presentation.sub_proofs.len(), 2);
    assert_eq!(presentation.revealed("a"), Some("first"));
    assert_eq!(presentation.revealed("b"), Some("second"));
    assert!(presentation
        .identifiers
        .iter()
        .all(|id| id.timestamp == Some(100) && id.rev_reg_id.as_ref() == Some(&issuer.rev_reg_id)));
    assert!(issuer.verify(&presentation, &request, &[]).unwrap());

    // A holder with another link secret cannot mix in its own credential.
    let other_secret = LinkSecret::new();
    let foreign = issuer.issue(&other_secret, 3, "third");
    let w3 = foreign.witness.as_ref().unwrap();
    let presentation = create_presentation(
        &request,
        &[
            CredentialEntry::new(&first).with_revocation_state(w1.timestamp, w1),
            CredentialEntry::new(&foreign).with_revocation_state(w3.timestamp, w3),
        ],
        &[
            CredentialProve::attribute(0, "a", true),
            CredentialProve::attribute(1, "b", true),
        ],
        &link_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
    )
    .unwrap();
    assert!(!issuer.verify(&presentation, &request, &[]).unwrap());
}

#[test]
fn test_presentations_from_sibling_credentials_are_unlinkable() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();
    let first = issuer.issue(&link_secret, 1, "same");
    let second = issuer.issue(&link_secret, 2, "same");
    let request = issuer.request(window());

    let p1 = issuer
        .present(&request, &first, first.witness.as_ref().unwrap(), &link_secret)
        .unwrap();
    let p2 = issuer
        .present(&request, &second, second.witness.as_ref().unwrap(), &link_secret)
        .unwrap();
    assert!(issuer.verify(&p1, &request, &[]).unwrap());
    assert!(issuer.verify(&p2, &request, &[]).unwrap());

    let (s1, s2) = (&p1.sub_proofs[0], &p2.sub_proofs[0]);
    assert_ne!(s1.signature_proof, s2.signature_proof);
    assert_ne!(
        s1.signature_proof
            .response_for_message(LINK_SECRET_INDEX, &BTreeSet::new()),
        s2.signature_proof
            .response_for_message(LINK_SECRET_INDEX, &BTreeSet::new())
    );
    assert_ne!(s1.non_revocation, s2.non_revocation);
}

#[test]
fn test_presentation_json_roundtrip_preserves_outcome() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();
    let kept = issuer.issue(&link_secret, 1, "kept");
    let revoked = issuer.issue(&link_secret, 2, "revoked");
    let request = issuer.request(window());

    let list = issuer.registry.revoke(Some(150), &[2]).unwrap();
    let good = issuer
        .present(&request, &kept, &issuer.witness(&kept, &list), &link_secret)
        .unwrap();
    let bad = issuer
        .present(
            &request,
            &revoked,
            &issuer.witness(&revoked, &list),
            &link_secret,
        )
        .unwrap();

    for (presentation, expected) in [(good, true), (bad, false)] {
        let decoded = Presentation::from_json(&presentation.to_json().unwrap()).unwrap();
        assert_eq!(issuer.verify(&presentation, &request, &[]).unwrap(), expected);
        assert_eq!(issuer.verify(&decoded, &request, &[]).unwrap(), expected);
    }
}

#[test]
fn test_batch_verification() {
    let issuer = RevocableIssuer::new(10, RevocationSettings::default(), 100);
    let link_secret = LinkSecret::new();
    let credentials: Vec<_> = (0..4)
        .map(|i| issuer.issue(&link_secret, i, &format!("holder-{}", i)))
        .collect();
    let request = issuer.request(window());
    let presentations: Vec<Presentation> = credentials
        .iter()
        .map(|c| {
            issuer
                .present(&request, c, c.witness.as_ref().unwrap(), &link_secret)
                .unwrap()
        })
        .collect();
    let other_request = issuer.request(window());

    let schemas = issuer.schemas();
    let cred_defs = issuer.cred_defs();
    let rev_reg_defs = issuer.rev_reg_defs();
    let status_lists = issuer.status_lists();
    let verifier = PresentationVerifier::new(&schemas, &cred_defs, &rev_reg_defs, &status_lists);

    let mut items: Vec<_> = presentations.iter().map(|p| (p, &request)).collect();
    items.push((&presentations[0], &other_request));
    let results = verifier.verify_batch(&items);
    assert_eq!(results.len(), 5);
    assert!(results[..4].iter().all(|r| matches!(r, Ok(true))));
    assert!(results[4].is_err());
}
