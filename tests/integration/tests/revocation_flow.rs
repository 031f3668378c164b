//! Integration test: accumulator revocation from issuance to verification.
//!
//! Drives a registry through status-list updates and checks which
//! presentations still verify against the published history.

use veil_core::{NonRevokedInterval, RevocationSettings, TimestampPolicy};
use veil_credentials::{CredentialError, CredentialWallet, LinkSecret};
use veil_integration_tests::RevocableIssuer;
use veil_proof::ProofError;

fn allow_equal() -> RevocationSettings {
    RevocationSettings {
        timestamp_policy: TimestampPolicy::AllowEqual,
        issuance_by_default: true,
    }
}

fn strict() -> RevocationSettings {
    RevocationSettings::default()
}

fn interval(from: u64, to: u64) -> NonRevokedInterval {
    NonRevokedInterval::new(Some(from), Some(to))
}

// =========================================================================
// Same-batch revocation at timestamp 150
// =========================================================================

#[test]
fn test_revoke_in_same_batch() {
    let issuer = RevocableIssuer::new(100, allow_equal(), 150);
    let link_secret = LinkSecret::new();
    let first = issuer.issue(&link_secret, 1, "first");
    let second = issuer.issue(&link_secret, 2, "second");
    let overrides = [issuer.override_from(100, 150)];
    let request = issuer.request(interval(100, 200));

    for credential in [&first, &second] {
        let state = credential.witness.as_ref().unwrap();
        assert_eq!(state.timestamp, 150);
        let presentation = issuer
            .present(&request, credential, state, &link_secret)
            .unwrap();
        assert!(issuer.verify(&presentation, &request, &overrides).unwrap());
    }

    let list = issuer.registry.revoke(Some(150), &[1]).unwrap();
    assert_eq!(list.timestamp, 150);
    assert!(list.is_revoked(1));

    // Index 1: neither the issued witness nor a recomputed one proves membership.
    let stale = first.witness.as_ref().unwrap();
    let presentation = issuer
        .present(&request, &first, stale, &link_secret)
        .unwrap();
    assert!(!issuer.verify(&presentation, &request, &overrides).unwrap());

    let recomputed = issuer.witness(&first, &list);
    assert!(!recomputed.verify(&first.revocation.as_ref().unwrap().element));
    let presentation = issuer
        .present(&request, &first, &recomputed, &link_secret)
        .unwrap();
    assert!(!issuer.verify(&presentation, &request, &overrides).unwrap());

    // Index 2 refreshes and keeps verifying.
    let refreshed = issuer.witness(&second, &list);
    let presentation = issuer
        .present(&request, &second, &refreshed, &link_secret)
        .unwrap();
    assert!(issuer.verify(&presentation, &request, &overrides).unwrap());
}

// =========================================================================
// Strict registries: history, stale witnesses, wallets
// =========================================================================

#[test]
fn test_strict_registry_rejects_equal_timestamp() {
    let issuer = RevocableIssuer::new(10, strict(), 150);
    for timestamp in [100, 149, 150] {
        assert!(matches!(
            issuer.registry.revoke(Some(timestamp), &[1]),
            Err(CredentialError::NonMonotonicTimestamp { last: 150, .. })
        ));
    }
    assert_eq!(issuer.registry.history().len(), 1);
    assert!(issuer.registry.revoke(Some(151), &[1]).is_ok());
}

#[test]
fn test_revocation_is_idempotent() {
    let issuer = RevocableIssuer::new(10, strict(), 100);
    let once = issuer.registry.revoke(Some(150), &[3]).unwrap();
    let twice = issuer.registry.revoke(Some(200), &[3]).unwrap();
    assert_eq!(once.revoked, twice.revoked);
    assert_eq!(once.accum, twice.accum);
}

#[test]
fn test_old_snapshot_still_verifies_inside_its_window() {
    let issuer = RevocableIssuer::new(10, strict(), 100);
    let link_secret = LinkSecret::new();
    let first = issuer.issue(&link_secret, 1, "first");
    let second = issuer.issue(&link_secret, 2, "second");
    issuer.registry.revoke(Some(150), &[1]).unwrap();

    // A window that still covers the snapshot at 100 accepts index 1.
    let early = issuer.request(interval(90, 120));
    let presentation = issuer
        .present(&early, &first, first.witness.as_ref().unwrap(), &link_secret)
        .unwrap();
    assert!(issuer.verify(&presentation, &early, &[]).unwrap());

    // A window starting after the revocation rejects the stale snapshot.
    let late = issuer.request(interval(150, 200));
    let stale = second.witness.as_ref().unwrap();
    let presentation = issuer.present(&late, &second, stale, &link_secret).unwrap();
    assert!(!issuer.verify(&presentation, &late, &[]).unwrap());

    let refreshed = issuer.witness(&second, &issuer.latest());
    let presentation = issuer
        .present(&late, &second, &refreshed, &link_secret)
        .unwrap();
    assert!(issuer.verify(&presentation, &late, &[]).unwrap());
}

#[test]
fn test_superseded_snapshot_rejected_after_revocation_inside_window() {
    let issuer = RevocableIssuer::new(10, strict(), 100);
    let link_secret = LinkSecret::new();
    let revoked = issuer.issue(&link_secret, 1, "revoked");
    let kept = issuer.issue(&link_secret, 2, "kept");
    let list = issuer.registry.revoke(Some(150), &[1]).unwrap();
    assert_eq!(issuer.status_lists().len(), 2);

    // Both snapshots lie inside the window; only the one at 150 counts.
    let request = issuer.request(interval(100, 200));
    let presentation = issuer
        .present(&request, &revoked, revoked.witness.as_ref().unwrap(), &link_secret)
        .unwrap();
    assert!(!issuer.verify(&presentation, &request, &[]).unwrap());

    let presentation = issuer
        .present(&request, &kept, kept.witness.as_ref().unwrap(), &link_secret)
        .unwrap();
    assert!(!issuer.verify(&presentation, &request, &[]).unwrap());

    let refreshed = issuer.witness(&kept, &list);
    let presentation = issuer
        .present(&request, &kept, &refreshed, &link_secret)
        .unwrap();
    assert!(issuer.verify(&presentation, &request, &[]).unwrap());

    // A verifier that only knows the older snapshot still accepts it.
    let presentation = issuer
        .present(&request, &kept, kept.witness.as_ref().unwrap(), &link_secret)
        .unwrap();
    let first = issuer.status_lists()[..1].to_vec();
    assert!(issuer.verify_with(&presentation, &request, &first, &[]).unwrap());
}

#[test]
fn test_override_accepts_earlier_snapshot() {
    let issuer = RevocableIssuer::new(10, strict(), 150);
    let link_secret = LinkSecret::new();
    let credential = issuer.issue(&link_secret, 0, "value");
    let request = issuer.request(interval(200, 300));
    let presentation = issuer
        .present(
            &request,
            &credential,
            credential.witness.as_ref().unwrap(),
            &link_secret,
        )
        .unwrap();

    assert!(!issuer.verify(&presentation, &request, &[]).unwrap());
    let overrides = [issuer.override_from(200, 150)];
    assert!(issuer.verify(&presentation, &request, &overrides).unwrap());
}

#[test]
fn test_witness_newer_than_interval() {
    let issuer = RevocableIssuer::new(10, strict(), 150);
    let link_secret = LinkSecret::new();
    let credential = issuer.issue(&link_secret, 0, "value");
    let request = issuer.request(interval(100, 120));
    let result = issuer.present(
        &request,
        &credential,
        credential.witness.as_ref().unwrap(),
        &link_secret,
    );
    assert!(matches!(result, Err(ProofError::InsufficientWitness(_))));
}

#[test]
fn test_missing_status_list_is_an_error() {
    let issuer = RevocableIssuer::new(10, strict(), 100);
    let link_secret = LinkSecret::new();
    let credential = issuer.issue(&link_secret, 0, "value");
    let request = issuer.request(interval(50, 200));
    let presentation = issuer
        .present(
            &request,
            &credential,
            credential.witness.as_ref().unwrap(),
            &link_secret,
        )
        .unwrap();
    assert!(matches!(
        issuer.verify_with(&presentation, &request, &[], &[]),
        Err(ProofError::MissingStatusList { timestamp: 100, .. })
    ));
}

#[test]
fn test_wallet_tracks_registry_updates() {
    let issuer = RevocableIssuer::new(10, strict(), 100);
    let link_secret = LinkSecret::new();
    let wallet = CredentialWallet::new("default");
    wallet.store("first", issuer.issue(&link_secret, 1, "first"));
    wallet.store("second", issuer.issue(&link_secret, 2, "second"));

    let list = issuer.registry.revoke(Some(150), &[1]).unwrap();
    let definition = issuer.registry.definition();
    assert!(matches!(
        wallet.refresh_revocation_state("first", &list, definition, &issuer.tails),
        Err(CredentialError::InvalidWitness)
    ));
    let state = wallet
        .refresh_revocation_state("second", &list, definition, &issuer.tails)
        .unwrap();
    assert_eq!(state.timestamp, 150);

    let second = wallet.get("second").unwrap();
    let request = issuer.request(interval(150, 200));
    let presentation = issuer
        .present(&request, &second, &state, &link_secret)
        .unwrap();
    assert!(issuer.verify(&presentation, &request, &[]).unwrap());
}

#[test]
fn test_inactive_registry_activates_on_issuance() {
    let settings = RevocationSettings {
        issuance_by_default: false,
        ..strict()
    };
    let issuer = RevocableIssuer::new(10, settings, 100);
    let link_secret = LinkSecret::new();
    let credential = issuer.issue(&link_secret, 4, "value");
    let state = credential.witness.as_ref().unwrap();
    assert!(state.timestamp > 100);
    assert!(!issuer.latest().is_revoked(4));
    assert!(issuer.latest().is_revoked(5));

    let request = issuer.request(NonRevokedInterval::new(Some(100), None));
    let presentation = issuer
        .present(&request, &credential, state, &link_secret)
        .unwrap();
    assert!(issuer.verify(&presentation, &request, &[]).unwrap());
}
