//! Veil Proof — Presentation requests, selective-disclosure presentations
//! with predicates and non-revocation proofs, and their verification.

pub mod error;
#[cfg(test)]
mod fixtures;
pub mod presentation;
pub mod prover;
pub mod request;
pub mod verifier;

pub use error::ProofError;
pub use presentation::{
    Identifier, PredicateProof, Presentation, RequestedProof, RevealedAttribute,
    RevealedAttributeGroup, SubProof, SubProofReference,
};
pub use prover::{create_presentation, CredentialEntry, CredentialProve};
pub use request::{
    derive_presentation_request, restrictions_satisfied, AttributeInfo, PredicateInfo,
    PredicateType, PresentationRequest, Restriction, RestrictionContext, VerifierPolicy,
};
pub use verifier::{verify_presentation, NonRevokedIntervalOverride, PresentationVerifier};
