//! BBS+ signatures with blind issuance over BLS12-381.
//!
//! A signature on messages `m_0..m_{L-1}` is `(A, e, s)` with
//! `A = (g1 + h_0·s + Σ h_i·m_i)·1/(x + e)`, verified by
//! `e(A, w + g2·e) = e(b, g2)` where `w = g2·x`.

use std::collections::BTreeMap;
use std::fmt;

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_std::rand::RngCore;
use bbs_plus::prelude::{PublicKeyG2, SecretKey as BbsSecretKey, SignatureG1};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::error::CryptoError;
use crate::params::SignatureParams;
use crate::scalar::random_nonzero_scalar;
use crate::serde_ark::ArkObjectBytes;

/// Issuer signing key.
#[derive(Clone)]
pub struct SecretKey(pub(crate) BbsSecretKey<Fr>);

impl SecretKey {
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        Self(BbsSecretKey(random_nonzero_scalar(rng)))
    }

    pub(crate) fn scalar(&self) -> &Fr {
        &self.0 .0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

/// Issuer verification key `w = g2·x`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(#[serde_as(as = "ArkObjectBytes")] pub(crate) PublicKeyG2<Bls12_381>);

impl PublicKey {
    pub fn from_secret(secret_key: &SecretKey, params: &SignatureParams) -> Self {
        Self(PublicKeyG2::generate_using_secret_key(
            &secret_key.0,
            &params.inner,
        ))
    }

    pub fn point(&self) -> &G2Affine {
        &self.0 .0
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "ArkObjectBytes")] pub(crate) SignatureG1<Bls12_381>);

impl Signature {
    /// Sign a full message vector in the clear.
    pub fn new<R: RngCore>(
        rng: &mut R,
        messages: &[Fr],
        secret_key: &SecretKey,
        params: &SignatureParams,
    ) -> Result<Self, CryptoError> {
        Ok(Self(SignatureG1::new(
            rng,
            messages,
            &secret_key.0,
            &params.inner,
        )?))
    }

    /// Sign when some messages arrive only as a Pedersen `commitment`
    /// (`h_0·blinding + Σ h_j·m_j`) and the rest are given in the clear.
    ///
    /// The result is blinded: the holder adds its commitment blinding to `s`
    /// with [`Signature::unblind`] before it verifies.
    pub fn new_with_committed_messages<R: RngCore>(
        rng: &mut R,
        commitment: &G1Affine,
        uncommitted: &BTreeMap<usize, Fr>,
        secret_key: &SecretKey,
        params: &SignatureParams,
    ) -> Result<Self, CryptoError> {
        if commitment.is_zero() {
            return Err(CryptoError::InvalidInput(
                "commitment to hidden messages is the identity".into(),
            ));
        }
        let count = params.message_count();
        if let Some(index) = uncommitted.keys().find(|i| **i >= count) {
            return Err(CryptoError::MessageIndexOutOfRange {
                index: *index,
                count,
            });
        }
        let uncommitted = uncommitted.iter().map(|(i, m)| (*i, m)).collect();
        Ok(Self(SignatureG1::new_with_committed_messages(
            rng,
            commitment,
            uncommitted,
            &secret_key.0,
            &params.inner,
        )?))
    }

    /// Remove the holder's commitment blinding.
    pub fn unblind(&self, blinding: &Fr) -> Self {
        Self(self.0.clone().unblind(blinding))
    }

    pub fn verify(
        &self,
        messages: &[Fr],
        public_key: &PublicKey,
        params: &SignatureParams,
    ) -> Result<(), CryptoError> {
        if messages.len() != params.message_count() {
            return Err(CryptoError::InvalidMessageCount {
                expected: params.message_count(),
                actual: messages.len(),
            });
        }
        self.0
            .verify(messages, public_key.0.clone(), params.inner.clone())
            .map_err(|e| match CryptoError::from(e) {
                CryptoError::ZkpError(_) => CryptoError::SignatureVerificationFailed,
                other => other,
            })
    }
}
