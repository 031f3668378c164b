//! Positive pairing-based accumulator.
//!
//! The value for a member set `Y` is `V = P·∏_{y∈Y}(y + α)` and a witness for
//! `y` is `C = V·1/(y + α)`. Membership checks run through `vb_accumulator`.
//! Tails hold `P·α^k`, which lets anyone recompute values and witnesses from
//! the member set without the secret.

use std::fmt;

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::Field;
use ark_serialize::CanonicalSerialize;
use ark_std::{rand::RngCore, One};
use blake2::Blake2b512;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use vb_accumulator::prelude::{
    Accumulator as _, MembershipWitness as VbWitness, PositiveAccumulator, PublicKey as VbPublicKey,
    SetupParams,
};
use vb_accumulator::setup::SecretKey as VbSecretKey;

use crate::error::CryptoError;
use crate::hashing::hash_to_scalar;
use crate::scalar::random_nonzero_scalar;
use crate::serde_ark::ArkObjectBytes;

const PARAMS_LABEL: &[u8] = b"veil/accumulator-params/v1";
const ELEMENT_DOMAIN: &[u8] = b"veil/accumulator-element/v1";

/// Public generators `P`, `P̃` shared by every accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorParams(pub(crate) SetupParams<Bls12_381>);

impl AccumulatorParams {
    pub fn generate() -> Self {
        Self(SetupParams::<Bls12_381>::new::<Blake2b512>(PARAMS_LABEL))
    }

    pub fn p(&self) -> &G1Affine {
        &self.0.P
    }

    pub fn p_tilde(&self) -> &G2Affine {
        &self.0.P_tilde
    }
}

impl Default for AccumulatorParams {
    fn default() -> Self {
        Self::generate()
    }
}

/// Registry owner's trapdoor `α`.
#[derive(Clone)]
pub struct AccumulatorSecretKey(pub(crate) VbSecretKey<Fr>);

impl AccumulatorSecretKey {
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        Self(VbSecretKey(random_nonzero_scalar(rng)))
    }

    fn alpha(&self) -> Fr {
        self.0 .0
    }
}

impl fmt::Debug for AccumulatorSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccumulatorSecretKey(<redacted>)")
    }
}

/// `Q̃ = P̃·α`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorPublicKey(#[serde_as(as = "ArkObjectBytes")] pub(crate) VbPublicKey<Bls12_381>);

impl AccumulatorPublicKey {
    pub fn from_secret(secret_key: &AccumulatorSecretKey, params: &AccumulatorParams) -> Self {
        Self(VbPublicKey::new_from_secret_key(&secret_key.0, &params.0))
    }

    pub fn point(&self) -> &G2Affine {
        &self.0 .0
    }
}

/// Member element for a registry index, derived from the registry's public seed.
pub fn element_for_index(seed: &[u8], index: u32) -> Fr {
    let mut input = seed.to_vec();
    input.extend_from_slice(&index.to_le_bytes());
    hash_to_scalar(ELEMENT_DOMAIN, &input)
}

/// Coefficients, lowest degree first, of `∏ (X + root)`.
fn poly_from_roots(roots: &[Fr]) -> Vec<Fr> {
    let mut coefficients = Vec::with_capacity(roots.len() + 1);
    coefficients.push(Fr::one());
    for root in roots {
        coefficients.push(Fr::one());
        for k in (1..coefficients.len() - 1).rev() {
            let shifted = coefficients[k - 1];
            coefficients[k] = coefficients[k] * root + shifted;
        }
        coefficients[0] *= root;
    }
    coefficients
}

/// Accumulator value.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator(#[serde_as(as = "ArkObjectBytes")] pub G1Affine);

impl Accumulator {
    /// Value for `members`, computed with the trapdoor in O(|members|).
    pub fn from_members(
        secret_key: &AccumulatorSecretKey,
        params: &AccumulatorParams,
        members: &[Fr],
    ) -> Self {
        let product = members
            .iter()
            .fold(Fr::one(), |acc, member| acc * (*member + secret_key.alpha()));
        Self((*params.p() * product).into_affine())
    }

    /// Value for `members`, recomputed publicly from tails.
    pub fn from_tails(tails: &Tails, members: &[Fr]) -> Result<Self, CryptoError> {
        Ok(Self(tails.evaluate(&poly_from_roots(members))?))
    }

    pub fn value(&self) -> &G1Affine {
        &self.0
    }

    /// Witness for `member`, computed with the trapdoor.
    pub fn witness_with_secret(
        &self,
        secret_key: &AccumulatorSecretKey,
        member: &Fr,
    ) -> Result<MembershipWitness, CryptoError> {
        let exponent = (*member + secret_key.alpha()).inverse().ok_or_else(|| {
            CryptoError::InvalidInput("element is the negated trapdoor".into())
        })?;
        Ok(MembershipWitness((self.0 * exponent).into_affine()))
    }

    pub fn verify_membership(
        &self,
        member: &Fr,
        witness: &MembershipWitness,
        public_key: &AccumulatorPublicKey,
        params: &AccumulatorParams,
    ) -> bool {
        if witness.0.is_zero() {
            return false;
        }
        PositiveAccumulator::<G1Affine>(self.0).verify_membership(
            member,
            &witness.to_vb(),
            &public_key.0,
            &params.0,
        )
    }
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWitness(#[serde_as(as = "ArkObjectBytes")] pub G1Affine);

impl MembershipWitness {
    pub(crate) fn to_vb(self) -> VbWitness<G1Affine> {
        VbWitness(self.0)
    }
}

/// Powers `P·α^k` for `k = 0..=max`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tails {
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    powers: Vec<G1Affine>,
}

impl Tails {
    /// Tails able to serve a registry of `max` members.
    pub fn generate(
        secret_key: &AccumulatorSecretKey,
        params: &AccumulatorParams,
        max: u32,
    ) -> Self {
        let mut exponent = Fr::one();
        let mut projective = Vec::with_capacity(max as usize + 1);
        for _ in 0..=max {
            projective.push(*params.p() * exponent);
            exponent *= secret_key.alpha();
        }
        Self {
            powers: G1Projective::normalize_batch(&projective),
        }
    }

    /// Number of members these tails can serve.
    pub fn capacity(&self) -> usize {
        self.powers.len().saturating_sub(1)
    }

    fn evaluate(&self, coefficients: &[Fr]) -> Result<G1Affine, CryptoError> {
        if coefficients.len() > self.powers.len() {
            return Err(CryptoError::TailsTooShort {
                needed: coefficients.len(),
                available: self.powers.len(),
            });
        }
        Ok(
            G1Projective::msm_unchecked(&self.powers[..coefficients.len()], coefficients)
                .into_affine(),
        )
    }

    /// Witness for a member given every other member, without the trapdoor.
    pub fn witness(&self, others: &[Fr]) -> Result<MembershipWitness, CryptoError> {
        Ok(MembershipWitness(self.evaluate(&poly_from_roots(others))?))
    }

    /// BLAKE3 digest of the canonical encoding, hex encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for power in &self.powers {
            let mut bytes = Vec::with_capacity(power.compressed_size());
            power.serialize_compressed(&mut bytes).unwrap_or_default();
            hasher.update(&bytes);
        }
        hasher.finalize().to_hex().to_string()
    }
}
