//! Proof that a hidden signed message satisfies an integer bound.
//!
//! The prover commits to `Δ = ±m + offset` bit by bit (`C_k = G·b_k + H·r_k`),
//! shows each `b_k ∈ {0, 1}` with a two-branch OR of discrete-log proofs, and
//! links `Σ 2^k·C_k - G·offset = (±G)·m + H·Σ 2^k·r_k` with a proof of two
//! discrete logs whose response for `m` is `ρ_m + c·m`. Reusing the signature
//! proof's blinding for `m` ties the bound to the signed value, and
//! `Δ < 2^32` with `Δ ≥ 0` is what the predicate needs.

use ark_bls12_381::{Fr, G1Affine, G1Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_std::{rand::RngCore, Zero};
use schnorr_pok::discrete_log::{
    PokDiscreteLog, PokDiscreteLogProtocol, PokPedersenCommitment as PokTwoDiscreteLogs,
    PokPedersenCommitmentProtocol as PokTwoDiscreteLogsProtocol,
};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::error::CryptoError;
use crate::hashing::hash_to_g1;
use crate::scalar::random_scalar;
use crate::serde_ark::ArkObjectBytes;
use crate::transcript::Transcript;

/// Width of the decomposed difference.
pub const BOUND_BITS: usize = 32;

const GENERATOR_DOMAIN: &[u8] = b"veil/bound-generators/v1";

/// Pedersen generators for the bit commitments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundGenerators {
    pub g: G1Affine,
    pub h: G1Affine,
}

impl BoundGenerators {
    pub fn generate() -> Self {
        Self {
            g: hash_to_g1(GENERATOR_DOMAIN, b"G"),
            h: hash_to_g1(GENERATOR_DOMAIN, b"H"),
        }
    }

    /// Targets of the `b = 0` and `b = 1` branches: `C` and `C - G`.
    fn branch_targets(&self, commitment: &G1Affine) -> [G1Affine; 2] {
        [*commitment, (commitment.into_group() - self.g).into_affine()]
    }
}

impl Default for BoundGenerators {
    fn default() -> Self {
        Self::generate()
    }
}

/// `Δ = m + offset`, or `Δ = -m + offset` when `negate` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundStatement {
    pub negate: bool,
    pub offset: Fr,
}

impl BoundStatement {
    fn append(&self, transcript: &mut Transcript) {
        transcript.append_u64(b"negate", self.negate as u64);
        transcript.append(b"offset", &self.offset);
    }

    fn value_base(&self, gens: &BoundGenerators) -> G1Affine {
        if self.negate {
            (-gens.g.into_group()).into_affine()
        } else {
            gens.g
        }
    }

    /// `Σ 2^k·C_k - G·offset`.
    fn link_target<'a>(
        &self,
        commitments: impl Iterator<Item = &'a G1Affine>,
        gens: &BoundGenerators,
    ) -> G1Affine {
        let mut target = G1Projective::zero();
        for (k, commitment) in commitments.enumerate() {
            target += *commitment * Fr::from(1u64 << k);
        }
        (target - gens.g * self.offset).into_affine()
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitProof {
    #[serde_as(as = "ArkObjectBytes")]
    pub commitment: G1Affine,
    pub zero: PokDiscreteLog<G1Affine>,
    pub one: PokDiscreteLog<G1Affine>,
    /// Challenge share of the `b = 0` branch; the other is `c - c0`.
    #[serde_as(as = "ArkObjectBytes")]
    pub c0: Fr,
}

impl BitProof {
    fn challenge_contribution(
        &self,
        gens: &BoundGenerators,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        let [zero_target, one_target] = gens.branch_targets(&self.commitment);
        transcript.contribute(b"bit", |w| {
            self.zero.challenge_contribution(&gens.h, &zero_target, &mut *w)?;
            self.one.challenge_contribution(&gens.h, &one_target, w)
        })?;
        Ok(())
    }

    fn verify(&self, gens: &BoundGenerators, challenge: &Fr) -> bool {
        let [zero_target, one_target] = gens.branch_targets(&self.commitment);
        self.zero.verify(&zero_target, &gens.h, &self.c0)
            && self.one.verify(&one_target, &gens.h, &(*challenge - self.c0))
    }
}

/// One bit: the branch matching the bit is proven, the other is simulated
/// with a challenge share picked in advance.
struct BitState {
    bit: bool,
    commitment: G1Affine,
    real: PokDiscreteLogProtocol<G1Affine>,
    simulated: PokDiscreteLog<G1Affine>,
    simulated_challenge: Fr,
}

impl BitState {
    fn new<R: RngCore>(rng: &mut R, bit: bool, blinding: Fr, gens: &BoundGenerators) -> Self {
        let commitment = if bit {
            (gens.h * blinding + gens.g).into_affine()
        } else {
            (gens.h * blinding).into_affine()
        };
        let targets = gens.branch_targets(&commitment);
        let simulated_target = targets[usize::from(!bit)];
        let simulated_challenge = random_scalar(rng);
        let response = random_scalar(rng);
        let simulated = PokDiscreteLog {
            t: (gens.h * response - simulated_target * simulated_challenge).into_affine(),
            response,
        };
        Self {
            bit,
            commitment,
            real: PokDiscreteLogProtocol::init(blinding, random_scalar(rng), &gens.h),
            simulated,
            simulated_challenge,
        }
    }

    fn challenge_contribution(
        &self,
        gens: &BoundGenerators,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        let [zero_target, one_target] = gens.branch_targets(&self.commitment);
        transcript.contribute(b"bit", |w| {
            if self.bit {
                self.simulated
                    .challenge_contribution(&gens.h, &zero_target, &mut *w)?;
                self.real.challenge_contribution(&gens.h, &one_target, w)
            } else {
                self.real
                    .challenge_contribution(&gens.h, &zero_target, &mut *w)?;
                self.simulated.challenge_contribution(&gens.h, &one_target, w)
            }
        })?;
        Ok(())
    }

    fn gen_proof(self, challenge: &Fr) -> BitProof {
        let real_challenge = *challenge - self.simulated_challenge;
        let real = self.real.gen_proof(&real_challenge);
        let (zero, one, c0) = if self.bit {
            (self.simulated, real, self.simulated_challenge)
        } else {
            (real, self.simulated, real_challenge)
        };
        BitProof {
            commitment: self.commitment,
            zero,
            one,
            c0,
        }
    }
}

pub struct BoundProofProtocol {
    statement: BoundStatement,
    bits: Vec<BitState>,
    link_target: G1Affine,
    link: PokTwoDiscreteLogsProtocol<G1Affine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundProof {
    pub bits: Vec<BitProof>,
    pub link: PokTwoDiscreteLogs<G1Affine>,
}

impl BoundProofProtocol {
    /// Start a proof that `delta` (which must equal `±value + offset`) lies
    /// in `[0, 2^BOUND_BITS)`.
    pub fn init<R: RngCore>(
        rng: &mut R,
        value: Fr,
        value_blinding: Fr,
        delta: u64,
        statement: BoundStatement,
        gens: &BoundGenerators,
    ) -> Result<Self, CryptoError> {
        if delta >> BOUND_BITS != 0 {
            return Err(CryptoError::InvalidInput(format!(
                "difference {} does not fit in {} bits",
                delta, BOUND_BITS
            )));
        }
        let signed = if statement.negate { -value } else { value };
        if signed + statement.offset != Fr::from(delta) {
            return Err(CryptoError::InvalidInput(
                "difference does not match the bound statement".into(),
            ));
        }

        let mut bits = Vec::with_capacity(BOUND_BITS);
        let mut link_blinding = Fr::zero();
        for k in 0..BOUND_BITS {
            let blinding = random_scalar(rng);
            link_blinding += Fr::from(1u64 << k) * blinding;
            bits.push(BitState::new(rng, (delta >> k) & 1 == 1, blinding, gens));
        }

        let link_target = statement.link_target(bits.iter().map(|b| &b.commitment), gens);
        let link = PokTwoDiscreteLogsProtocol::init(
            value,
            value_blinding,
            &statement.value_base(gens),
            link_blinding,
            random_scalar(rng),
            &gens.h,
        );

        Ok(Self {
            statement,
            bits,
            link_target,
            link,
        })
    }

    pub fn challenge_contribution(
        &self,
        gens: &BoundGenerators,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        self.statement.append(transcript);
        for bit in &self.bits {
            bit.challenge_contribution(gens, transcript)?;
        }
        let value_base = self.statement.value_base(gens);
        transcript.contribute(b"link", |w| {
            self.link
                .challenge_contribution(&value_base, &gens.h, &self.link_target, w)
        })?;
        Ok(())
    }

    pub fn gen_proof(self, challenge: &Fr) -> BoundProof {
        BoundProof {
            bits: self
                .bits
                .into_iter()
                .map(|bit| bit.gen_proof(challenge))
                .collect(),
            link: self.link.gen_proof(challenge),
        }
    }
}

impl BoundProof {
    pub fn challenge_contribution(
        &self,
        statement: &BoundStatement,
        gens: &BoundGenerators,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        statement.append(transcript);
        for bit in &self.bits {
            bit.challenge_contribution(gens, transcript)?;
        }
        let value_base = statement.value_base(gens);
        let target = statement.link_target(self.bits.iter().map(|b| &b.commitment), gens);
        transcript.contribute(b"link", |w| {
            self.link
                .challenge_contribution(&value_base, &gens.h, &target, w)
        })?;
        Ok(())
    }

    /// Response for the hidden value, for equality with the signature proof.
    pub fn response_for_value(&self) -> &Fr {
        &self.link.response1
    }

    pub fn verify(
        &self,
        statement: &BoundStatement,
        challenge: &Fr,
        gens: &BoundGenerators,
    ) -> bool {
        if self.bits.len() != BOUND_BITS {
            return false;
        }
        if !self.bits.iter().all(|bit| bit.verify(gens, challenge)) {
            return false;
        }
        let target = statement.link_target(self.bits.iter().map(|b| &b.commitment), gens);
        self.link
            .verify(&target, &statement.value_base(gens), &gens.h, challenge)
    }
}
