//! Zero-knowledge proof that a hidden element is in an accumulator.
//!
//! Wraps the VB membership protocol of `vb_accumulator`. The response for the
//! element is `r_y + c·y`, so a signature proof sharing the blinding of the
//! same message proves the element is the signed one.

use ark_bls12_381::{Bls12_381, Fr, G1Affine};
use ark_std::rand::RngCore;
use blake2::Blake2b512;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use vb_accumulator::prelude::{
    MembershipProof as VbMembershipProof, MembershipProofProtocol as VbMembershipProtocol,
    MembershipProvingKey as VbProvingKey,
};

use crate::accumulator::{Accumulator, AccumulatorParams, AccumulatorPublicKey, MembershipWitness};
use crate::error::CryptoError;
use crate::serde_ark::ArkObjectBytes;
use crate::transcript::Transcript;

const PROVING_KEY_LABEL: &[u8] = b"veil/membership-proving-key/v1";

/// Independent generators used to hide the witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipProvingKey(VbProvingKey<G1Affine>);

impl MembershipProvingKey {
    pub fn generate() -> Self {
        Self(VbProvingKey::<G1Affine>::new::<Blake2b512>(PROVING_KEY_LABEL))
    }
}

impl Default for MembershipProvingKey {
    fn default() -> Self {
        Self::generate()
    }
}

/// Public context a membership proof is checked against.
pub struct MembershipStatement<'a> {
    pub accumulator: &'a Accumulator,
    pub public_key: &'a AccumulatorPublicKey,
    pub params: &'a AccumulatorParams,
    pub proving_key: &'a MembershipProvingKey,
}

pub struct MembershipProofProtocol(VbMembershipProtocol<Bls12_381>);

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof(#[serde_as(as = "ArkObjectBytes")] VbMembershipProof<Bls12_381>);

impl MembershipProofProtocol {
    /// Start a proof for `element` with witness `witness`.
    ///
    /// `element_blinding` must be the blinding the signature proof uses for
    /// the same message when the two are to be linked.
    pub fn init<R: RngCore>(
        rng: &mut R,
        element: Fr,
        element_blinding: Option<Fr>,
        witness: &MembershipWitness,
        statement: &MembershipStatement<'_>,
    ) -> Self {
        Self(VbMembershipProtocol::init(
            rng,
            element,
            element_blinding,
            &witness.to_vb(),
            &statement.public_key.0,
            &statement.params.0,
            &statement.proving_key.0,
        ))
    }

    pub fn challenge_contribution(
        &self,
        statement: &MembershipStatement<'_>,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        transcript.contribute(b"membership", |w| {
            self.0.challenge_contribution(
                statement.accumulator.value(),
                &statement.public_key.0,
                &statement.params.0,
                &statement.proving_key.0,
                w,
            )
        })?;
        Ok(())
    }

    pub fn gen_proof(self, challenge: &Fr) -> Result<MembershipProof, CryptoError> {
        Ok(MembershipProof(self.0.gen_proof(challenge)?))
    }
}

impl MembershipProof {
    pub fn challenge_contribution(
        &self,
        statement: &MembershipStatement<'_>,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        transcript.contribute(b"membership", |w| {
            self.0.challenge_contribution(
                statement.accumulator.value(),
                &statement.public_key.0,
                &statement.params.0,
                &statement.proving_key.0,
                w,
            )
        })?;
        Ok(())
    }

    /// Response for the hidden element.
    pub fn response_for_element(&self) -> Option<&Fr> {
        self.0.get_schnorr_response_for_element().into()
    }

    pub fn verify(&self, statement: &MembershipStatement<'_>, challenge: &Fr) -> bool {
        match self.0.verify(
            statement.accumulator.value(),
            challenge,
            statement.public_key.0.clone(),
            statement.params.0.clone(),
            &statement.proving_key.0,
        ) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = ?e, "membership proof rejected");
                false
            }
        }
    }
}
