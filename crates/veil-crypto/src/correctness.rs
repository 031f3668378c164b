//! Proofs exchanged during issuance: the issuer shows it knows the key behind
//! a published verification key, the holder shows its blinded commitment
//! is well formed. Both are Schnorr proofs from `schnorr_pok`.

use ark_bls12_381::{Fr, G1Affine, G2Affine};
use ark_std::rand::RngCore;
use schnorr_pok::discrete_log::{
    PokDiscreteLog, PokDiscreteLogProtocol, PokPedersenCommitment as PokTwoDiscreteLogs,
    PokPedersenCommitmentProtocol as PokTwoDiscreteLogsProtocol,
};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::params::SignatureParams;
use crate::scalar::random_scalar;
use crate::signature::{PublicKey, SecretKey};
use crate::transcript::Transcript;

const KEY_PROOF_LABEL: &[u8] = b"veil/key-correctness/v1";
const BLINDED_PROOF_LABEL: &[u8] = b"veil/blinded-secret/v1";

/// Proof of knowledge of `x` with `w = g2·x`, bound to the generators and
/// to caller-supplied context such as attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCorrectnessProof(PokDiscreteLog<G2Affine>);

fn key_transcript(params: &SignatureParams, context: &[u8]) -> Transcript {
    let mut transcript = Transcript::new(KEY_PROOF_LABEL);
    transcript.append_message(b"label", params.label.as_bytes());
    transcript.append(b"params", &params.inner);
    transcript.append_message(b"context", context);
    transcript
}

impl KeyCorrectnessProof {
    pub fn create<R: RngCore>(
        rng: &mut R,
        secret_key: &SecretKey,
        public_key: &PublicKey,
        params: &SignatureParams,
        context: &[u8],
    ) -> Result<Self, CryptoError> {
        let protocol =
            PokDiscreteLogProtocol::init(*secret_key.scalar(), random_scalar(rng), params.g2());
        let mut transcript = key_transcript(params, context);
        transcript.contribute(b"key", |w| {
            protocol.challenge_contribution(params.g2(), public_key.point(), w)
        })?;
        Ok(Self(protocol.gen_proof(&transcript.challenge(b"challenge"))))
    }

    pub fn verify(&self, public_key: &PublicKey, params: &SignatureParams, context: &[u8]) -> bool {
        if !params.is_well_formed() {
            tracing::debug!(label = %params.label, "signature generators are not derived from their label");
            return false;
        }
        let mut transcript = key_transcript(params, context);
        if transcript
            .contribute(b"key", |w| {
                self.0.challenge_contribution(params.g2(), public_key.point(), w)
            })
            .is_err()
        {
            return false;
        }
        self.0.verify(
            public_key.point(),
            params.g2(),
            &transcript.challenge(b"challenge"),
        )
    }
}

/// Proof that a holder commitment `U = h_0·blinding + h_0'·secret` opens,
/// where `h_0'` is the generator of the hidden message at index 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedSecretProof(PokTwoDiscreteLogs<G1Affine>);

fn blinded_bases(params: &SignatureParams) -> Result<(&G1Affine, &G1Affine), CryptoError> {
    let secret_base = params.h(0).ok_or(CryptoError::MessageIndexOutOfRange {
        index: 0,
        count: params.message_count(),
    })?;
    Ok((params.h_0(), secret_base))
}

impl BlindedSecretProof {
    /// Commit to `secret` under `blinding` and prove the opening. Returns the
    /// commitment together with the proof.
    pub fn create<R: RngCore>(
        rng: &mut R,
        params: &SignatureParams,
        secret: &Fr,
        blinding: &Fr,
        context: &[u8],
    ) -> Result<(G1Affine, Self), CryptoError> {
        let (blinding_base, secret_base) = blinded_bases(params)?;
        let commitment = params.commit_blinded([(0usize, secret)], blinding)?;
        let protocol = PokTwoDiscreteLogsProtocol::init(
            *blinding,
            random_scalar(rng),
            blinding_base,
            *secret,
            random_scalar(rng),
            secret_base,
        );
        let mut transcript = Transcript::new(BLINDED_PROOF_LABEL);
        transcript.append_message(b"context", context);
        transcript.contribute(b"opening", |w| {
            protocol.challenge_contribution(blinding_base, secret_base, &commitment, w)
        })?;
        let proof = protocol.gen_proof(&transcript.challenge(b"challenge"));
        Ok((commitment, Self(proof)))
    }

    pub fn verify(&self, params: &SignatureParams, commitment: &G1Affine, context: &[u8]) -> bool {
        let Ok((blinding_base, secret_base)) = blinded_bases(params) else {
            return false;
        };
        let mut transcript = Transcript::new(BLINDED_PROOF_LABEL);
        transcript.append_message(b"context", context);
        if transcript
            .contribute(b"opening", |w| {
                self.0
                    .challenge_contribution(blinding_base, secret_base, commitment, w)
            })
            .is_err()
        {
            return false;
        }
        self.0.verify(
            commitment,
            blinding_base,
            secret_base,
            &transcript.challenge(b"challenge"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_correctness() {
        let mut rng = rand::thread_rng();
        let params = SignatureParams::generate("key-proof", 3).unwrap();
        let sk = SecretKey::generate(&mut rng);
        let pk = PublicKey::from_secret(&sk, &params);
        let proof = KeyCorrectnessProof::create(&mut rng, &sk, &pk, &params, b"name,age").unwrap();
        assert!(proof.verify(&pk, &params, b"name,age"));
        assert!(!proof.verify(&pk, &params, b"name"));

        let other = PublicKey::from_secret(&SecretKey::generate(&mut rng), &params);
        assert!(!proof.verify(&other, &params, b"name,age"));
    }

    #[test]
    fn test_key_correctness_rejects_substituted_generators() {
        let mut rng = rand::thread_rng();
        let params = SignatureParams::generate("key-proof", 2).unwrap();
        let sk = SecretKey::generate(&mut rng);
        let pk = PublicKey::from_secret(&sk, &params);
        let proof = KeyCorrectnessProof::create(&mut rng, &sk, &pk, &params, b"").unwrap();

        let mut tampered = params.clone();
        tampered.inner.h.swap(0, 1);
        assert!(!proof.verify(&pk, &tampered, b""));
    }

    #[test]
    fn test_blinded_secret() {
        let mut rng = rand::thread_rng();
        let params = SignatureParams::generate("blinded", 3).unwrap();
        let secret = random_scalar(&mut rng);
        let blinding = random_scalar(&mut rng);
        let (commitment, proof) =
            BlindedSecretProof::create(&mut rng, &params, &secret, &blinding, b"nonce-1").unwrap();
        assert!(proof.verify(&params, &commitment, b"nonce-1"));
        assert!(!proof.verify(&params, &commitment, b"nonce-2"));
    }

    #[test]
    fn test_blinded_secret_wrong_commitment() {
        let mut rng = rand::thread_rng();
        let params = SignatureParams::generate("blinded", 2).unwrap();
        let secret = random_scalar(&mut rng);
        let blinding = random_scalar(&mut rng);
        let (_, proof) =
            BlindedSecretProof::create(&mut rng, &params, &secret, &blinding, b"ctx").unwrap();
        let other = params
            .commit_blinded([(0usize, &random_scalar(&mut rng))], &blinding)
            .unwrap();
        assert!(!proof.verify(&params, &other, b"ctx"));
    }
}
