//! Proof of knowledge of a BBS+ signature with selective disclosure.
//!
//! Responses for hidden messages are `ρ_i + c·m_i`, so other proofs sharing
//! the challenge can show equality with a hidden message by reusing its
//! blinding.

use std::collections::{BTreeMap, BTreeSet};

use ark_bls12_381::{Bls12_381, Fr};
use ark_std::rand::RngCore;
use bbs_plus::prelude::{PoKOfSignatureG1Proof, PoKOfSignatureG1Protocol};
use dock_crypto_utils::signature::MessageOrBlinding;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::error::CryptoError;
use crate::params::SignatureParams;
use crate::serde_ark::ArkObjectBytes;
use crate::signature::{PublicKey, Signature};
use crate::transcript::Transcript;

pub struct PokSignatureProtocol(PoKOfSignatureG1Protocol<Bls12_381>);

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokSignatureProof(#[serde_as(as = "ArkObjectBytes")] PoKOfSignatureG1Proof<Bls12_381>);

impl PokSignatureProtocol {
    /// Start a proof for `signature` over `messages`, disclosing the indices
    /// in `revealed`.
    ///
    /// `blindings` fixes the blinding of selected hidden messages; every
    /// other hidden message gets a fresh one.
    pub fn init<R: RngCore>(
        rng: &mut R,
        signature: &Signature,
        params: &SignatureParams,
        messages: &[Fr],
        revealed: &BTreeSet<usize>,
        mut blindings: BTreeMap<usize, Fr>,
    ) -> Result<Self, CryptoError> {
        let count = params.message_count();
        if messages.len() != count {
            return Err(CryptoError::InvalidMessageCount {
                expected: count,
                actual: messages.len(),
            });
        }
        if let Some(index) = revealed.iter().find(|i| **i >= count) {
            return Err(CryptoError::MessageIndexOutOfRange {
                index: *index,
                count,
            });
        }
        if let Some(index) = blindings.keys().find(|i| revealed.contains(i) || **i >= count) {
            return Err(CryptoError::InvalidInput(format!(
                "blinding supplied for message {} which is not hidden",
                index
            )));
        }

        let messages_and_blindings = messages.iter().enumerate().map(|(index, message)| {
            if revealed.contains(&index) {
                MessageOrBlinding::RevealMessage(message)
            } else if let Some(blinding) = blindings.remove(&index) {
                MessageOrBlinding::BlindMessageWithConcreteBlinding { message, blinding }
            } else {
                MessageOrBlinding::BlindMessageRandomly(message)
            }
        });
        Ok(Self(PoKOfSignatureG1Protocol::init(
            rng,
            &signature.0,
            &params.inner,
            messages_and_blindings,
        )?))
    }

    pub fn challenge_contribution(
        &self,
        revealed: &BTreeMap<usize, Fr>,
        params: &SignatureParams,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        transcript.contribute(b"signature_pok", |w| {
            self.0.challenge_contribution(revealed, &params.inner, w)
        })?;
        Ok(())
    }

    pub fn gen_proof(self, challenge: &Fr) -> Result<PokSignatureProof, CryptoError> {
        Ok(PokSignatureProof(self.0.gen_proof(challenge)?))
    }
}

impl PokSignatureProof {
    pub fn challenge_contribution(
        &self,
        revealed: &BTreeMap<usize, Fr>,
        params: &SignatureParams,
        transcript: &mut Transcript,
    ) -> Result<(), CryptoError> {
        transcript.contribute(b"signature_pok", |w| {
            self.0.challenge_contribution(revealed, &params.inner, w)
        })?;
        Ok(())
    }

    /// Response for a hidden message, for equality checks with other proofs.
    pub fn response_for_message(&self, index: usize, revealed: &BTreeSet<usize>) -> Option<&Fr> {
        self.0.get_resp_for_message(index, revealed).ok()
    }

    pub fn verify(
        &self,
        revealed: &BTreeMap<usize, Fr>,
        challenge: &Fr,
        public_key: &PublicKey,
        params: &SignatureParams,
    ) -> bool {
        if revealed.keys().any(|i| *i >= params.message_count()) {
            return false;
        }
        match self
            .0
            .verify(revealed, challenge, public_key.0.clone(), params.inner.clone())
        {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = ?e, "signature proof rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::random_scalar;
    use crate::signature::SecretKey;

    struct Fixture {
        params: SignatureParams,
        pk: PublicKey,
        messages: Vec<Fr>,
        signature: Signature,
    }

    fn fixture() -> Fixture {
        let mut rng = rand::thread_rng();
        let params = SignatureParams::generate("pok-tests", 5).unwrap();
        let sk = SecretKey::generate(&mut rng);
        let pk = PublicKey::from_secret(&sk, &params);
        let messages: Vec<Fr> = (0..5).map(|_| random_scalar(&mut rng)).collect();
        let signature = Signature::new(&mut rng, &messages, &sk, &params).unwrap();
        Fixture {
            params,
            pk,
            messages,
            signature,
        }
    }

    fn prove(f: &Fixture, revealed: &BTreeSet<usize>) -> (PokSignatureProof, Fr) {
        let mut rng = rand::thread_rng();
        let protocol = PokSignatureProtocol::init(
            &mut rng,
            &f.signature,
            &f.params,
            &f.messages,
            revealed,
            BTreeMap::new(),
        )
        .unwrap();
        let disclosed = disclosed(f, revealed);
        let mut transcript = Transcript::new(b"pok-sig-test");
        protocol
            .challenge_contribution(&disclosed, &f.params, &mut transcript)
            .unwrap();
        let c = transcript.challenge(b"c");
        (protocol.gen_proof(&c).unwrap(), c)
    }

    fn disclosed(f: &Fixture, revealed: &BTreeSet<usize>) -> BTreeMap<usize, Fr> {
        revealed.iter().map(|i| (*i, f.messages[*i])).collect()
    }

    fn recompute(f: &Fixture, proof: &PokSignatureProof, disclosed: &BTreeMap<usize, Fr>) -> Fr {
        let mut transcript = Transcript::new(b"pok-sig-test");
        proof
            .challenge_contribution(disclosed, &f.params, &mut transcript)
            .unwrap();
        transcript.challenge(b"c")
    }

    #[test]
    fn test_selective_disclosure() {
        let f = fixture();
        let revealed: BTreeSet<usize> = [1, 3].into_iter().collect();
        let (proof, c) = prove(&f, &revealed);
        let disclosed = disclosed(&f, &revealed);
        assert_eq!(recompute(&f, &proof, &disclosed), c);
        assert!(proof.verify(&disclosed, &c, &f.pk, &f.params));
        assert!(proof.response_for_message(0, &revealed).is_some());
        assert!(proof.response_for_message(1, &revealed).is_none());
    }

    #[test]
    fn test_nothing_revealed() {
        let f = fixture();
        let (proof, c) = prove(&f, &BTreeSet::new());
        assert!(proof.verify(&BTreeMap::new(), &c, &f.pk, &f.params));
    }

    #[test]
    fn test_wrong_revealed_value_fails() {
        let f = fixture();
        let revealed: BTreeSet<usize> = [2].into_iter().collect();
        let (proof, c) = prove(&f, &revealed);
        let mut forged = disclosed(&f, &revealed);
        forged.insert(2, f.messages[2] + Fr::from(1u64));
        assert!(!proof.verify(&forged, &c, &f.pk, &f.params));
    }

    #[test]
    fn test_wrong_key_fails() {
        let f = fixture();
        let (proof, c) = prove(&f, &BTreeSet::new());
        let other = PublicKey::from_secret(&SecretKey::generate(&mut rand::thread_rng()), &f.params);
        assert!(!proof.verify(&BTreeMap::new(), &c, &other, &f.params));
    }

    #[test]
    fn test_wrong_challenge_fails() {
        let f = fixture();
        let (proof, c) = prove(&f, &BTreeSet::new());
        assert!(!proof.verify(&BTreeMap::new(), &(c + Fr::from(1u64)), &f.pk, &f.params));
    }

    #[test]
    fn test_missing_disclosed_message_fails() {
        let f = fixture();
        let revealed: BTreeSet<usize> = [0].into_iter().collect();
        let (proof, c) = prove(&f, &revealed);
        assert!(!proof.verify(&BTreeMap::new(), &c, &f.pk, &f.params));
    }

    #[test]
    fn test_shared_blinding_gives_shared_response() {
        let f = fixture();
        let mut rng = rand::thread_rng();
        let blinding = random_scalar(&mut rng);
        let c = Fr::from(7u64);
        let hidden = BTreeSet::new();
        let proofs: Vec<PokSignatureProof> = (0..2)
            .map(|_| {
                PokSignatureProtocol::init(
                    &mut rng,
                    &f.signature,
                    &f.params,
                    &f.messages,
                    &hidden,
                    BTreeMap::from([(0, blinding)]),
                )
                .unwrap()
                .gen_proof(&c)
                .unwrap()
            })
            .collect();
        assert_eq!(
            proofs[0].response_for_message(0, &hidden),
            proofs[1].response_for_message(0, &hidden)
        );
        assert_ne!(
            proofs[0].response_for_message(1, &hidden),
            proofs[1].response_for_message(1, &hidden)
        );
        assert_ne!(proofs[0], proofs[1]);
    }

    #[test]
    fn test_blinding_for_revealed_rejected() {
        let f = fixture();
        let revealed: BTreeSet<usize> = [0].into_iter().collect();
        let result = PokSignatureProtocol::init(
            &mut rand::thread_rng(),
            &f.signature,
            &f.params,
            &f.messages,
            &revealed,
            BTreeMap::from([(0, Fr::from(1u64))]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let f = fixture();
        let revealed: BTreeSet<usize> = [4].into_iter().collect();
        let (proof, c) = prove(&f, &revealed);
        let json = serde_json::to_string(&proof).unwrap();
        let back: PokSignatureProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
        assert!(back.verify(&disclosed(&f, &revealed), &c, &f.pk, &f.params));
    }
}
