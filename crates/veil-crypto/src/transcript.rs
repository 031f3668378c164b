//! Fiat–Shamir transcript.
//!
//! Entries are collected as bytes and the challenge is the random-oracle
//! output of `schnorr_pok` over Blake2b-512, the way the BBS+ and
//! accumulator protocols derive their own challenges.

use ark_bls12_381::Fr;
use ark_serialize::CanonicalSerialize;
use blake2::Blake2b512;
use schnorr_pok::compute_random_oracle_challenge;

/// Accumulates the public statement and prover commitments of a
/// non-interactive proof and derives the challenge from them.
///
/// Every entry is labelled and length-prefixed so distinct sequences of
/// appends never collide.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    bytes: Vec<u8>,
}

impl Transcript {
    pub fn new(label: &[u8]) -> Self {
        let mut transcript = Self::default();
        transcript.append_message(b"dom-sep", label);
        transcript
    }

    pub fn append_message(&mut self, label: &[u8], message: &[u8]) {
        self.bytes.extend_from_slice(&(label.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(label);
        self.bytes.extend_from_slice(&(message.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(message);
    }

    pub fn append_u64(&mut self, label: &[u8], value: u64) {
        self.append_message(label, &value.to_le_bytes());
    }

    /// Append any curve point, field element or pairing output in its
    /// compressed canonical encoding.
    pub fn append<T: CanonicalSerialize>(&mut self, label: &[u8], item: &T) {
        let mut bytes = Vec::with_capacity(item.compressed_size());
        item.serialize_compressed(&mut bytes).unwrap_or_default();
        self.append_message(label, &bytes);
    }

    /// Append the challenge contribution a protocol writes into `write`.
    pub(crate) fn contribute<E>(
        &mut self,
        label: &[u8],
        write: impl FnOnce(&mut Vec<u8>) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut bytes = Vec::new();
        write(&mut bytes)?;
        self.append_message(label, &bytes);
        Ok(())
    }

    /// Derive the challenge for everything appended so far.
    pub fn challenge(&self, label: &[u8]) -> Fr {
        let mut bytes = self.bytes.clone();
        bytes.extend_from_slice(&(label.len() as u64).to_le_bytes());
        bytes.extend_from_slice(label);
        compute_random_oracle_challenge::<Fr, Blake2b512>(&bytes)
    }
}
