use std::collections::BTreeMap;

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine};
use bbs_plus::prelude::SignatureParamsG1;
use blake2::Blake2b512;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::error::CryptoError;
use crate::serde_ark::ArkObjectBytes;

const GENERATOR_DOMAIN: &str = "veil/signature-params/v1";

/// Public generators of the BBS+ signature scheme.
///
/// All generators are hashed from `label`, so anyone can regenerate them and
/// confirm that no discrete-log relation between them is known.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParams {
    /// Public derivation label.
    pub label: String,
    #[serde_as(as = "ArkObjectBytes")]
    pub(crate) inner: SignatureParamsG1<Bls12_381>,
}

fn derive(label: &str, message_count: usize) -> Result<SignatureParamsG1<Bls12_381>, CryptoError> {
    let seed = format!("{}\0{}", GENERATOR_DOMAIN, label);
    let count = message_count.try_into().map_err(|_| {
        CryptoError::InvalidInput(format!("{} messages is too many", message_count))
    })?;
    Ok(SignatureParamsG1::<Bls12_381>::new::<Blake2b512>(
        seed.as_bytes(),
        count,
    ))
}

impl SignatureParams {
    /// Derive generators for `message_count` messages from `label`.
    pub fn generate(label: &str, message_count: usize) -> Result<Self, CryptoError> {
        if message_count == 0 {
            return Err(CryptoError::InvalidMessageCount {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self {
            label: label.to_string(),
            inner: derive(label, message_count)?,
        })
    }

    pub fn message_count(&self) -> usize {
        self.inner.h.len()
    }

    pub fn g2(&self) -> &G2Affine {
        &self.inner.g2
    }

    /// Generator for the signature blinding `s`.
    pub fn h_0(&self) -> &G1Affine {
        &self.inner.h_0
    }

    /// Generator for the message at `index`.
    pub fn h(&self, index: usize) -> Option<&G1Affine> {
        self.inner.h.get(index)
    }

    /// Whether every generator is the one `label` derives.
    pub fn is_well_formed(&self) -> bool {
        derive(&self.label, self.message_count()).is_ok_and(|expected| expected == self.inner)
    }

    /// Pedersen commitment `h_0·blinding + Σ h_i·m_i`.
    pub fn commit_blinded<'a>(
        &self,
        messages: impl IntoIterator<Item = (usize, &'a Fr)>,
        blinding: &Fr,
    ) -> Result<G1Affine, CryptoError> {
        let count = self.message_count();
        let mut indexed = BTreeMap::new();
        for (index, message) in messages {
            if index >= count {
                return Err(CryptoError::MessageIndexOutOfRange { index, count });
            }
            indexed.insert(index, message);
        }
        Ok(self.inner.commit_to_messages(indexed, blinding)?)
    }
}
