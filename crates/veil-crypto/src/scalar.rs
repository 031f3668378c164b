use ark_bls12_381::Fr;
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{rand::RngCore, UniformRand, Zero};
use num_bigint::BigUint;

use crate::error::CryptoError;

/// Uniformly random scalar.
pub fn random_scalar<R: RngCore>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}

/// Uniformly random non-zero scalar.
pub fn random_nonzero_scalar<R: RngCore>(rng: &mut R) -> Fr {
    loop {
        let value = Fr::rand(rng);
        if !value.is_zero() {
            return value;
        }
    }
}

/// Signed integer as a scalar; negative values map to their additive inverse.
pub fn scalar_from_i64(value: i64) -> Fr {
    let magnitude = Fr::from(value.unsigned_abs());
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Scalar for a decimal-encoded attribute value.
pub fn scalar_from_encoded(encoded: &str) -> Result<Fr, CryptoError> {
    if let Ok(value) = encoded.parse::<i64>() {
        return Ok(scalar_from_i64(value));
    }
    let value = BigUint::parse_bytes(encoded.as_bytes(), 10).ok_or_else(|| {
        CryptoError::InvalidInput(format!("not a decimal attribute encoding: {}", encoded))
    })?;
    Ok(Fr::from_le_bytes_mod_order(&value.to_bytes_le()))
}

/// Hex of the compressed canonical encoding.
pub fn scalar_to_hex(value: &Fr) -> String {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    // Writing into a Vec cannot fail.
    let _ = value.serialize_compressed(&mut bytes);
    hex::encode(bytes)
}

pub fn scalar_from_hex(encoded: &str) -> Result<Fr, CryptoError> {
    let bytes = hex::decode(encoded).map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    Fr::deserialize_compressed(bytes.as_slice())
        .map_err(|e| CryptoError::InvalidInput(format!("not a canonical scalar: {}", e)))
}
