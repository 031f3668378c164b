use ark_bls12_381::{Fr, G1Affine};
use blake2::Blake2b512;
use dock_crypto_utils::hashing_utils::{
    affine_group_elem_from_try_and_incr, field_elem_from_try_and_incr,
};

fn domain_input(domain: &[u8], data: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(domain.len() + data.len() + 16);
    input.extend_from_slice(&(domain.len() as u64).to_le_bytes());
    input.extend_from_slice(domain);
    input.extend_from_slice(&(data.len() as u64).to_le_bytes());
    input.extend_from_slice(data);
    input
}

/// Hash to a scalar by try-and-increment over Blake2b-512.
pub fn hash_to_scalar(domain: &[u8], data: &[u8]) -> Fr {
    field_elem_from_try_and_incr::<Fr, Blake2b512>(&domain_input(domain, data))
}

/// Hash to a G1 point by try-and-increment.
///
/// Nobody knows the discrete logarithm of the result with respect to any
/// other generator, which is what makes derived generators auditable.
pub fn hash_to_g1(domain: &[u8], data: &[u8]) -> G1Affine {
    affine_group_elem_from_try_and_incr::<G1Affine, Blake2b512>(&domain_input(domain, data))
}
