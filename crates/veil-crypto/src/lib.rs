pub mod accumulator;
pub mod bound;
pub mod correctness;
pub mod error;
pub mod hashing;
pub mod membership;
pub mod params;
pub mod pok_signature;
pub mod scalar;
pub mod serde_ark;
pub mod signature;
pub mod transcript;

pub use ark_bls12_381::{Fr as Scalar, G1Affine};

pub use accumulator::{
    element_for_index, Accumulator, AccumulatorParams, AccumulatorPublicKey,
    AccumulatorSecretKey, MembershipWitness, Tails,
};
pub use bound::{BitProof, BoundGenerators, BoundProof, BoundProofProtocol, BoundStatement, BOUND_BITS};
pub use correctness::{BlindedSecretProof, KeyCorrectnessProof};
pub use error::CryptoError;
pub use hashing::{hash_to_g1, hash_to_scalar};
pub use membership::{
    MembershipProof, MembershipProofProtocol, MembershipProvingKey, MembershipStatement,
};
pub use params::SignatureParams;
pub use pok_signature::{PokSignatureProof, PokSignatureProtocol};
pub use scalar::{
    random_nonzero_scalar, random_scalar, scalar_from_encoded, scalar_from_hex, scalar_from_i64,
    scalar_to_hex,
};
pub use serde_ark::ArkObjectBytes;
pub use signature::{PublicKey, SecretKey, Signature};
pub use transcript::Transcript;
