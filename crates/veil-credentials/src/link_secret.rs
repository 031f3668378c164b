use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use veil_crypto::{random_nonzero_scalar, scalar_from_hex, scalar_to_hex, Scalar};

use crate::error::CredentialError;

/// Holder-private scalar that binds every credential issued to one holder.
///
/// Deliberately not `Serialize`: the only way out is [`LinkSecret::export_hex`],
/// meant for the holder's own storage.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LinkSecret(Scalar);

impl LinkSecret {
    pub fn new() -> Self {
        Self(random_nonzero_scalar(&mut rand::thread_rng()))
    }

    pub fn export_hex(&self) -> String {
        scalar_to_hex(&self.0)
    }

    pub fn import_hex(encoded: &str) -> Result<Self, CredentialError> {
        scalar_from_hex(encoded)
            .map(Self)
            .map_err(|e| CredentialError::InvalidLinkSecret(e.to_string()))
    }

    /// The raw scalar, for building commitments and proofs locally.
    pub fn value(&self) -> &Scalar {
        &self.0
    }
}

impl Default for LinkSecret {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LinkSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_secrets_differ() {
        assert_ne!(LinkSecret::new().value(), LinkSecret::new().value());
    }

    #[test]
    fn test_hex_export_roundtrip() {
        let secret = LinkSecret::new();
        let restored = LinkSecret::import_hex(&secret.export_hex()).unwrap();
        assert_eq!(restored.value(), secret.value());
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(
            LinkSecret::import_hex("not-hex"),
            Err(CredentialError::InvalidLinkSecret(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = LinkSecret::new();
        assert_eq!(format!("{:?}", secret), "LinkSecret(<redacted>)");
    }
}
