use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::b64url;

/// The observer's wallet: an ed25519 keypair.
pub struct SigningKeypair {
    pub signing_key: SigningKey,
}

impl SigningKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a keypair from its 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Ledger address owned by this keypair.
    pub fn address(&self) -> String {
        address_from_owner(&self.public_key_bytes())
    }
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Arweave address for an owner public key: base64url(sha256(owner)).
pub fn address_from_owner(owner: &[u8]) -> String {
    b64url(&Sha256::digest(owner))
}
