use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};

use crate::keys::SigningKeypair;

/// Sign data with the wallet keypair.
pub fn sign_data(keypair: &SigningKeypair, data: &[u8]) -> [u8; 64] {
    let signature: Signature = keypair.signing_key.sign(data);
    signature.to_bytes()
}

/// Verify an ed25519 signature. Malformed keys or signatures verify false.
pub fn verify_signature(owner: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(owner) = <[u8; 32]>::try_from(owner) else {
        return false;
    };
    let Ok(signature) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&owner) else {
        return false;
    };

    verifying_key
        .verify(data, &Signature::from_bytes(&signature))
        .is_ok()
}
