//! Observer Crypto
//!
//! ed25519 signing identity for the observer wallet, plus the base64url
//! helpers used by Arweave-style addresses and ids.

pub mod keys;
pub mod sign;

pub use keys::{address_from_owner, SigningKeypair};
pub use sign::{sign_data, verify_signature};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encode bytes as unpadded base64url.
pub fn b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url.
pub fn b64url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(s)
}
