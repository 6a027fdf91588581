//! ANS-104 data items signed with ed25519.
//!
//! Binary layout (all integers little-endian):
//!
//! ```text
//! u16 signature type | signature | owner
//! u8 target present  | [32]?     | u8 anchor present | [32]?
//! u64 tag count      | u64 tag bytes length | tag bytes | data
//! ```
//!
//! The signature covers the deep hash of
//! `["dataitem", "1", type, owner, target, anchor, tag bytes, data]` and the
//! item id is `base64url(sha256(signature))`.

use observer_crypto::{address_from_owner, b64url, sign_data, verify_signature, SigningKeypair};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::deep_hash::{deep_hash, Chunk};
use crate::tags::{decode_tags, encode_tags, Tag};
use crate::{BundleError, Result};

const MAX_TAGS: usize = 128;

/// Signature schemes understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SignatureType {
    Ed25519 = 2,
}

impl SignatureType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            2 => Some(Self::Ed25519),
            _ => None,
        }
    }

    pub fn signature_len(&self) -> usize {
        match self {
            Self::Ed25519 => 64,
        }
    }

    pub fn owner_len(&self) -> usize {
        match self {
            Self::Ed25519 => 32,
        }
    }
}

/// A signed, tagged payload ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    signature_type: SignatureType,
    signature: Vec<u8>,
    owner: Vec<u8>,
    target: Option<[u8; 32]>,
    anchor: Option<[u8; 32]>,
    tags: Vec<Tag>,
    data: Vec<u8>,
}

impl DataItem {
    /// Build and sign a data item.
    ///
    /// A random anchor is attached so that signing identical data twice
    /// yields two distinct items.
    pub fn sign(keypair: &SigningKeypair, data: Vec<u8>, tags: Vec<Tag>) -> Result<Self> {
        if tags.len() > MAX_TAGS {
            return Err(BundleError::TooManyTags(tags.len()));
        }
        let mut anchor = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut anchor);

        let mut item = Self {
            signature_type: SignatureType::Ed25519,
            signature: Vec::new(),
            owner: keypair.public_key_bytes().to_vec(),
            target: None,
            anchor: Some(anchor),
            tags,
            data,
        };
        item.signature = sign_data(keypair, &item.signature_data()).to_vec();
        Ok(item)
    }

    /// Message the signature is computed over.
    pub fn signature_data(&self) -> [u8; 48] {
        let sig_type = (self.signature_type as u16).to_string();
        let tag_bytes = encode_tags(&self.tags);
        let target = self.target.as_ref().map(|t| t.as_slice()).unwrap_or_default();
        let anchor = self.anchor.as_ref().map(|a| a.as_slice()).unwrap_or_default();

        deep_hash(&Chunk::List(vec![
            Chunk::Blob(b"dataitem"),
            Chunk::Blob(b"1"),
            Chunk::Blob(sig_type.as_bytes()),
            Chunk::Blob(&self.owner),
            Chunk::Blob(target),
            Chunk::Blob(anchor),
            Chunk::Blob(&tag_bytes),
            Chunk::Blob(&self.data),
        ]))
    }

    pub fn verify(&self) -> bool {
        verify_signature(&self.owner, &self.signature_data(), &self.signature)
    }

    /// Permanent ledger id of this item.
    pub fn id(&self) -> String {
        b64url(&Sha256::digest(&self.signature))
    }

    /// Address of the signing wallet.
    pub fn owner_address(&self) -> String {
        address_from_owner(&self.owner)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn anchor(&self) -> Option<&[u8; 32]> {
        self.anchor.as_ref()
    }

    /// Serialize to the ANS-104 binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let tag_bytes = encode_tags(&self.tags);
        let len = 2
            + self.signature.len()
            + self.owner.len()
            + 66
            + 16
            + tag_bytes.len()
            + self.data.len();
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&(self.signature_type as u16).to_le_bytes());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.owner);
        write_optional(&mut out, self.target.as_ref());
        write_optional(&mut out, self.anchor.as_ref());
        out.extend_from_slice(&(self.tags.len() as u64).to_le_bytes());
        out.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(&tag_bytes);
        out.extend_from_slice(&self.data);
        out
    }

    /// Parse the ANS-104 binary layout. Does not verify the signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };

        let raw_type = u16::from_le_bytes(reader.array("signature type")?);
        let signature_type = SignatureType::from_u16(raw_type)
            .ok_or(BundleError::UnsupportedSignatureType(raw_type))?;
        let signature = reader.take(signature_type.signature_len(), "signature")?.to_vec();
        let owner = reader.take(signature_type.owner_len(), "owner")?.to_vec();
        let target = reader.optional("target")?;
        let anchor = reader.optional("anchor")?;

        let tag_count = u64::from_le_bytes(reader.array("tag count")?);
        let tag_len = u64::from_le_bytes(reader.array("tag length")?);
        let tag_len = usize::try_from(tag_len).map_err(|_| BundleError::Truncated("tags"))?;
        let tags = decode_tags(reader.take(tag_len, "tags")?)?;
        if tags.len() as u64 != tag_count {
            return Err(BundleError::TagCountMismatch {
                header: tag_count,
                decoded: tags.len(),
            });
        }
        let data = reader.rest().to_vec();

        Ok(Self {
            signature_type,
            signature,
            owner,
            target,
            anchor,
            tags,
            data,
        })
    }
}

fn write_optional(out: &mut Vec<u8>, value: Option<&[u8; 32]>) {
    match value {
        Some(bytes) => {
            out.push(1);
            out.extend_from_slice(bytes);
        }
        None => out.push(0),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(BundleError::Truncated(field))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn optional(&mut self, field: &'static str) -> Result<Option<[u8; 32]>> {
        match self.array::<1>(field)?[0] {
            0 => Ok(None),
            1 => Ok(Some(self.array(field)?)),
            other => Err(BundleError::InvalidPresenceByte(other, field)),
        }
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(keypair: &SigningKeypair) -> DataItem {
        DataItem::sign(
            keypair,
            b"payload".to_vec(),
            vec![Tag::new("App-Name", "AR-IO Observer"), Tag::new("k", "v")],
        )
        .unwrap()
    }

    #[test]
    fn test_signed_item_verifies() {
        let keypair = SigningKeypair::generate();
        let item = sample_item(&keypair);
        assert!(item.verify());
        assert_eq!(item.owner_address(), keypair.address());
        assert_eq!(item.id().len(), 43);
    }

    #[test]
    fn test_tampered_item_fails_verification() {
        let keypair = SigningKeypair::generate();
        let mut item = sample_item(&keypair);
        item.data = b"other payload".to_vec();
        assert!(!item.verify());
    }

    #[test]
    fn test_each_signing_gets_fresh_anchor_and_id() {
        let keypair = SigningKeypair::generate();
        let a = sample_item(&keypair);
        let b = sample_item(&keypair);
        assert_ne!(a.anchor(), b.anchor());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_binary_layout_parses_back() {
        let keypair = SigningKeypair::generate();
        let item = sample_item(&keypair);
        let bytes = item.to_bytes();

        assert_eq!(&bytes[..2], &2u16.to_le_bytes());
        let parsed = DataItem::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, item);
        assert!(parsed.verify());
        assert_eq!(parsed.id(), item.id());
    }

    #[test]
    fn test_truncated_bytes_rejected() {
        let keypair = SigningKeypair::generate();
        let bytes = sample_item(&keypair).to_bytes();
        assert!(matches!(
            DataItem::from_bytes(&bytes[..50]),
            Err(BundleError::Truncated(_))
        ));
    }

    #[test]
    fn test_unknown_signature_type_rejected() {
        let mut bytes = sample_item(&SigningKeypair::generate()).to_bytes();
        bytes[0] = 1;
        assert!(matches!(
            DataItem::from_bytes(&bytes),
            Err(BundleError::UnsupportedSignatureType(1))
        ));
    }

    #[test]
    fn test_too_many_tags() {
        let keypair = SigningKeypair::generate();
        let tags = (0..129).map(|i| Tag::new(format!("t{i}"), "v")).collect();
        assert!(matches!(
            DataItem::sign(&keypair, vec![], tags),
            Err(BundleError::TooManyTags(129))
        ));
    }
}
