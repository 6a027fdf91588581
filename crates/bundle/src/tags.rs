//! Tag encoding.
//!
//! Tags are serialized with Avro's binary encoding of
//! `array<record { bytes name; bytes value; }>`: one block carrying the
//! element count followed by a zero terminator. An empty tag list encodes to
//! zero bytes.

use serde::{Deserialize, Serialize};

use crate::{BundleError, Result};

/// A `{name, value}` tag pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Avro-encode a tag list.
pub fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    let mut out = Vec::new();
    if tags.is_empty() {
        return out;
    }
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        write_bytes(&mut out, tag.name.as_bytes());
        write_bytes(&mut out, tag.value.as_bytes());
    }
    write_long(&mut out, 0);
    out
}

/// Decode an Avro-encoded tag list.
pub fn decode_tags(bytes: &[u8]) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    if bytes.is_empty() {
        return Ok(tags);
    }
    let mut pos = 0;
    loop {
        let mut count = read_long(bytes, &mut pos)?;
        if count == 0 {
            break;
        }
        if count < 0 {
            // Negative block count is followed by the block's byte size.
            read_long(bytes, &mut pos)?;
            count = count
                .checked_neg()
                .ok_or(BundleError::MalformedTags("block count"))?;
        }
        for _ in 0..count {
            let name = read_string(bytes, &mut pos)?;
            let value = read_string(bytes, &mut pos)?;
            tags.push(Tag { name, value });
        }
    }
    if pos != bytes.len() {
        return Err(BundleError::MalformedTags("trailing bytes"));
    }
    Ok(tags)
}

fn write_long(out: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z >= 0x80 {
        out.push((z as u8 & 0x7f) | 0x80);
        z >>= 7;
    }
    out.push(z as u8);
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

fn read_long(bytes: &[u8], pos: &mut usize) -> Result<i64> {
    let mut z: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or(BundleError::MalformedTags("truncated varint"))?;
        *pos += 1;
        if shift >= 64 {
            return Err(BundleError::MalformedTags("varint overflow"));
        }
        z |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(((z >> 1) as i64) ^ -((z & 1) as i64))
}

fn read_string(bytes: &[u8], pos: &mut usize) -> Result<String> {
    let len = usize::try_from(read_long(bytes, pos)?)
        .map_err(|_| BundleError::MalformedTags("negative length"))?;
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or(BundleError::MalformedTags("truncated string"))?;
    let s = std::str::from_utf8(&bytes[*pos..end])
        .map_err(|_| BundleError::MalformedTags("invalid utf-8"))?
        .to_string();
    *pos = end;
    Ok(s)
}
