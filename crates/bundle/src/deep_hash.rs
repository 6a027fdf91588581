//! Arweave deep hash (SHA-384) over nested byte chunks.

use sha2::{Digest, Sha384};

/// Input to [`deep_hash`]: a blob or a list of nested chunks.
pub enum Chunk<'a> {
    Blob(&'a [u8]),
    List(Vec<Chunk<'a>>),
}

pub fn deep_hash(chunk: &Chunk<'_>) -> [u8; 48] {
    match chunk {
        Chunk::Blob(data) => {
            let tag = sha384(&[format!("blob{}", data.len()).as_bytes()]);
            sha384(&[&tag, &sha384(&[*data])])
        }
        Chunk::List(items) => {
            let mut acc = sha384(&[format!("list{}", items.len()).as_bytes()]);
            for item in items {
                acc = sha384(&[&acc, &deep_hash(item)]);
            }
            acc
        }
    }
}

fn sha384(parts: &[&[u8]]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 48];
    out.copy_from_slice(&hasher.finalize());
    out
}
