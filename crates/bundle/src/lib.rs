//! Observer Bundle
//!
//! Signs and packages reports as ANS-104 data items: the tagged, signed
//! payloads the bundling service appends to the ledger.

pub mod data_item;
pub mod deep_hash;
pub mod report;
pub mod tags;

pub use data_item::{DataItem, SignatureType};
pub use report::{create_report_data_item, report_tags, APP_NAME, APP_VERSION, COMPONENT};
pub use tags::Tag;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("report serialization failed: {0}")]
    Serialization(#[from] observer_core::ObserverError),
    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
    #[error("data item truncated at {0}")]
    Truncated(&'static str),
    #[error("unsupported signature type {0}")]
    UnsupportedSignatureType(u16),
    #[error("invalid presence byte {0} for {1}")]
    InvalidPresenceByte(u8, &'static str),
    #[error("malformed tags: {0}")]
    MalformedTags(&'static str),
    #[error("tag count mismatch: header {header}, decoded {decoded}")]
    TagCountMismatch { header: u64, decoded: usize },
    #[error("too many tags ({0}, max 128)")]
    TooManyTags(usize),
}

pub type Result<T> = std::result::Result<T, BundleError>;
