//! Observer Ledger
//!
//! Clients for the content-addressed ledger the observer publishes to:
//! a gateway for tag-indexed reads, and a bundling service for appends and
//! upload credit. Each capability sits behind a trait so the publisher can
//! be driven against [`MemoryLedger`] or test fakes.

pub mod gateway;
pub mod memory;
pub mod turbo;

pub use gateway::GatewayClient;
pub use memory::MemoryLedger;
pub use turbo::TurboClient;

use async_trait::async_trait;
use observer_bundle::DataItem;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),
    #[error("ledger API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("ledger response parse error: {0}")]
    Parse(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Lookup of an already-published report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    /// Address of the publishing wallet.
    pub owner: String,
    pub app_name: String,
    pub epoch_start_height: u64,
}

/// Ledger response to an accepted upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub id: String,
    pub owner: String,
    #[serde(default)]
    pub data_caches: Vec<String>,
    #[serde(default)]
    pub fast_finality_indexes: Vec<String>,
}

/// Remaining prepaid upload credit, in winston credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub winc: String,
}

/// Tag-indexed reads.
#[async_trait]
pub trait ReportIndex: Send + Sync {
    /// Id of the earliest record matching `query`, if any.
    async fn first_report_tx_id(&self, query: &ReportQuery) -> Result<Option<String>>;
}

/// Appends of signed data items.
#[async_trait]
pub trait DataItemUploader: Send + Sync {
    async fn upload_signed_data_item(&self, item: &DataItem) -> Result<UploadReceipt>;
}

/// Upload credit of the publishing wallet.
#[async_trait]
pub trait BalanceReporter: Send + Sync {
    async fn balance(&self) -> Result<Balance>;
}

/// Current block height of the observed network.
#[async_trait]
pub trait HeightSource: Send + Sync {
    async fn current_height(&self) -> Result<u64>;
}
