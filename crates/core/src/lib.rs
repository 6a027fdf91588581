//! Observer Core
//!
//! Report types, errors, and the producer/sink traits shared by every
//! observer crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors surfaced by report producers.
#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Height {height} is before epoch zero ({epoch_zero})")]
    BeforeEpochZero { height: u64, epoch_zero: u64 },
    #[error("Invalid epoch length")]
    InvalidEpochLength,
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Block height of the first block in an epoch.
pub type EpochStartHeight = u64;

/// Observation report for a single epoch.
///
/// `epoch_start_height` is the report's identity. Everything else is an
/// opaque payload that is flattened into the serialized object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverReport {
    epoch_start_height: EpochStartHeight,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl ObserverReport {
    pub fn new(epoch_start_height: EpochStartHeight, mut payload: Map<String, Value>) -> Self {
        // A payload key shadowing the identity field would serialize twice.
        payload.remove("epochStartHeight");
        Self {
            epoch_start_height,
            payload,
        }
    }

    pub fn epoch_start_height(&self) -> EpochStartHeight {
        self.epoch_start_height
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Canonical JSON encoding of the full report.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ObserverError> {
        serde_json::to_vec(self).map_err(|e| ObserverError::SerializationError(e.to_string()))
    }
}

/// A report plus its publication metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInfo {
    pub report: ObserverReport,
    /// Ledger transaction id, set once the report is known to be on the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_tx_id: Option<String>,
}

impl ReportInfo {
    pub fn new(report: ObserverReport) -> Self {
        Self {
            report,
            report_tx_id: None,
        }
    }

    pub fn with_tx_id(self, report_tx_id: impl Into<String>) -> Self {
        Self {
            report_tx_id: Some(report_tx_id.into()),
            ..self
        }
    }

    pub fn epoch_start_height(&self) -> EpochStartHeight {
        self.report.epoch_start_height()
    }
}

/// Produces the report for the current epoch on demand.
#[async_trait]
pub trait ReportProducer: Send + Sync {
    async fn current_report(&self) -> Result<ObserverReport, ObserverError>;
}

/// Durably stores reports.
///
/// Returns the input annotated with its ledger id, or `None` when the report
/// could not be stored. Callers own any retry policy.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save_report(&self, report_info: ReportInfo) -> Option<ReportInfo>;
}
