//! Observer Publisher
//!
//! Publishes each epoch's observer report to the ledger exactly once on a
//! best-effort basis: a read-before-write dedup check against the ledger's
//! tag index, then sign, package, and append. A scheduler drives report
//! production and publication on a fixed cadence.

pub mod config;
pub mod producer;
pub mod scheduler;
pub mod sink;

pub use config::ObserverConfig;
pub use producer::{EpochReportProducer, EpochSettings};
pub use scheduler::{ReportScheduler, REPORT_GENERATION_INTERVAL};
pub use sink::LedgerReportSink;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("packaging failed: {0}")]
    Packaging(#[from] observer_bundle::BundleError),
    #[error("ledger error: {0}")]
    Ledger(#[from] observer_ledger::LedgerError),
}
