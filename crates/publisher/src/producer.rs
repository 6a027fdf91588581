//! Current-epoch report producer.
//!
//! Builds the report skeleton for whatever epoch the network is in right
//! now. Gateway assessment is not performed here; the payload carries an
//! empty `gatewayAssessments` object.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use observer_core::{ObserverError, ObserverReport, ReportProducer};
use observer_ledger::HeightSource;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Epoch grid of the observed network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSettings {
    pub epoch_zero_start_height: u64,
    pub epoch_blocks_length: u64,
}

impl EpochSettings {
    /// `(start, end)` heights of the epoch containing `height`, end inclusive.
    pub fn epoch_bounds(&self, height: u64) -> Result<(u64, u64), ObserverError> {
        if self.epoch_blocks_length == 0 {
            return Err(ObserverError::InvalidEpochLength);
        }
        if height < self.epoch_zero_start_height {
            return Err(ObserverError::BeforeEpochZero {
                height,
                epoch_zero: self.epoch_zero_start_height,
            });
        }
        let offset = height - self.epoch_zero_start_height;
        let start = align_to_epoch(offset, self.epoch_blocks_length) + self.epoch_zero_start_height;
        Ok((start, start + self.epoch_blocks_length - 1))
    }
}

/// Produces a report for the epoch the network is currently in.
pub struct EpochReportProducer {
    heights: Arc<dyn HeightSource>,
    epochs: EpochSettings,
    observer_address: String,
}

impl EpochReportProducer {
    pub fn new(
        heights: Arc<dyn HeightSource>,
        epochs: EpochSettings,
        observer_address: String,
    ) -> Self {
        Self {
            heights,
            epochs,
            observer_address,
        }
    }
}

#[async_trait]
impl ReportProducer for EpochReportProducer {
    async fn current_report(&self) -> Result<ObserverReport, ObserverError> {
        let height = self
            .heights
            .current_height()
            .await
            .map_err(|e| ObserverError::NetworkError(e.to_string()))?;
        let (start, end) = self.epochs.epoch_bounds(height)?;
        debug!(height, epoch_start_height = start, epoch_end_height = end, "generating report");

        let mut payload = Map::new();
        payload.insert("observerAddress".into(), Value::from(self.observer_address.as_str()));
        payload.insert("epochEndHeight".into(), Value::from(end));
        payload.insert("generatedAt".into(), Value::from(current_timestamp()));
        payload.insert("gatewayAssessments".into(), json!({}));
        Ok(ObserverReport::new(start, payload))
    }
}

/// Round `value` down to a multiple of `length`.
fn align_to_epoch(value: u64, length: u64) -> u64 {
    (value / length) * length
}

/// Current unix timestamp in seconds.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
