//! In-memory ledger for dry runs and tests. Records every uploaded item.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use observer_bundle::report::{TAG_APP_NAME, TAG_EPOCH_START_HEIGHT};
use observer_bundle::{DataItem, APP_NAME};
use tracing::info;

use crate::{
    Balance, BalanceReporter, DataItemUploader, HeightSource, LedgerError, ReportIndex,
    ReportQuery, Result, UploadReceipt,
};

/// Append-only ledger kept in process memory. Insertion order is ledger order.
pub struct MemoryLedger {
    items: Mutex<Vec<DataItem>>,
    height: AtomicU64,
    winc: Mutex<u128>,
}

impl MemoryLedger {
    pub fn new(height: u64, winc: u128) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            height: AtomicU64::new(height),
            winc: Mutex::new(winc),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::Relaxed);
    }

    /// All items appended so far, oldest first.
    pub fn items(&self) -> Vec<DataItem> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(0, 1_000_000_000_000)
    }
}

#[async_trait]
impl ReportIndex for MemoryLedger {
    async fn first_report_tx_id(&self, query: &ReportQuery) -> Result<Option<String>> {
        let height = query.epoch_start_height.to_string();
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items
            .iter()
            .find(|item| {
                item.owner_address() == query.owner
                    && item.tag(TAG_APP_NAME) == Some(query.app_name.as_str())
                    && item.tag(TAG_EPOCH_START_HEIGHT) == Some(height.as_str())
            })
            .map(DataItem::id))
    }
}

#[async_trait]
impl DataItemUploader for MemoryLedger {
    async fn upload_signed_data_item(&self, item: &DataItem) -> Result<UploadReceipt> {
        if !item.verify() {
            return Err(LedgerError::Rejected("invalid signature".into()));
        }
        let cost = item.to_bytes().len() as u128;
        {
            let mut winc = self.winc.lock().unwrap_or_else(|e| e.into_inner());
            if *winc < cost {
                return Err(LedgerError::Rejected("insufficient balance".into()));
            }
            *winc -= cost;
        }
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item.clone());
        info!(id = %item.id(), app = APP_NAME, "dry-run: recorded data item");
        Ok(UploadReceipt {
            id: item.id(),
            owner: item.owner_address(),
            data_caches: vec!["memory".into()],
            fast_finality_indexes: vec!["memory".into()],
        })
    }
}

#[async_trait]
impl BalanceReporter for MemoryLedger {
    async fn balance(&self) -> Result<Balance> {
        let winc = *self.winc.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Balance {
            winc: winc.to_string(),
        })
    }
}

#[async_trait]
impl HeightSource for MemoryLedger {
    async fn current_height(&self) -> Result<u64> {
        Ok(self.height.load(Ordering::Relaxed))
    }
}
