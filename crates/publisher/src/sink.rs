//! Ledger-backed report sink.
//!
//! `save_report` runs dedup check, package, append, and balance observation
//! strictly in that order. Two overlapping calls for the same epoch can both
//! miss each other in the dedup check and both append; readers resolve that
//! by taking the earliest record. No lock is taken because it could not
//! cover independent publisher processes anyway.

use std::sync::Arc;

use async_trait::async_trait;
use observer_bundle::{create_report_data_item, APP_NAME};
use observer_core::{ObserverReport, ReportInfo, ReportSink};
use observer_crypto::SigningKeypair;
use observer_ledger::{
    BalanceReporter, DataItemUploader, ReportIndex, ReportQuery, UploadReceipt,
};
use tracing::{debug, error, info};

use crate::PublisherError;

/// Publishes reports as signed data items, reusing existing records.
pub struct LedgerReportSink {
    index: Arc<dyn ReportIndex>,
    uploader: Arc<dyn DataItemUploader>,
    balance: Arc<dyn BalanceReporter>,
    keypair: Arc<SigningKeypair>,
    wallet_address: String,
}

impl LedgerReportSink {
    pub fn new(
        index: Arc<dyn ReportIndex>,
        uploader: Arc<dyn DataItemUploader>,
        balance: Arc<dyn BalanceReporter>,
        keypair: Arc<SigningKeypair>,
    ) -> Self {
        let wallet_address = keypair.address();
        Self {
            index,
            uploader,
            balance,
            keypair,
            wallet_address,
        }
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    /// Id of the earliest report this wallet published for the report's epoch.
    pub async fn report_tx_id(
        &self,
        report: &ObserverReport,
    ) -> Result<Option<String>, PublisherError> {
        let query = ReportQuery {
            owner: self.wallet_address.clone(),
            app_name: APP_NAME.to_string(),
            epoch_start_height: report.epoch_start_height(),
        };
        Ok(self.index.first_report_tx_id(&query).await?)
    }

    async fn upload(&self, report: &ObserverReport) -> Result<UploadReceipt, PublisherError> {
        let item = create_report_data_item(&self.keypair, report)?;
        Ok(self.uploader.upload_signed_data_item(&item).await?)
    }

    async fn log_balance(&self, epoch_start_height: u64) {
        match self.balance.balance().await {
            Ok(balance) => info!(
                epoch_start_height,
                new_balance = %balance.winc,
                "New Turbo balance: {}",
                balance.winc
            ),
            Err(e) => error!(
                epoch_start_height,
                error = %e,
                "Error fetching Turbo balance"
            ),
        }
    }
}

#[async_trait]
impl ReportSink for LedgerReportSink {
    async fn save_report(&self, report_info: ReportInfo) -> Option<ReportInfo> {
        let report = &report_info.report;
        let epoch_start_height = report.epoch_start_height();

        match self.report_tx_id(report).await {
            Ok(Some(report_tx_id)) => {
                info!(
                    epoch_start_height,
                    report_tx_id = %report_tx_id,
                    "Report already saved, skipping upload"
                );
                return Some(report_info.with_tx_id(report_tx_id));
            }
            Ok(None) => {}
            // A failed lookup must not block publication.
            Err(e) => error!(
                epoch_start_height,
                error = %e,
                "Error checking for existing report"
            ),
        }

        debug!(epoch_start_height, "Saving report...");
        let result = self.upload(report).await;

        self.log_balance(epoch_start_height).await;

        match result {
            Ok(receipt) => {
                info!(
                    epoch_start_height,
                    id = %receipt.id,
                    owner = %receipt.owner,
                    data_caches = ?receipt.data_caches,
                    fast_finality_indexes = ?receipt.fast_finality_indexes,
                    "Report saved using Turbo"
                );
                Some(report_info.with_tx_id(receipt.id))
            }
            Err(e) => {
                error!(epoch_start_height, error = %e, "Error saving report");
                None
            }
        }
    }
}
