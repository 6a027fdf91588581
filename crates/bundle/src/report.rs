//! Packaging of observer reports.
//!
//! The tag set written here is the whole discovery surface other ledger
//! readers use to find reports, so it is fixed.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use observer_core::ObserverReport;
use observer_crypto::SigningKeypair;
use tracing::debug;

use crate::data_item::DataItem;
use crate::tags::Tag;
use crate::Result;

pub const APP_NAME: &str = "AR-IO Observer";
pub const APP_VERSION: &str = "0.0.1";
pub const COMPONENT: &str = "observer";
pub const CONTENT_TYPE: &str = "application/json";
pub const CONTENT_ENCODING: &str = "gzip";

pub const TAG_APP_NAME: &str = "App-Name";
pub const TAG_APP_VERSION: &str = "App-Version";
pub const TAG_CONTENT_TYPE: &str = "Content-Type";
pub const TAG_CONTENT_ENCODING: &str = "Content-Encoding";
pub const TAG_COMPONENT: &str = "AR-IO-Component";
pub const TAG_EPOCH_START_HEIGHT: &str = "AR-IO-Epoch-Start-Height";

/// The six tags every published report carries, in publication order.
pub fn report_tags(report: &ObserverReport) -> Vec<Tag> {
    vec![
        Tag::new(TAG_APP_NAME, APP_NAME),
        Tag::new(TAG_APP_VERSION, APP_VERSION),
        Tag::new(TAG_CONTENT_TYPE, CONTENT_TYPE),
        Tag::new(TAG_CONTENT_ENCODING, CONTENT_ENCODING),
        Tag::new(TAG_COMPONENT, COMPONENT),
        Tag::new(TAG_EPOCH_START_HEIGHT, report.epoch_start_height().to_string()),
    ]
}

/// Serialize, gzip, tag, and sign a report.
pub fn create_report_data_item(
    keypair: &SigningKeypair,
    report: &ObserverReport,
) -> Result<DataItem> {
    let json = report.to_json_bytes()?;
    let compressed = gzip(&json)?;
    debug!(
        epoch_start_height = report.epoch_start_height(),
        json_len = json.len(),
        compressed_len = compressed.len(),
        "packaging report"
    );
    DataItem::sign(keypair, compressed, report_tags(report))
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}
