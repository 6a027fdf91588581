//! Turbo bundling service: signed data item uploads and credit balance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use observer_bundle::DataItem;
use observer_crypto::{b64url, sign_data, SigningKeypair};
use rand::RngCore;
use tracing::debug;

use crate::{Balance, BalanceReporter, DataItemUploader, LedgerError, Result, UploadReceipt};

/// Authenticated client for the Turbo upload and payment services.
pub struct TurboClient {
    http: reqwest::Client,
    upload_url: String,
    payment_url: String,
    keypair: Arc<SigningKeypair>,
}

/// Headers proving wallet ownership to the payment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub public_key: String,
    pub nonce: String,
    pub signature: String,
}

impl SignedHeaders {
    /// Sign a fresh random nonce with the wallet.
    pub fn new(keypair: &SigningKeypair) -> Self {
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        let nonce = hex::encode(raw);
        let signature = sign_data(keypair, nonce.as_bytes());
        Self {
            public_key: b64url(&keypair.public_key_bytes()),
            nonce,
            signature: b64url(&signature),
        }
    }
}

impl TurboClient {
    pub fn new(
        upload_url: &str,
        payment_url: &str,
        keypair: Arc<SigningKeypair>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            upload_url: upload_url.trim_end_matches('/').to_string(),
            payment_url: payment_url.trim_end_matches('/').to_string(),
            keypair,
        })
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    // Payment required and similar 4xx responses are definitive rejections.
    if status.is_client_error() {
        return Err(LedgerError::Rejected(format!("{}: {}", status.as_u16(), message)));
    }
    Err(LedgerError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DataItemUploader for TurboClient {
    async fn upload_signed_data_item(&self, item: &DataItem) -> Result<UploadReceipt> {
        let raw = item.to_bytes();
        debug!(id = %item.id(), size = raw.len(), "uploading data item");
        let response = self
            .http
            .post(format!("{}/v1/tx", self.upload_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(raw)
            .send()
            .await?;
        let receipt: UploadReceipt = error_for_status(response).await?.json().await?;
        Ok(receipt)
    }
}

#[async_trait]
impl BalanceReporter for TurboClient {
    async fn balance(&self) -> Result<Balance> {
        let headers = SignedHeaders::new(&self.keypair);
        let response = self
            .http
            .get(format!("{}/v1/balance", self.payment_url))
            .header("x-public-key", headers.public_key)
            .header("x-nonce", headers.nonce)
            .header("x-signature", headers.signature)
            .send()
            .await?;
        let balance: Balance = error_for_status(response).await?.json().await?;
        Ok(balance)
    }
}
