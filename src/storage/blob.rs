//! Blob writer used by the upload endpoint.

use crate::storage::{
    events::{ArrivalPublisher, BlobArrival},
    sas::{SasError, SasIssuer, is_addressable_blob_name},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while writing blobs.
#[derive(Debug, Error)]
pub enum BlobError {
    /// A blob name was empty or otherwise unusable.
    #[error("Invalid blob name: {0:?}")]
    InvalidName(String),
    /// Signing the upload URL failed.
    #[error("Failed to sign upload URL: {0}")]
    Sas(#[from] SasError),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Blob service responded with an unexpected status code.
    #[error("Unexpected blob storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the blob service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Destination for uploaded resume files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write (or overwrite) `blob_name` and announce the arrival.
    async fn put_blob(&self, blob_name: &str, content: Vec<u8>)
    -> Result<BlobArrival, BlobError>;
}

/// Block blob writer that authenticates each upload with a short-lived write SAS.
pub struct AzureBlobStore {
    client: Client,
    sas: Arc<SasIssuer>,
    container: String,
    arrivals: ArrivalPublisher,
}

impl AzureBlobStore {
    /// Build a writer targeting `container`, publishing arrivals on `arrivals`.
    pub fn new(
        sas: Arc<SasIssuer>,
        container: impl Into<String>,
        arrivals: ArrivalPublisher,
    ) -> Result<Self, BlobError> {
        let client = Client::builder().user_agent("resume-insights/0.1").build()?;
        Ok(Self {
            client,
            sas,
            container: container.into(),
            arrivals,
        })
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put_blob(
        &self,
        blob_name: &str,
        content: Vec<u8>,
    ) -> Result<BlobArrival, BlobError> {
        if !is_addressable_blob_name(blob_name) {
            return Err(BlobError::InvalidName(blob_name.to_string()));
        }

        let length = content.len() as u64;
        let url = self.sas.write_url(&self.container, blob_name)?;
        let response = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(content)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = BlobError::UnexpectedStatus { status, body };
            tracing::error!(blob = blob_name, error = %error, "Blob upload failed");
            return Err(error);
        }

        tracing::info!(
            container = %self.container,
            blob = blob_name,
            bytes = length,
            "Blob written"
        );
        let arrival = BlobArrival::new(&self.container, blob_name, length);
        self.arrivals.publish(arrival.clone());
        Ok(arrival)
    }
}
