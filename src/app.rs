//! Process wiring: builds the production clients once and connects upload, worker, and router.

use crate::{
    analysis::{AnalysisError, FormRecognizerClient},
    api::{ResumeService, create_router},
    config::Config,
    language::{LanguageClient, LanguageError},
    metrics::IngestMetrics,
    pipeline::{IngestService, spawn_ingest_worker},
    records::{CosmosRecordStore, StoreError},
    storage::{AzureBlobStore, BlobError, RESUMES_CONTAINER, SasError, SasIssuer, arrival_channel},
};
use axum::Router;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors raised while constructing the service clients.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The storage account key could not be used for signing.
    #[error("Storage signing setup failed: {0}")]
    Sas(#[from] SasError),
    /// The blob writer could not be built.
    #[error("Blob client setup failed: {0}")]
    Blob(#[from] BlobError),
    /// The document analysis client could not be built.
    #[error("Document analysis client setup failed: {0}")]
    Analysis(#[from] AnalysisError),
    /// The language client could not be built.
    #[error("Language client setup failed: {0}")]
    Language(#[from] LanguageError),
    /// The record store client could not be built.
    #[error("Record store setup failed: {0}")]
    Store(#[from] StoreError),
}

/// Shared ingest orchestrator plus the clients it was built from.
pub struct IngestComponents {
    /// Orchestrator shared by the worker and one-off runs.
    pub service: Arc<IngestService>,
    /// Record store, also used by the query endpoint.
    pub records: Arc<CosmosRecordStore>,
    /// Signing authority for read and write URLs.
    pub sas: Arc<SasIssuer>,
    /// Counters shared with the HTTP surface.
    pub metrics: Arc<IngestMetrics>,
}

/// Build the ingest orchestrator against the configured services.
pub fn build_ingest(config: &Config) -> Result<IngestComponents, StartupError> {
    let sas = Arc::new(SasIssuer::new(config.storage.clone())?);
    let records = Arc::new(CosmosRecordStore::new(config)?);
    let metrics = Arc::new(IngestMetrics::new());
    let service = Arc::new(IngestService::new(
        sas.clone(),
        Arc::new(FormRecognizerClient::new(config)?),
        Arc::new(LanguageClient::new(config)?),
        records.clone(),
        metrics.clone(),
        RESUMES_CONTAINER,
    ));
    Ok(IngestComponents {
        service,
        records,
        sas,
        metrics,
    })
}

/// Running application: HTTP router plus the background ingest worker.
pub struct Application {
    /// Router serving the HTTP surface.
    pub router: Router,
    /// Worker draining blob arrivals; finishes once the router and its writers are dropped.
    pub worker: JoinHandle<()>,
}

/// Build every client, start the ingest worker, and return the router.
///
/// Must be called inside a Tokio runtime.
pub fn build_application(config: &Config) -> Result<Application, StartupError> {
    let ingest = build_ingest(config)?;
    let (publisher, receiver) = arrival_channel();
    let blobs = Arc::new(AzureBlobStore::new(
        ingest.sas.clone(),
        RESUMES_CONTAINER,
        publisher,
    )?);

    let worker = spawn_ingest_worker(ingest.service, receiver);
    let api = ResumeService::new(blobs, ingest.records, ingest.metrics);
    tracing::info!(
        container = RESUMES_CONTAINER,
        storage_account = ingest.sas.account_name(),
        "Ingest worker started"
    );
    Ok(Application {
        router: create_router(Arc::new(api)),
        worker,
    })
}
