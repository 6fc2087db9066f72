//! HTTP surface for resume intake and lookup.
//!
//! - `GET|POST /GetResumeInsights` – Look up the record extracted from an uploaded file and return
//!   its entities grouped into `Skills`, `Organizations`, and `Dates`. The file name comes from the
//!   `filename` query parameter or, failing that, a `filename` field in a JSON body.
//! - `POST /uploadresume` – Store the multipart field `file` in the resumes container. Extraction
//!   runs asynchronously once the blob arrival is observed.
//! - `GET /metrics` – Upload and ingest counters.

use crate::insights::ResumeInsights;
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::records::{RecordStore, ResumeRecord, StoreError};
use crate::storage::{BlobArrival, BlobError, BlobStore};
use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

const UPLOAD_FIELD: &str = "file";
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Operations backing the HTTP handlers.
#[async_trait]
pub trait ResumeApi: Send + Sync {
    /// Store an uploaded resume under `file_name`, replacing any existing blob.
    async fn upload_resume(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<BlobArrival, BlobError>;

    /// First stored record extracted from `file_name`.
    async fn find_resume(&self, file_name: &str) -> Result<Option<ResumeRecord>, StoreError>;

    /// Current counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production [`ResumeApi`] over a blob writer and a record store.
pub struct ResumeService {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    metrics: Arc<IngestMetrics>,
}

impl ResumeService {
    /// Wire the service to its collaborators.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            blobs,
            records,
            metrics,
        }
    }
}

#[async_trait]
impl ResumeApi for ResumeService {
    async fn upload_resume(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<BlobArrival, BlobError> {
        let arrival = self.blobs.put_blob(file_name, content).await?;
        self.metrics.record_upload();
        Ok(arrival)
    }

    async fn find_resume(&self, file_name: &str) -> Result<Option<ResumeRecord>, StoreError> {
        self.records.find_by_file_name(file_name).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Build the HTTP router.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ResumeApi + 'static,
{
    Router::new()
        .route(
            "/GetResumeInsights",
            get(get_resume_insights::<S>).post(get_resume_insights::<S>),
        )
        .route(
            "/uploadresume",
            post(upload_resume::<S>).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Failures of the insights lookup.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Neither the query string nor the body named a file.
    #[error("Please pass the filename in the query string ?filename=...")]
    MissingFilename,
    /// No record exists for the file.
    #[error("No data found for file '{0}'")]
    NotFound(String),
    /// The record store could not be queried.
    #[error("Record lookup failed: {0}")]
    Store(#[from] StoreError),
    /// The response body could not be encoded.
    #[error("Failed to encode insights: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures of the upload endpoint.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No usable `file` field was submitted.
    #[error("No file uploaded. Please upload a file with key 'file'.")]
    MissingFile,
    /// The multipart body could not be read.
    #[error("Error: {0}")]
    Multipart(#[from] MultipartError),
    /// Writing the blob failed.
    #[error("Error: {0}")]
    Blob(#[from] BlobError),
}

#[derive(Deserialize, Default)]
struct FilenameParams {
    #[serde(default)]
    filename: Option<String>,
}

/// Return the grouped insights for one uploaded file.
async fn get_resume_insights<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<FilenameParams>,
    body: Bytes,
) -> Result<Response, AppError>
where
    S: ResumeApi,
{
    let filename = params
        .filename
        .filter(|name| !name.is_empty())
        .or_else(|| filename_from_body(&body))
        .ok_or(QueryError::MissingFilename)?;

    let record = service
        .find_resume(&filename)
        .await
        .map_err(QueryError::from)?
        .ok_or_else(|| QueryError::NotFound(filename.clone()))?;

    tracing::info!(file_name = %filename, id = %record.id, "Resume insights requested");
    let body = ResumeInsights::from_record(record)
        .to_json_pretty()
        .map_err(QueryError::from)?;
    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

/// `filename` from a JSON body; anything unparsable counts as absent.
fn filename_from_body(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<FilenameParams>(body)
        .ok()
        .and_then(|params| params.filename)
        .filter(|name| !name.is_empty())
}

/// Store the submitted `file` field as a blob.
async fn upload_resume<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<&'static str, AppError>
where
    S: ResumeApi,
{
    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or(UploadError::MissingFile)?;
        let content = field.bytes().await.map_err(UploadError::from)?;

        let arrival = service
            .upload_resume(&file_name, content.to_vec())
            .await
            .map_err(UploadError::from)?;
        tracing::info!(
            file_name = %file_name,
            path = %arrival.path,
            bytes = arrival.length,
            "Resume uploaded"
        );
        return Ok("File uploaded successfully!");
    }

    Err(UploadError::MissingFile.into())
}

/// Return upload and ingest counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ResumeApi,
{
    Json(service.metrics_snapshot())
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        let status = match &inner {
            QueryError::MissingFilename => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::Store(_) | QueryError::Encode(_) => {
                tracing::error!(error = %inner, "Insights lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: inner.to_string(),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        let status = match &inner {
            UploadError::MissingFile | UploadError::Blob(BlobError::InvalidName(_)) => {
                StatusCode::BAD_REQUEST
            }
            UploadError::Multipart(_) | UploadError::Blob(_) => {
                tracing::error!(error = %inner, "Upload failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: inner.to_string(),
        }
    }
}
