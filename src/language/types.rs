//! Shared types for the text analytics adapter.

use crate::polling::{OperationError, ServiceErrorDetail};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entity category whose first occurrence names the candidate.
pub const PERSON_CATEGORY: &str = "Person";

/// Name recorded when no person entity was recognized.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A recognized entity as persisted with a resume record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Surface text of the entity.
    pub text: String,
    /// Open-ended category tag (`Person`, `Organization`, `Skill`, ...).
    pub category: String,
}

impl EntityMention {
    /// Convenience constructor.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }
}

/// Text of the first `Person` entity, or [`UNKNOWN_NAME`].
pub fn person_name(entities: &[EntityMention]) -> String {
    entities
        .iter()
        .find(|entity| entity.category == PERSON_CATEGORY)
        .map(|entity| entity.text.clone())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

/// Per-document outcome of a batch call, mirroring the service's error flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentResult<T> {
    /// The document was processed.
    Ok(T),
    /// The service flagged this document as failed.
    Failed(ServiceErrorDetail),
}

/// Errors raised by the text analytics adapter.
#[derive(Debug, Error)]
pub enum LanguageError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Service responded with an unexpected status code.
    #[error("Unexpected language service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Submitting or polling a job failed.
    #[error("Language job failed: {0}")]
    Operation(#[from] OperationError),
    /// A job finished in a non-success state.
    #[error("Language job ended with status {status}: {detail:?}")]
    JobFailed {
        /// Terminal job status.
        status: String,
        /// First error reported by the job, if any.
        detail: Option<ServiceErrorDetail>,
    },
    /// The service flagged the submitted document as failed.
    #[error("Document error: {} - {}", .0.code, .0.message)]
    Document(ServiceErrorDetail),
    /// Response body could not be decoded or lacked the submitted document.
    #[error("Malformed language service response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeTextResponse<D> {
    pub(crate) results: DocumentBatch<D>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentBatch<D> {
    #[serde(default = "Vec::new")]
    pub(crate) documents: Vec<D>,
    #[serde(default)]
    pub(crate) errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentError {
    pub(crate) id: String,
    pub(crate) error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntitiesDocument {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) entities: Vec<EntityMention>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyPhrasesDocument {
    pub(crate) id: String,
    #[serde(default, rename = "keyPhrases")]
    pub(crate) key_phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryDocument {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) summaries: Vec<SummaryText>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryText {
    pub(crate) text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryJob {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) errors: Vec<ServiceErrorDetail>,
    #[serde(default)]
    pub(crate) tasks: Option<SummaryTasks>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryTasks {
    #[serde(default)]
    pub(crate) items: Vec<SummaryTaskItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryTaskItem {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) results: Option<DocumentBatch<SummaryDocument>>,
}

/// Identifies documents within a batch so a single-document lookup can pick its entry.
pub(crate) trait BatchDocument {
    fn id(&self) -> &str;
}

impl BatchDocument for EntitiesDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl BatchDocument for KeyPhrasesDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl BatchDocument for SummaryDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl<D: BatchDocument> DocumentBatch<D> {
    /// Extract the outcome for `id`, preferring the error flag when both are present.
    pub(crate) fn take(self, id: &str) -> Result<DocumentResult<D>, LanguageError> {
        if let Some(failed) = self.errors.into_iter().find(|entry| entry.id == id) {
            return Ok(DocumentResult::Failed(failed.error));
        }
        self.documents
            .into_iter()
            .find(|document| document.id() == id)
            .map(DocumentResult::Ok)
            .ok_or_else(|| LanguageError::InvalidResponse(format!("document {id} missing")))
    }
}
