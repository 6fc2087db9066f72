//! Persisted resume record shape and store errors.

use crate::language::{EntityMention, UNKNOWN_NAME};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while reading or writing resume records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The master key could not be decoded or used.
    #[error("Invalid document store key: {0}")]
    InvalidKey(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The store responded with an unexpected status code.
    #[error("Unexpected document store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A record could not be encoded or decoded.
    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A request timestamp could not be rendered.
    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// A stored resume record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    /// Freshly generated identifier.
    pub id: String,
    /// Blob name the record was extracted from.
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    /// Abstractive summary; empty when summarization failed.
    #[serde(default = "unknown")]
    pub summary: String,
    /// Detected candidate name; also the partition key.
    #[serde(default = "unknown")]
    pub name: String,
    /// Key phrases in service order.
    #[serde(default)]
    pub key_phrases: Vec<String>,
    /// Recognized entities in service order.
    #[serde(default)]
    pub entities: Vec<EntityMention>,
    /// RFC 3339 write time.
    #[serde(rename = "uploadTime", default)]
    pub upload_time: String,
}

fn unknown() -> String {
    UNKNOWN_NAME.to_string()
}

/// Extracted fields for a record that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResumeRecord {
    /// Detected candidate name.
    pub name: String,
    /// Recognized entities.
    pub entities: Vec<EntityMention>,
    /// Blob name without the container prefix.
    pub file_name: String,
    /// Extracted key phrases.
    pub key_phrases: Vec<String>,
    /// Summary text.
    pub summary: String,
}

impl NewResumeRecord {
    /// Attach the identifier and write time.
    pub fn into_record(self, id: String, upload_time: String) -> ResumeRecord {
        ResumeRecord {
            id,
            file_name: self.file_name,
            summary: self.summary,
            name: self.name,
            key_phrases: self.key_phrases,
            entities: self.entities,
            upload_time,
        }
    }
}
