//! Text analytics adapter: entities, key phrases, and abstractive summaries.

pub mod client;
pub mod outcome;
pub mod types;

pub use client::LanguageClient;
pub use outcome::{CallOutcome, FailurePolicy};
pub use types::{
    DocumentResult, EntityMention, LanguageError, PERSON_CATEGORY, UNKNOWN_NAME, person_name,
};

use async_trait::async_trait;

/// Interface over the three text analytics operations used during ingest.
#[async_trait]
pub trait TextInsights: Send + Sync {
    /// Recognize named entities in `text`, in service order.
    async fn recognize_entities(
        &self,
        text: &str,
    ) -> Result<DocumentResult<Vec<EntityMention>>, LanguageError>;

    /// Extract key phrases from `text`.
    async fn extract_key_phrases(
        &self,
        text: &str,
    ) -> Result<DocumentResult<Vec<String>>, LanguageError>;

    /// Produce an abstractive summary of `text`.
    async fn abstractive_summary(&self, text: &str) -> Result<String, LanguageError>;
}
