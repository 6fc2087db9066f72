//! Document analysis adapter: turns a blob URL into flat resume text.

use crate::config::Config;
use crate::polling::{
    OperationError, PollSettings, SUBSCRIPTION_KEY_HEADER, ServiceErrorDetail, format_endpoint,
    poll_operation, start_operation,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const ANALYZE_PATH: &str = "formrecognizer/documentModels/prebuilt-document:analyze";
const API_VERSION: &str = "2023-07-31";

/// Errors raised while analyzing a document.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    /// Submitting or polling the analysis job failed.
    #[error("Analysis operation failed: {0}")]
    Operation(#[from] OperationError),
    /// The service finished the job in a failed state.
    #[error("Document analysis failed ({code}): {message}")]
    Failed {
        /// Service error code.
        code: String,
        /// Service error message.
        message: String,
    },
    /// The terminal response could not be decoded.
    #[error("Malformed analysis response: {0}")]
    InvalidResponse(String),
}

/// Extracts plain text from a document reachable by URL.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze the document at `document_url` and return its paragraphs joined by spaces.
    async fn analyze_document(&self, document_url: &str) -> Result<String, AnalysisError>;
}

/// Form recognizer client using the general `prebuilt-document` model.
pub struct FormRecognizerClient {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) key: String,
    pub(crate) poll: PollSettings,
}

impl FormRecognizerClient {
    /// Construct a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let client = Client::builder().user_agent("resume-insights/0.1").build()?;
        tracing::debug!(endpoint = %config.form_endpoint, "Initialized document analysis client");
        Ok(Self {
            client,
            endpoint: config.form_endpoint.clone(),
            key: config.form_key.clone(),
            poll: PollSettings {
                interval: config.poll_interval,
                timeout: config.poll_timeout,
            },
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for FormRecognizerClient {
    async fn analyze_document(&self, document_url: &str) -> Result<String, AnalysisError> {
        let submit = self
            .client
            .post(format_endpoint(&self.endpoint, ANALYZE_PATH))
            .query(&[("api-version", API_VERSION)])
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .json(&json!({ "urlSource": document_url }));
        let operation_url = start_operation(submit).await?;
        tracing::debug!(operation = %operation_url, "Document analysis submitted");

        let body = poll_operation(&operation_url, self.poll, |url| {
            self.client
                .get(url)
                .header(SUBSCRIPTION_KEY_HEADER, &self.key)
        })
        .await?;

        let operation: AnalyzeOperation = serde_json::from_value(body)
            .map_err(|err| AnalysisError::InvalidResponse(err.to_string()))?;
        let text = operation.into_text()?;
        tracing::info!(characters = text.len(), "Document analysis completed");
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<ServiceErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    content: String,
}

impl AnalyzeOperation {
    fn into_text(self) -> Result<String, AnalysisError> {
        if !self.status.eq_ignore_ascii_case("succeeded") {
            let detail = self.error.unwrap_or_default();
            return Err(AnalysisError::Failed {
                code: if detail.code.is_empty() {
                    self.status
                } else {
                    detail.code
                },
                message: detail.message,
            });
        }

        let result = self.analyze_result.ok_or_else(|| {
            AnalysisError::InvalidResponse("succeeded without analyzeResult".into())
        })?;
        Ok(result
            .paragraphs
            .into_iter()
            .map(|paragraph| paragraph.content)
            .collect::<Vec<_>>()
            .join(" "))
    }
}
