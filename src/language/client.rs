//! HTTP client for the language service `analyze-text` APIs.

use crate::config::Config;
use crate::language::{
    TextInsights,
    types::{
        AnalyzeTextResponse, DocumentBatch, DocumentResult, EntitiesDocument, EntityMention,
        KeyPhrasesDocument, LanguageError, SummaryJob,
    },
};
use crate::polling::{
    PollSettings, SUBSCRIPTION_KEY_HEADER, format_endpoint, poll_operation, start_operation,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

const ANALYZE_TEXT_PATH: &str = "language/:analyze-text";
const ANALYZE_JOBS_PATH: &str = "language/analyze-text/jobs";
const API_VERSION: &str = "2023-04-01";
const DOCUMENT_ID: &str = "0";

/// Language service client submitting the resume text as a single-document batch.
pub struct LanguageClient {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) key: String,
    pub(crate) language: String,
    pub(crate) poll: PollSettings,
}

impl LanguageClient {
    /// Construct a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, LanguageError> {
        let client = Client::builder().user_agent("resume-insights/0.1").build()?;
        tracing::debug!(endpoint = %config.text_endpoint, "Initialized language client");
        Ok(Self {
            client,
            endpoint: config.text_endpoint.clone(),
            key: config.text_key.clone(),
            language: config.text_language.clone(),
            poll: PollSettings {
                interval: config.poll_interval,
                timeout: config.poll_timeout,
            },
        })
    }

    fn documents(&self, text: &str) -> Value {
        json!({
            "documents": [
                { "id": DOCUMENT_ID, "language": self.language, "text": text }
            ]
        })
    }

    async fn analyze_text<D>(&self, kind: &str, text: &str) -> Result<DocumentBatch<D>, LanguageError>
    where
        D: DeserializeOwned,
    {
        let response = self
            .client
            .post(format_endpoint(&self.endpoint, ANALYZE_TEXT_PATH))
            .query(&[("api-version", API_VERSION)])
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .json(&json!({
                "kind": kind,
                "analysisInput": self.documents(text),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LanguageError::UnexpectedStatus { status, body };
            tracing::error!(kind, error = %error, "Language request failed");
            return Err(error);
        }

        let payload: AnalyzeTextResponse<D> = response.json().await?;
        Ok(payload.results)
    }
}

#[async_trait]
impl TextInsights for LanguageClient {
    async fn recognize_entities(
        &self,
        text: &str,
    ) -> Result<DocumentResult<Vec<EntityMention>>, LanguageError> {
        let batch: DocumentBatch<EntitiesDocument> =
            self.analyze_text("EntityRecognition", text).await?;
        Ok(match batch.take(DOCUMENT_ID)? {
            DocumentResult::Ok(document) => {
                tracing::debug!(entities = document.entities.len(), "Entities recognized");
                DocumentResult::Ok(document.entities)
            }
            DocumentResult::Failed(detail) => DocumentResult::Failed(detail),
        })
    }

    async fn extract_key_phrases(
        &self,
        text: &str,
    ) -> Result<DocumentResult<Vec<String>>, LanguageError> {
        let batch: DocumentBatch<KeyPhrasesDocument> =
            self.analyze_text("KeyPhraseExtraction", text).await?;
        Ok(match batch.take(DOCUMENT_ID)? {
            DocumentResult::Ok(document) => DocumentResult::Ok(document.key_phrases),
            DocumentResult::Failed(detail) => DocumentResult::Failed(detail),
        })
    }

    async fn abstractive_summary(&self, text: &str) -> Result<String, LanguageError> {
        let submit = self
            .client
            .post(format_endpoint(&self.endpoint, ANALYZE_JOBS_PATH))
            .query(&[("api-version", API_VERSION)])
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .json(&json!({
                "displayName": "resume-summary",
                "analysisInput": self.documents(text),
                "tasks": [
                    { "kind": "AbstractiveSummarization", "taskName": "summary" }
                ]
            }));
        let operation_url = start_operation(submit).await?;
        tracing::debug!(operation = %operation_url, "Summarization job submitted");

        let body = poll_operation(&operation_url, self.poll, |url| {
            self.client
                .get(url)
                .header(SUBSCRIPTION_KEY_HEADER, &self.key)
        })
        .await?;
        let job: SummaryJob = serde_json::from_value(body)
            .map_err(|err| LanguageError::InvalidResponse(err.to_string()))?;
        collect_summary(job)
    }
}

/// Concatenate the summary fragments of a finished job, trimmed and space-joined.
fn collect_summary(job: SummaryJob) -> Result<String, LanguageError> {
    if !job.status.eq_ignore_ascii_case("succeeded") {
        return Err(LanguageError::JobFailed {
            status: job.status,
            detail: job.errors.into_iter().next(),
        });
    }

    let task = job
        .tasks
        .and_then(|tasks| tasks.items.into_iter().next())
        .ok_or_else(|| LanguageError::InvalidResponse("summary job returned no tasks".into()))?;
    if !task.status.eq_ignore_ascii_case("succeeded") {
        return Err(LanguageError::JobFailed {
            status: task.status,
            detail: None,
        });
    }
    let results = task
        .results
        .ok_or_else(|| LanguageError::InvalidResponse("summary task has no results".into()))?;

    match results.take(DOCUMENT_ID)? {
        DocumentResult::Ok(document) => Ok(document
            .summaries
            .iter()
            .map(|summary| summary.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()),
        DocumentResult::Failed(detail) => Err(LanguageError::Document(detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use std::time::Duration;

    fn client(server: &MockServer) -> LanguageClient {
        LanguageClient {
            client: Client::builder()
                .user_agent("resume-insights-test")
                .build()
                .expect("client"),
            endpoint: server.base_url(),
            key: "text-key".into(),
            language: "en".into(),
            poll: PollSettings {
                interval: Duration::from_millis(10),
                timeout: Duration::from_millis(200),
            },
        }
    }

    #[tokio::test]
    async fn entity_recognition_returns_ordered_mentions() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/language/:analyze-text")
                    .query_param("api-version", API_VERSION)
                    .header(SUBSCRIPTION_KEY_HEADER, "text-key")
                    .json_body_partial(r#"{ "kind": "EntityRecognition" }"#);
                then.status(200).json_body(json!({
                    "kind": "EntityRecognitionResults",
                    "results": {
                        "documents": [{
                            "id": "0",
                            "entities": [
                                { "text": "Jane Doe", "category": "Person", "offset": 0, "length": 8, "confidenceScore": 0.99 },
                                { "text": "Acme Corp", "category": "Organization", "offset": 12, "length": 9, "confidenceScore": 0.9 }
                            ],
                            "warnings": []
                        }],
                        "errors": [],
                        "modelVersion": "2023-09-01"
                    }
                }));
            })
            .await;

        let result = client(&server)
            .recognize_entities("Jane Doe at Acme Corp")
            .await
            .expect("entities");

        mock.assert();
        assert_eq!(
            result,
            DocumentResult::Ok(vec![
                EntityMention::new("Jane Doe", "Person"),
                EntityMention::new("Acme Corp", "Organization"),
            ])
        );
    }

    #[tokio::test]
    async fn key_phrase_document_error_is_flagged_not_raised() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/language/:analyze-text")
                    .json_body_partial(r#"{ "kind": "KeyPhraseExtraction" }"#);
                then.status(200).json_body(json!({
                    "kind": "KeyPhraseExtractionResults",
                    "results": {
                        "documents": [],
                        "errors": [{
                            "id": "0",
                            "error": { "code": "InvalidArgument", "message": "Document text is empty." }
                        }],
                        "modelVersion": "2022-10-01"
                    }
                }));
            })
            .await;

        let result = client(&server)
            .extract_key_phrases("")
            .await
            .expect("batch response");

        assert!(matches!(result, DocumentResult::Failed(detail) if detail.code == "InvalidArgument"));
    }

    #[tokio::test]
    async fn service_failure_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/language/:analyze-text");
                then.status(500).body("boom");
            })
            .await;

        let error = client(&server)
            .extract_key_phrases("text")
            .await
            .expect_err("server error");

        assert!(matches!(error, LanguageError::UnexpectedStatus { .. }));
    }

    #[tokio::test]
    async fn summary_job_concatenates_trimmed_fragments() {
        let server = MockServer::start_async().await;
        let operation = server.url("/language/analyze-text/jobs/abc");
        let submit = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/language/analyze-text/jobs")
                    .query_param("api-version", API_VERSION)
                    .json_body_partial(
                        r#"{ "tasks": [ { "kind": "AbstractiveSummarization" } ] }"#,
                    );
                then.status(202)
                    .header("Operation-Location", operation.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/language/analyze-text/jobs/abc");
                then.status(200).json_body(json!({
                    "jobId": "abc",
                    "status": "succeeded",
                    "errors": [],
                    "tasks": {
                        "completed": 1,
                        "failed": 0,
                        "inProgress": 0,
                        "total": 1,
                        "items": [{
                            "kind": "AbstractiveSummarizationLROResults",
                            "taskName": "summary",
                            "status": "succeeded",
                            "results": {
                                "documents": [{
                                    "id": "0",
                                    "summaries": [
                                        { "text": "  Jane is a senior engineer. " },
                                        { "text": "She knows Python.\n" }
                                    ]
                                }],
                                "errors": []
                            }
                        }]
                    }
                }));
            })
            .await;

        let summary = client(&server)
            .abstractive_summary("resume text")
            .await
            .expect("summary");

        submit.assert();
        assert_eq!(summary, "Jane is a senior engineer. She knows Python.");
    }

    #[test]
    fn summary_document_error_is_raised() {
        let job: SummaryJob = serde_json::from_value(json!({
            "status": "succeeded",
            "tasks": { "items": [{
                "status": "succeeded",
                "results": {
                    "documents": [],
                    "errors": [{ "id": "0", "error": { "code": "InvalidDocument", "message": "too long" } }]
                }
            }]}
        }))
        .expect("job");

        let error = collect_summary(job).expect_err("document error");
        assert_eq!(error.to_string(), "Document error: InvalidDocument - too long");
    }

    #[test]
    fn failed_summary_job_surfaces_first_error() {
        let job: SummaryJob = serde_json::from_value(json!({
            "status": "failed",
            "errors": [{ "code": "QuotaExceeded", "message": "try later" }]
        }))
        .expect("job");

        assert!(matches!(
            collect_summary(job),
            Err(LanguageError::JobFailed { detail: Some(detail), .. }) if detail.code == "QuotaExceeded"
        ));
    }
}
