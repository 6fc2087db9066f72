//! Ingest orchestrator: blob arrival to stored resume record.

use crate::{
    analysis::{AnalysisError, DocumentAnalyzer},
    language::{CallOutcome, FailurePolicy, LanguageError, TextInsights, person_name},
    metrics::IngestMetrics,
    records::{NewResumeRecord, RecordStore, ResumeRecord, StoreError},
    storage::{BlobArrival, SasError, SasIssuer},
};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort an ingest run. No record is written when one is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The arrival is not under the watched container prefix.
    #[error("Blob {0:?} is outside the watched container")]
    OutsidePrefix(String),
    /// A read URL could not be minted for the blob.
    #[error("Failed to issue SAS URL: {0}")]
    Sas(#[from] SasError),
    /// Document analysis failed.
    #[error("Document analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    /// Entity or key-phrase extraction failed beyond a per-document error.
    #[error("Text analytics failed: {0}")]
    Language(#[from] LanguageError),
    /// Persisting the record failed.
    #[error("Failed to persist record: {0}")]
    Store(#[from] StoreError),
}

/// Runs the extraction sequence for each arriving resume.
///
/// Clients are constructed once per process and shared read-only across concurrent runs.
pub struct IngestService {
    sas: Arc<SasIssuer>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    insights: Arc<dyn TextInsights>,
    records: Arc<dyn RecordStore>,
    metrics: Arc<IngestMetrics>,
    container: String,
}

impl IngestService {
    /// Wire the orchestrator to its collaborators.
    pub fn new(
        sas: Arc<SasIssuer>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        insights: Arc<dyn TextInsights>,
        records: Arc<dyn RecordStore>,
        metrics: Arc<IngestMetrics>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            sas,
            analyzer,
            insights,
            records,
            metrics,
            container: container.into(),
        }
    }

    /// Counters updated by every run.
    pub fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// Process one arrival event.
    pub async fn ingest(&self, arrival: &BlobArrival) -> Result<ResumeRecord, IngestError> {
        let blob_name = blob_name_from_path(&arrival.path, &self.container)
            .ok_or_else(|| IngestError::OutsidePrefix(arrival.path.clone()))?;
        tracing::info!(blob = %arrival.path, bytes = arrival.length, "Processing blob");
        self.ingest_blob(blob_name).await
    }

    /// Process a blob already present in the watched container.
    pub async fn ingest_blob(&self, blob_name: &str) -> Result<ResumeRecord, IngestError> {
        let result = self.run(blob_name).await;
        match &result {
            Ok(record) => {
                self.metrics.record_stored();
                tracing::info!(
                    blob = blob_name,
                    id = %record.id,
                    name = %record.name,
                    "Ingest completed"
                );
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::error!(blob = blob_name, error = %error, "Ingest aborted");
            }
        }
        result
    }

    async fn run(&self, blob_name: &str) -> Result<ResumeRecord, IngestError> {
        let url = self.sas.read_url(&self.container, blob_name)?;
        let text = self.analyzer.analyze_document(url.as_str()).await?;

        let (entities, key_phrases, summary) = tokio::join!(
            self.insights.recognize_entities(&text),
            self.insights.extract_key_phrases(&text),
            self.insights.abstractive_summary(&text),
        );

        let entities =
            CallOutcome::from_document_call(entities, FailurePolicy::DefaultOnDocumentError)
                .resolve("entity_recognition")?;
        let key_phrases =
            CallOutcome::from_document_call(key_phrases, FailurePolicy::DefaultOnDocumentError)
                .resolve("key_phrase_extraction")?;
        let summary = CallOutcome::from_call(summary, FailurePolicy::DefaultOnAnyError);
        if summary.is_soft_error() {
            self.metrics.record_degraded_summary();
        }
        let summary = summary.resolve("abstractive_summary")?;

        tracing::debug!(
            blob = blob_name,
            entities = entities.len(),
            key_phrases = ?key_phrases,
            summary_chars = summary.len(),
            "Extracted resume insights"
        );

        let record = NewResumeRecord {
            name: person_name(&entities),
            entities,
            file_name: blob_name.to_string(),
            key_phrases,
            summary,
        };
        Ok(self.records.create_record(record).await?)
    }
}

/// Blob name with the `container/` prefix removed, if the path lies inside `container`.
pub fn blob_name_from_path<'a>(path: &'a str, container: &str) -> Option<&'a str> {
    path.strip_prefix(container)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{EntityMention, UNKNOWN_NAME};
    use crate::pipeline::test_support::{
        MemoryRecordStore, StubAnalyzer, StubInsights, StubReply, test_sas_issuer,
    };

    struct Harness {
        service: IngestService,
        analyzer: Arc<StubAnalyzer>,
        records: Arc<MemoryRecordStore>,
        metrics: Arc<IngestMetrics>,
    }

    fn harness(analyzer: StubAnalyzer, insights: StubInsights) -> Harness {
        let analyzer = Arc::new(analyzer);
        let records = Arc::new(MemoryRecordStore::default());
        let metrics = Arc::new(IngestMetrics::new());
        let service = IngestService::new(
            Arc::new(test_sas_issuer()),
            analyzer.clone(),
            Arc::new(insights),
            records.clone(),
            metrics.clone(),
            "resumes",
        );
        Harness {
            service,
            analyzer,
            records,
            metrics,
        }
    }

    #[tokio::test]
    async fn stores_one_record_named_after_stripped_blob() {
        let h = harness(
            StubAnalyzer::text("Jane Doe Python developer at Acme Corp"),
            StubInsights::default(),
        );

        let record = h
            .service
            .ingest(&BlobArrival::new("resumes", "jane.pdf", 1024))
            .await
            .expect("ingest");

        assert_eq!(record.file_name, "jane.pdf");
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.summary, "Experienced engineer.");
        assert_eq!(record.key_phrases, vec!["Python developer"]);
        assert_eq!(h.records.stored().await, vec![record]);
        assert_eq!(h.metrics.snapshot().records_stored, 1);

        let urls = h.analyzer.requested_urls().await;
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("/resumes/jane.pdf?"), "{}", urls[0]);
        assert!(urls[0].contains("sp=r"), "read-only SAS: {}", urls[0]);
    }

    #[tokio::test]
    async fn missing_person_entity_records_unknown_name() {
        let h = harness(
            StubAnalyzer::text("resume"),
            StubInsights {
                entities: StubReply::Value(vec![EntityMention::new("Acme Corp", "Organization")]),
                ..StubInsights::default()
            },
        );

        let record = h
            .service
            .ingest_blob("anon.pdf")
            .await
            .expect("ingest");

        assert_eq!(record.name, UNKNOWN_NAME);
        assert_eq!(record.entities.len(), 1);
    }

    #[tokio::test]
    async fn flagged_entity_and_key_phrase_documents_fall_back_to_empty() {
        let h = harness(
            StubAnalyzer::text("resume"),
            StubInsights {
                entities: StubReply::DocumentError,
                key_phrases: StubReply::DocumentError,
                ..StubInsights::default()
            },
        );

        let record = h.service.ingest_blob("cv.pdf").await.expect("ingest");

        assert_eq!(record.name, UNKNOWN_NAME);
        assert!(record.entities.is_empty());
        assert!(record.key_phrases.is_empty());
    }

    #[tokio::test]
    async fn summarization_failure_is_never_fatal() {
        for reply in [StubReply::ServiceError, StubReply::DocumentError] {
            let h = harness(
                StubAnalyzer::text("resume"),
                StubInsights {
                    summary: reply,
                    ..StubInsights::default()
                },
            );

            let record = h.service.ingest_blob("cv.pdf").await.expect("ingest");

            assert_eq!(record.summary, "");
            assert_eq!(h.records.stored().await.len(), 1);
            assert_eq!(h.metrics.snapshot().summaries_degraded, 1);
        }
    }

    #[tokio::test]
    async fn analysis_failure_persists_nothing() {
        let h = harness(StubAnalyzer::failing(), StubInsights::default());

        let error = h
            .service
            .ingest(&BlobArrival::new("resumes", "broken.pdf", 3))
            .await
            .expect_err("analysis failure");

        assert!(matches!(error, IngestError::Analysis(_)));
        assert!(h.records.stored().await.is_empty());
        assert_eq!(h.metrics.snapshot().ingest_failures, 1);
    }

    #[tokio::test]
    async fn entity_service_failure_aborts_without_record() {
        let h = harness(
            StubAnalyzer::text("resume"),
            StubInsights {
                entities: StubReply::ServiceError,
                ..StubInsights::default()
            },
        );

        let error = h.service.ingest_blob("cv.pdf").await.expect_err("abort");

        assert!(matches!(error, IngestError::Language(_)));
        assert!(h.records.stored().await.is_empty());
    }

    #[tokio::test]
    async fn arrivals_outside_the_container_are_rejected() {
        let h = harness(StubAnalyzer::text("resume"), StubInsights::default());

        let error = h
            .service
            .ingest(&BlobArrival::new("archive", "cv.pdf", 1))
            .await
            .expect_err("outside prefix");

        assert!(matches!(error, IngestError::OutsidePrefix(path) if path == "archive/cv.pdf"));
        assert!(h.analyzer.requested_urls().await.is_empty());
    }

    #[test]
    fn strips_only_the_leading_container_segment() {
        assert_eq!(blob_name_from_path("resumes/cv.pdf", "resumes"), Some("cv.pdf"));
        assert_eq!(
            blob_name_from_path("resumes/2024/resumes/cv.pdf", "resumes"),
            Some("2024/resumes/cv.pdf")
        );
        assert_eq!(blob_name_from_path("resumesx/cv.pdf", "resumes"), None);
        assert_eq!(blob_name_from_path("resumes/", "resumes"), None);
    }
}
