//! Ingest pipeline: SAS issuance, document analysis, text insights, and persistence.

mod service;
mod worker;

pub use service::{IngestError, IngestService, blob_name_from_path};
pub use worker::{run_ingest_worker, spawn_ingest_worker};
