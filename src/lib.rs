#![deny(missing_docs)]

//! Core library for the resume insights service.

/// Document analysis (text extraction) client.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Client construction and process wiring.
pub mod app;
/// Environment-driven configuration management.
pub mod config;
/// Read-side reshaping of stored records.
pub mod insights;
/// Entity, key-phrase, and summarization client.
pub mod language;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Ingest orchestration and the arrival worker.
pub mod pipeline;
/// Long-running operation helpers shared by the AI service clients.
pub mod polling;
/// Resume record persistence.
pub mod records;
/// Blob storage, SAS signing, and arrival events.
pub mod storage;
