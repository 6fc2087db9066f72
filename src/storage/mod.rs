//! Blob storage integration: SAS issuance, uploads, and arrival events.

pub mod blob;
pub mod events;
pub mod sas;

pub use blob::{AzureBlobStore, BlobError, BlobStore};
pub use events::{ArrivalPublisher, ArrivalReceiver, BlobArrival, arrival_channel};
pub use sas::{SasError, SasIssuer, SasPermissions};

/// Container that receives uploaded resumes and triggers ingestion.
pub const RESUMES_CONTAINER: &str = "resumes";
