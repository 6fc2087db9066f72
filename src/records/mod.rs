//! Resume record persistence.

mod auth;
pub mod client;
pub mod types;

pub use client::CosmosRecordStore;
pub use types::{NewResumeRecord, ResumeRecord, StoreError};

use async_trait::async_trait;

/// Durable storage for extracted resume records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Prepare the backing database and collection. A no-op for stores without a schema.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Write a new record with a freshly generated id. Never updates an existing record.
    async fn create_record(&self, record: NewResumeRecord) -> Result<ResumeRecord, StoreError>;

    /// First record whose `fileName` equals `file_name`, searching every partition.
    async fn find_by_file_name(&self, file_name: &str)
    -> Result<Option<ResumeRecord>, StoreError>;
}
