//! Append-only persistence for samples.
//!
//! The core never updates or deletes a sample. Each call on a [`SampleStore`]
//! is atomic from the caller's point of view; implementations serialize
//! concurrent readers and writers themselves.

use async_trait::async_trait;
use std::num::NonZeroUsize;

use crate::model::{LabelError, StoredSample, WeatherSample};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage worker task failed")]
    Task(#[from] tokio::task::JoinError),

    #[error("storage lock poisoned by an earlier panic")]
    Poisoned,

    #[error("stored row {id} is corrupt")]
    Corrupt {
        id: i64,
        #[source]
        source: LabelError,
    },
}

#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Create the backing schema if it does not exist yet. Idempotent.
    async fn initialize_schema(&self) -> Result<(), StorageError>;

    /// Persist one sample, stamping it with its creation time.
    async fn append(&self, sample: WeatherSample) -> Result<StoredSample, StorageError>;

    /// Up to `n` samples, most recent first.
    async fn query_recent(&self, n: NonZeroUsize) -> Result<Vec<StoredSample>, StorageError>;
}
