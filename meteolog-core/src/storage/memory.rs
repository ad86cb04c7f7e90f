use async_trait::async_trait;
use chrono::Utc;
use std::{num::NonZeroUsize, sync::Mutex};

use crate::model::{StoredSample, WeatherSample};

use super::{SampleStore, StorageError};

/// Process-local store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    samples: Mutex<Vec<StoredSample>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn initialize_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, sample: WeatherSample) -> Result<StoredSample, StorageError> {
        let mut samples = self.samples.lock().map_err(|_| StorageError::Poisoned)?;
        let stored = StoredSample {
            id: samples.len() as i64 + 1,
            sample,
            created_at: Utc::now(),
        };
        samples.push(stored.clone());
        Ok(stored)
    }

    async fn query_recent(&self, n: NonZeroUsize) -> Result<Vec<StoredSample>, StorageError> {
        let samples = self.samples.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(samples.iter().rev().take(n.get()).cloned().collect())
    }
}
