//! Background poll loop.
//!
//! Drives the [`Sampler`] on a fixed interval and hands every sample to a
//! [`SampleSink`]. The loop has two states, running and stopped, and only a
//! cancellation signal or a sink failure moves it to stopped.
//!
//! Cancellation is observed at three points: while the fetch is in flight (the
//! request is dropped), just before the sink call, and during the sleep. The
//! sink call itself is never interrupted, so a write is either not started or
//! fully acknowledged.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    model::WeatherSample,
    sampler::Sampler,
    storage::{SampleStore, StorageError},
};

/// Where the poll loop delivers samples.
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn accept(&self, sample: WeatherSample) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: SampleStore + ?Sized> SampleSink for S {
    async fn accept(&self, sample: WeatherSample) -> Result<(), StorageError> {
        self.append(sample).await.map(|_| ())
    }
}

pub struct PollLoop<K: ?Sized> {
    sampler: Sampler,
    sink: Arc<K>,
    interval: Duration,
}

impl<K: SampleSink + ?Sized> PollLoop<K> {
    /// `interval` is the pause after each cycle, whether or not it produced a
    /// sample.
    pub fn new(sampler: Sampler, sink: Arc<K>, interval: Duration) -> Self {
        Self {
            sampler,
            sink,
            interval,
        }
    }

    /// Runs until `shutdown` is cancelled or the sink fails.
    ///
    /// Sink calls happen one at a time in fetch order; the next fetch does not
    /// start until the previous write has completed.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), StorageError> {
        info!(
            interval_secs = self.interval.as_secs(),
            latitude = self.sampler.location().latitude,
            longitude = self.sampler.location().longitude,
            "poll loop starting"
        );

        loop {
            let fetched = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                fetched = self.sampler.fetch() => fetched,
            };

            match fetched {
                Some(_) if shutdown.is_cancelled() => {
                    debug!("discarding sample fetched during shutdown");
                    break;
                }
                Some(sample) => {
                    if let Err(err) = self.sink.accept(sample).await {
                        error!(error = %err, "failed to persist weather sample; stopping poll loop");
                        return Err(err);
                    }
                }
                None => debug!("no sample this cycle"),
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("poll loop stopped");
        Ok(())
    }
}
