//! Object store wrapper that times and logs every call.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ipni_publisher_store::{ObjectStore, Result, StoreError, StoredObject};

use crate::telemetry::{millis, Outcome, Timer};

/// Wraps any [`ObjectStore`] with fetch and upload metrics.
#[derive(Clone)]
pub struct MeteredStore {
    inner: Arc<dyn ObjectStore>,
}

impl MeteredStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn ObjectStore> {
        &self.inner
    }
}

#[async_trait]
impl ObjectStore for MeteredStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let timer = Timer::store_fetch();
        let result = self.inner.get(bucket, key).await;
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(StoreError::NotFound { .. }) => Outcome::NotFound,
            Err(_) => Outcome::Failure,
        };
        let elapsed = timer.finish(outcome);
        tracing::debug!(bucket, key, outcome = outcome.as_str(), elapsed_ms = millis(elapsed), "store fetch");
        result
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        let size = bytes.len();
        let timer = Timer::store_upload();
        let result = self.inner.put(bucket, key, bytes, content_type).await;
        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        let elapsed = timer.finish(outcome);
        match &result {
            Ok(()) => {
                tracing::debug!(bucket, key, size, elapsed_ms = millis(elapsed), "store upload")
            }
            Err(e) => tracing::error!(bucket, key, error = %e, "store upload failed"),
        }
        result
    }

    async fn contains(&self, bucket: &str, key: &str) -> Result<bool> {
        self.inner.contains(bucket, key).await
    }
}
