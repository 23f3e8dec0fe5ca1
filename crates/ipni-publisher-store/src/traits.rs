//! ObjectStore trait: the abstract interface for blob persistence.
//!
//! The publisher writes advertisements, content blocks and the chain head
//! as whole objects addressed by bucket and key. Implementations include
//! SQLite (persistent) and in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};

/// Content type for DAG-JSON advertisements, entries blocks and heads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An object as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Async interface for bucket/key object persistence.
///
/// # Design Notes
///
/// - **Overwrites**: `put` replaces any existing object under the same key.
///   Content-addressed keys make repeated writes idempotent; the `head` key
///   is the only one whose bytes change over time.
/// - **Missing objects**: `get` reports [`StoreError::NotFound`], which callers
///   can fold into `None` via [`ObjectStoreExt::get_optional`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Object Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch an object.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when nothing is stored under `bucket/key`.
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject>;

    /// Store an object, overwriting unconditionally.
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// Check whether an object exists.
    async fn contains(&self, bucket: &str, key: &str) -> Result<bool>;
}

/// Convenience methods layered over any [`ObjectStore`].
pub trait ObjectStoreExt: ObjectStore {
    /// Fetch an object, mapping a missing key to `None`.
    fn get_optional(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<StoredObject>>> + Send;

    /// Store DAG-JSON bytes.
    fn put_json(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {
    async fn get_optional(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>> {
        match self.get(bucket, key).await {
            Ok(object) => Ok(Some(object)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_json(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.put(bucket, key, Bytes::from(bytes), JSON_CONTENT_TYPE)
            .await
    }
}

/// Reject empty buckets and keys before they reach a backend.
pub(crate) fn validate_key(bucket: &str, key: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(StoreError::InvalidKey("empty bucket name".into()));
    }
    if key.is_empty() {
        return Err(StoreError::InvalidKey(format!("empty key in bucket {}", bucket)));
    }
    Ok(())
}
