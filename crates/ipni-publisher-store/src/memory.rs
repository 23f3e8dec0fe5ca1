//! In-memory implementation of the ObjectStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory, and records every write so tests can
//! assert on the order of uploads.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{validate_key, ObjectStore, StoredObject};

/// A single recorded `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
}

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Objects per bucket, keyed for sorted listing.
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,

    /// Every write in call order.
    puts: Vec<PutRecord>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                buckets: HashMap::new(),
                puts: Vec::new(),
            }),
        }
    }

    /// Writes performed so far, oldest first.
    pub fn puts(&self) -> Vec<PutRecord> {
        self.inner
            .read()
            .map(|inner| inner.puts.clone())
            .unwrap_or_default()
    }

    /// Number of writes to `bucket` so far.
    pub fn put_count(&self, bucket: &str) -> usize {
        self.puts().iter().filter(|p| p.bucket == bucket).count()
    }

    /// Number of distinct objects held in `bucket`.
    pub fn len(&self, bucket: &str) -> usize {
        self.inner
            .read()
            .map(|inner| inner.buckets.get(bucket).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn poisoned() -> StoreError {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "memory store lock poisoned",
        ))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        validate_key(bucket, key)?;
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        validate_key(bucket, key)?;
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        inner.buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        inner.puts.push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn contains(&self, bucket: &str, key: &str) -> Result<bool> {
        validate_key(bucket, key)?;
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner
            .buckets
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }
}
