//! SQLite implementation of the ObjectStore trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{validate_key, ObjectStore, StoredObject};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        validate_key(bucket, key)?;
        let (bucket, key) = (bucket.to_string(), key.to_string());

        self.run(move |conn| {
            let row: Option<(Vec<u8>, String)> = conn
                .query_row(
                    "SELECT bytes, content_type FROM objects WHERE bucket = ?1 AND key = ?2",
                    params![bucket, key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((bytes, content_type)) => Ok(StoredObject {
                    bytes: Bytes::from(bytes),
                    content_type,
                }),
                None => Err(StoreError::not_found(&bucket, &key)),
            }
        })
        .await
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        validate_key(bucket, key)?;
        let (bucket, key, content_type) =
            (bucket.to_string(), key.to_string(), content_type.to_string());

        self.run(move |conn| {
            let now = now_millis();
            conn.execute(
                "INSERT INTO objects (bucket, key, content_type, bytes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(bucket, key) DO UPDATE SET
                    content_type = excluded.content_type,
                    bytes = excluded.bytes,
                    updated_at = excluded.updated_at",
                params![bucket, key, content_type, bytes.as_ref(), now],
            )?;
            Ok(())
        })
        .await
    }

    async fn contains(&self, bucket: &str, key: &str) -> Result<bool> {
        validate_key(bucket, key)?;
        let (bucket, key) = (bucket.to_string(), key.to_string());

        self.run(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM objects WHERE bucket = ?1 AND key = ?2",
                    params![bucket, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ObjectStoreExt, JSON_CONTENT_TYPE};

    #[tokio::test]
    async fn test_put_and_get() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .put("ads", "baguqeera", Bytes::from_static(b"{\"a\":1}"), JSON_CONTENT_TYPE)
            .await
            .unwrap();

        let object = store.get("ads", "baguqeera").await.unwrap();
        assert_eq!(object.bytes.as_ref(), b"{\"a\":1}");
        assert_eq!(object.content_type, JSON_CONTENT_TYPE);
        assert!(store.contains("ads", "baguqeera").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store.get("ads", "head").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref bucket, ref key } if bucket == "ads" && key == "head"));
        assert_eq!(store.get_optional("ads", "head").await.unwrap(), None);
        assert!(!store.contains("ads", "head").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_bytes() {
        let store = SqliteStore::open_memory().unwrap();
        store.put_json("ads", "head", b"1".to_vec()).await.unwrap();
        store
            .put("ads", "head", Bytes::from_static(b"2"), "text/plain")
            .await
            .unwrap();

        let object = store.get("ads", "head").await.unwrap();
        assert_eq!(object.bytes.as_ref(), b"2");
        assert_eq!(object.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let store = SqliteStore::open_memory().unwrap();
        store.put_json("ads", "peerId.json", b"1".to_vec()).await.unwrap();
        store.put_json("keys", "peerId.json", b"2".to_vec()).await.unwrap();

        assert_eq!(store.get("ads", "peerId.json").await.unwrap().bytes.as_ref(), b"1");
        assert_eq!(store.get("keys", "peerId.json").await.unwrap().bytes.as_ref(), b"2");
        assert!(!store.contains("none", "peerId.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_json("ads", "head", b"{}".to_vec()).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("ads", "head").await.unwrap().bytes.as_ref(), b"{}");
    }
}
