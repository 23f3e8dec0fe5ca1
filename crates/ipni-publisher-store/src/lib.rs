//! # IPNI Publisher Store
//!
//! Object storage for the IPNI publisher. Advertisements, content entries
//! blocks, the chain head and peer identity documents are all whole objects
//! addressed by bucket and key.
//!
//! ## Key Types
//!
//! - [`ObjectStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests, with a write log
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ipni_publisher_store::{ObjectStore, ObjectStoreExt, SqliteStore};
//!
//! async fn example() -> ipni_publisher_store::Result<()> {
//!     let store = SqliteStore::open("objects.db")?;
//!     store.put_json("ads", "head", b"{}".to_vec()).await?;
//!     let head = store.get_optional("ads", "head").await?;
//!     assert!(head.is_some());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, PutRecord};
pub use sqlite::SqliteStore;
pub use traits::{ObjectStore, ObjectStoreExt, StoredObject, JSON_CONTENT_TYPE};
