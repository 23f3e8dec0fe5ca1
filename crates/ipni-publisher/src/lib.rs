//! # IPNI Publisher
//!
//! The advertisement chain engine. For each batch of queued records it
//! builds and signs one advertisement per record, links them into the
//! chain, stores them under their CIDs, overwrites the signed head and
//! announces the new head to an indexer node.
//!
//! ## Key Types
//!
//! - [`Publisher`] - Folds a batch into the chain
//! - [`ContentHandler`] - Packs multihashes into an entries block
//! - [`HeadFetcher`] - Where the published head comes from
//! - [`IndexerClient`] - Sends announce messages
//! - [`PublisherConfig`] - Environment-driven configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ipni_publisher::{Publisher, PublisherConfig, PublisherIdentities};
//! use ipni_publisher::core::Event;
//! use ipni_publisher::store::SqliteStore;
//!
//! async fn example() -> ipni_publisher::Result<()> {
//!     let config = PublisherConfig::from_env()?;
//!     let store = Arc::new(SqliteStore::open("objects.db")?);
//!     let identities = PublisherIdentities::load(store.as_ref(), &config).await?;
//!     let publisher = Publisher::from_config(config, store, identities)?;
//!
//!     let event = Event::from_bodies(["AnnounceHTTP"]);
//!     let report = publisher.process(&event).await?;
//!     println!("new head: {:?}", report.head);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ipni_publisher::core` - Codecs, identities, advertisements
//! - `ipni_publisher::store` - Object storage

pub mod config;
pub mod content;
pub mod error;
pub mod head;
pub mod identity;
pub mod indexer;
pub mod publisher;
pub mod storage;
pub mod telemetry;

pub use ipni_publisher_core as core;
pub use ipni_publisher_store as store;

pub use config::{ConfigError, PublisherConfig};
pub use content::ContentHandler;
pub use error::{PublisherError, Result};
pub use head::{resolve_previous, HeadFetcher, HttpHeadFetcher, StoreHeadFetcher};
pub use identity::PublisherIdentities;
pub use indexer::IndexerClient;
pub use publisher::{http_client, BatchReport, Publisher};
pub use storage::MeteredStore;
