//! The chain publisher: turns a batch of queued records into advertisements,
//! links them into the chain, moves the head and tells the indexer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ipni_publisher_core::{
    build, Advertisement, AnnounceMessage, BatchReference, ChainHead, Cid, Event, Record, HEAD_KEY,
};
use ipni_publisher_store::{ObjectStore, ObjectStoreExt};
use serde::{Serialize, Serializer};

use crate::config::PublisherConfig;
use crate::error::{PublisherError, Result};
use crate::head::{resolve_previous, HeadFetcher, HttpHeadFetcher};
use crate::identity::PublisherIdentities;
use crate::indexer::IndexerClient;
use crate::storage::MeteredStore;
use crate::telemetry::millis;

/// What one batch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Advertisement CIDs in chain order.
    #[serde(serialize_with = "cids_as_strings")]
    pub published: Vec<Cid>,
    /// The head written at the end of the batch.
    #[serde(serialize_with = "cid_as_string")]
    pub head: Option<Cid>,
    /// Whether the indexer acknowledged the announcement.
    pub announced: bool,
}

fn cids_as_strings<S: Serializer>(cids: &[Cid], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(cids.iter().map(Cid::to_string))
}

fn cid_as_string<S: Serializer>(
    cid: &Option<Cid>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match cid {
        Some(cid) => serializer.collect_str(cid),
        None => serializer.serialize_none(),
    }
}

/// The advertisement chain engine.
///
/// Processes one batch at a time. Concurrent publishers sharing a bucket race
/// on the head record and the last writer wins.
pub struct Publisher {
    config: PublisherConfig,
    store: MeteredStore,
    head: Arc<dyn HeadFetcher>,
    indexer: IndexerClient,
    identities: PublisherIdentities,
}

impl Publisher {
    pub fn new(
        config: PublisherConfig,
        store: Arc<dyn ObjectStore>,
        head: Arc<dyn HeadFetcher>,
        indexer: IndexerClient,
        identities: PublisherIdentities,
    ) -> Self {
        Self {
            config,
            store: MeteredStore::new(store),
            head,
            indexer,
            identities,
        }
    }

    /// Wire up the HTTP head fetcher and indexer client from `config`.
    pub fn from_config(
        config: PublisherConfig,
        store: Arc<dyn ObjectStore>,
        identities: PublisherIdentities,
    ) -> Result<Self> {
        let http = http_client(&config)?;
        let head = Arc::new(HttpHeadFetcher::new(http.clone(), config.head_document_url()));
        let indexer = IndexerClient::new(http, config.announce_url());
        Ok(Self::new(config, store, head, indexer, identities))
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn identities(&self) -> &PublisherIdentities {
        &self.identities
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Batch
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish one advertisement per record, then update the head and
    /// announce it.
    ///
    /// The chain is threaded through the batch: each record's previous link
    /// is the advertisement published just before it, and only the first
    /// record consults the published head. An empty batch does nothing.
    ///
    /// # Errors
    ///
    /// The first failing record aborts the batch. Advertisements already
    /// stored stay stored, and the head is left untouched. A failed
    /// announcement is logged and reported through
    /// [`BatchReport::announced`] instead.
    pub async fn process(&self, event: &Event) -> Result<BatchReport> {
        if event.is_empty() {
            tracing::info!("empty batch, nothing to publish");
            return Ok(BatchReport::default());
        }

        let start = Instant::now();
        let mut last: Option<Cid> = None;
        let mut published = Vec::with_capacity(event.len());

        for (index, record) in event.records.iter().enumerate() {
            match self.step(index, record, last.take()).await {
                Ok(cid) => {
                    published.push(cid);
                    last = Some(cid);
                }
                Err(e) => {
                    tracing::error!(
                        index,
                        published = published.len(),
                        error = %e,
                        "cannot publish an advertisement"
                    );
                    return Err(e);
                }
            }
        }

        let Some(head) = last else {
            return Ok(BatchReport::default());
        };
        self.update_head(&head).await?;
        let announced = self.notify_indexer(&head).await;

        tracing::info!(
            records = event.len(),
            head = %head,
            announced,
            elapsed_ms = millis(start.elapsed()),
            "published {} advertisements",
            published.len()
        );
        Ok(BatchReport {
            published,
            head: Some(head),
            announced,
        })
    }

    /// One fold step: resolve the previous link, build, sign and store.
    async fn step(&self, index: usize, record: &Record, local: Option<Cid>) -> Result<Cid> {
        let previous = resolve_previous(local, self.head.as_ref()).await?;
        let reference = BatchReference::parse(&record.body)
            .map_err(|source| PublisherError::Record { index, source })?;

        let providers = match &reference {
            BatchReference::Content(_) => self.identities.content_providers(&self.config),
            BatchReference::AnnounceTransports => {
                self.identities.transport_providers(&self.config)?
            }
        };
        let ad = build(&reference, previous, &providers)
            .map_err(|source| PublisherError::Record { index, source })?;

        self.publish(&ad).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chain operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an advertisement under its CID string.
    pub async fn publish(&self, ad: &Advertisement) -> Result<Cid> {
        let (cid, bytes) = ad.encode_with_cid()?;
        self.store
            .put_json(&self.config.bucket, &cid.to_string(), bytes)
            .await?;
        tracing::info!(
            cid = %cid,
            previous = ?ad.previous.as_ref().map(Cid::to_string),
            extended = ad.is_extended(),
            "stored advertisement"
        );
        Ok(cid)
    }

    /// Sign `cid` as the new head and overwrite the head record.
    pub async fn update_head(&self, cid: &Cid) -> Result<ChainHead> {
        let head = ChainHead::sign(*cid, &self.identities.bitswap)?;
        self.store
            .put_json(&self.config.bucket, HEAD_KEY, head.encode()?)
            .await?;
        tracing::info!(head = %cid, "updated head");
        Ok(head)
    }

    /// Announce `cid` to the indexer.
    ///
    /// Failures end here: they are logged with status and body, and the
    /// return value says whether the indexer accepted the announcement.
    pub async fn notify_indexer(&self, cid: &Cid) -> bool {
        let result: Result<()> = async {
            let addrs = self
                .config
                .announce_addrs(self.identities.bitswap.peer_id())?;
            let message = AnnounceMessage::new(*cid, addrs);
            self.indexer.announce(&message).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(PublisherError::Announce { status, body }) => {
                tracing::error!(
                    status,
                    body = %body,
                    "announcing to the indexer node failed with status code {}",
                    status
                );
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "announcing to the indexer node failed");
                false
            }
        }
    }
}

/// The shared HTTP client, with the configured timeout.
pub fn http_client(config: &PublisherConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| PublisherError::Http {
            endpoint: "client_init".into(),
            source: e,
        })
}
