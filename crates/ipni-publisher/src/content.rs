//! Content handler: packs a batch of multihashes into one entries block.
//!
//! The returned CID is what the caller queues for the advertisement
//! publisher.

use std::sync::Arc;
use std::time::Instant;

use ipni_publisher_core::{Cid, EntriesBlock, Event};
use ipni_publisher_store::{ObjectStore, ObjectStoreExt};

use crate::error::Result;
use crate::storage::MeteredStore;
use crate::telemetry::millis;

pub struct ContentHandler {
    store: MeteredStore,
    bucket: String,
}

impl ContentHandler {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store: MeteredStore::new(store),
            bucket: bucket.into(),
        }
    }

    /// Store an entries block listing every record's multihash (base58btc)
    /// and return its CID. An empty batch stores nothing.
    pub async fn process(&self, event: &Event) -> Result<Option<Cid>> {
        if event.is_empty() {
            tracing::info!("empty batch, no entries block");
            return Ok(None);
        }

        let start = Instant::now();
        let block = EntriesBlock::from_base58(event.records.iter().map(|r| r.body.as_str()))?;
        let (cid, bytes) = block.encode_with_cid()?;
        self.store
            .put_json(&self.bucket, &cid.to_string(), bytes)
            .await?;

        tracing::info!(
            cid = %cid,
            records = event.len(),
            elapsed_ms = millis(start.elapsed()),
            "Published {} records.",
            event.len()
        );
        Ok(Some(cid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipni_publisher_core::{codec, derive_cid};
    use ipni_publisher_store::MemoryStore;
    use ipni_publisher_testkit::TestFixture;

    #[tokio::test]
    async fn test_stores_block_under_its_cid() {
        let store = Arc::new(MemoryStore::new());
        let handler = ContentHandler::new(store.clone(), "ads");
        let (event, block) = TestFixture::new().multihash_event(3);

        let cid = handler.process(&event).await.unwrap().unwrap();
        assert_eq!(cid.codec(), codec::DAG_JSON);

        let object = store.get("ads", &cid.to_string()).await.unwrap();
        assert_eq!(derive_cid(codec::DAG_JSON, &object.bytes), cid);
        assert_eq!(EntriesBlock::decode(&object.bytes).unwrap(), block);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_batches() {
        let store = Arc::new(MemoryStore::new());
        let handler = ContentHandler::new(store.clone(), "ads");
        assert_eq!(handler.process(&Event::default()).await.unwrap(), None);

        assert!(handler.process(&Event::from_bodies(["0OIl"])).await.is_err());
        assert!(store.puts().is_empty());
    }
}
