//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Identities are seeded, so peer
//! IDs and signatures are identical on every run.

use std::sync::Arc;

use ipni_publisher_core::{
    codec, derive_cid, sha2_256, Cid, EntriesBlock, Event, Multihash, PeerIdentity, Protocol,
    ProviderInfo,
};
use multibase::Base;
use ipni_publisher_store::{MemoryStore, ObjectStoreExt, Result};

/// Bitswap provider address used by fixtures.
pub const BITSWAP_ADDR: &str = "/dns4/elastic.dag.house/tcp/443/wss";

/// HTTP provider address used by fixtures.
pub const HTTP_ADDR: &str = "/dns4/freeway.dag.house/tcp/443/https";

/// Seed of the bitswap identity.
pub const BITSWAP_SEED: [u8; 32] = [1; 32];

/// Seed of the HTTP identity.
pub const HTTP_SEED: [u8; 32] = [2; 32];

/// A stand-in entries CID, distinct per `n`.
pub fn content_cid(n: u8) -> Cid {
    derive_cid(codec::DAG_JSON, &[n])
}

/// A test fixture with both identities and a memory store.
pub struct TestFixture {
    pub bitswap: PeerIdentity,
    pub http: PeerIdentity,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a fixture with the seeded identities.
    pub fn new() -> Self {
        Self {
            bitswap: PeerIdentity::from_seed(&BITSWAP_SEED).expect("bitswap seed is a valid key"),
            http: PeerIdentity::from_seed(&HTTP_SEED).expect("http seed is a valid key"),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Write both peer identity documents (`peerId.json`, `peerId-http.json`)
    /// into `bucket`.
    pub async fn store_identities(&self, bucket: &str) -> Result<()> {
        for (key, identity) in [("peerId.json", &self.bitswap), ("peerId-http.json", &self.http)] {
            let doc = identity.to_json().expect("ed25519 keys encode");
            let json = serde_json::to_vec(&doc).expect("peer id document serializes");
            self.store.put_json(bucket, key, json).await?;
        }
        Ok(())
    }

    /// The bitswap provider alone.
    pub fn content_providers(&self) -> Vec<ProviderInfo> {
        vec![ProviderInfo::new(
            self.bitswap.clone(),
            Protocol::Bitswap,
            vec![BITSWAP_ADDR.to_string()],
        )]
    }

    /// Bitswap then HTTP.
    pub fn transport_providers(&self) -> Vec<ProviderInfo> {
        let mut providers = self.content_providers();
        providers.push(ProviderInfo::new(
            self.http.clone(),
            Protocol::Http,
            vec![HTTP_ADDR.to_string()],
        ));
        providers
    }

    /// An event with one content reference per `n`.
    pub fn content_event(&self, ns: &[u8]) -> Event {
        Event::from_bodies(ns.iter().map(|n| content_cid(*n).to_string()))
    }

    /// An event of base58btc multihashes, as the content handler consumes.
    pub fn multihash_event(&self, count: u8) -> (Event, EntriesBlock) {
        let entries: Vec<Multihash> = (0..count).map(|i| sha2_256(&[i])).collect();
        let event = Event::from_bodies(entries.iter().map(|mh| Base::Base58Btc.encode(mh.to_bytes())));
        (event, EntriesBlock { entries })
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
