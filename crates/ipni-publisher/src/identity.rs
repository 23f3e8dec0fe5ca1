//! Peer identities used to sign advertisements.
//!
//! Identities are loaded once per invocation from peer-id JSON documents in
//! the object store and then passed explicitly to everything that signs.

use ipni_publisher_core::{PeerIdentity, Protocol, ProviderInfo};
use ipni_publisher_store::{ObjectStore, ObjectStoreExt};

use crate::config::PublisherConfig;
use crate::error::{PublisherError, Result};

/// The identities one publisher signs with.
#[derive(Debug, Clone)]
pub struct PublisherIdentities {
    /// Signs every advertisement, the chain head and the announce address.
    pub bitswap: PeerIdentity,
    /// Signs the HTTP entry of extended-provider advertisements.
    pub http: Option<PeerIdentity>,
}

impl PublisherIdentities {
    pub fn new(bitswap: PeerIdentity, http: Option<PeerIdentity>) -> Self {
        Self { bitswap, http }
    }

    /// Load both identities. The bitswap document is required; a missing HTTP
    /// document leaves `http` unset.
    pub async fn load(store: &dyn ObjectStore, config: &PublisherConfig) -> Result<Self> {
        let bucket = &config.peer_id_bucket;
        let bitswap = load_identity(store, bucket, &config.peer_id_key)
            .await?
            .ok_or_else(|| {
                PublisherError::Identity(format!(
                    "peer identity {}/{} not found",
                    bucket, config.peer_id_key
                ))
            })?;
        let http = load_identity(store, bucket, &config.http_peer_id_key).await?;
        if http.is_none() {
            tracing::warn!(
                bucket = %bucket,
                key = %config.http_peer_id_key,
                "HTTP peer identity not found; extended provider announcements are disabled"
            );
        }

        tracing::info!(
            bitswap = %bitswap.peer_id(),
            http = ?http.as_ref().map(|i| i.peer_id().to_string()),
            "loaded peer identities"
        );
        Ok(Self { bitswap, http })
    }

    /// The bitswap provider alone, for content advertisements.
    pub fn content_providers(&self, config: &PublisherConfig) -> Vec<ProviderInfo> {
        vec![ProviderInfo::new(
            self.bitswap.clone(),
            Protocol::Bitswap,
            vec![config.bitswap_addr.clone()],
        )]
    }

    /// Bitswap then HTTP, for extended-provider advertisements.
    pub fn transport_providers(&self, config: &PublisherConfig) -> Result<Vec<ProviderInfo>> {
        let http = self.http.clone().ok_or_else(|| {
            PublisherError::Identity("no HTTP peer identity to announce the HTTP transport".into())
        })?;
        let mut providers = self.content_providers(config);
        providers.push(ProviderInfo::new(
            http,
            Protocol::Http,
            vec![config.http_addr.clone()],
        ));
        Ok(providers)
    }
}

async fn load_identity(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Option<PeerIdentity>> {
    let Some(object) = store.get_optional(bucket, key).await? else {
        return Ok(None);
    };
    PeerIdentity::from_json(&object.bytes)
        .map(Some)
        .map_err(|e| PublisherError::Identity(format!("{}/{}: {}", bucket, key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipni_publisher_store::MemoryStore;

    fn config() -> PublisherConfig {
        PublisherConfig::local_mock("http://127.0.0.1:1", "http://127.0.0.1:2").unwrap()
    }

    async fn put_identity(store: &MemoryStore, key: &str, identity: &PeerIdentity) {
        let json = serde_json::to_vec(&identity.to_json().unwrap()).unwrap();
        store.put_json("keys", key, json).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_both() {
        let store = MemoryStore::new();
        let bitswap = PeerIdentity::from_seed(&[1; 32]).unwrap();
        let http = PeerIdentity::from_seed(&[2; 32]).unwrap();
        put_identity(&store, "peerId.json", &bitswap).await;
        put_identity(&store, "peerId-http.json", &http).await;

        let ids = PublisherIdentities::load(&store, &config()).await.unwrap();
        assert_eq!(ids.bitswap.peer_id(), bitswap.peer_id());
        assert_eq!(ids.http.as_ref().map(|i| i.peer_id()), Some(http.peer_id()));

        let providers = ids.transport_providers(&config()).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].protocol, Protocol::Bitswap);
        assert_eq!(providers[1].protocol, Protocol::Http);
        assert_eq!(providers[1].addresses, vec![config().http_addr]);
    }

    #[tokio::test]
    async fn test_missing_bitswap_identity() {
        let store = MemoryStore::new();
        let err = PublisherIdentities::load(&store, &config()).await.unwrap_err();
        assert!(matches!(err, PublisherError::Identity(_)));
    }

    #[tokio::test]
    async fn test_missing_http_identity() {
        let store = MemoryStore::new();
        put_identity(&store, "peerId.json", &PeerIdentity::from_seed(&[1; 32]).unwrap()).await;

        let ids = PublisherIdentities::load(&store, &config()).await.unwrap();
        assert!(ids.http.is_none());
        assert_eq!(ids.content_providers(&config()).len(), 1);
        assert!(ids.transport_providers(&config()).is_err());
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let store = MemoryStore::new();
        store
            .put_json("keys", "peerId.json", b"{\"id\":\"x\"}".to_vec())
            .await
            .unwrap();
        assert!(PublisherIdentities::load(&store, &config()).await.is_err());
    }
}
