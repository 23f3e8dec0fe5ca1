//! Publisher configuration.
//!
//! Everything comes from environment variables. Tests build a configuration
//! pointing at local mock servers with [`PublisherConfig::local_mock`].

use ipni_publisher_core::{bucket_announce_addr, with_peer, Multiaddr, PeerId};
use url::Url;

/// Default object key of the bitswap peer identity document.
pub const DEFAULT_PEER_ID_KEY: &str = "peerId.json";

/// Default object key of the HTTP peer identity document.
pub const DEFAULT_HTTP_PEER_ID_KEY: &str = "peerId-http.json";

const DEFAULT_REGION: &str = "us-west-2";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for one publisher deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Bucket holding advertisements, content blocks and the head.
    pub bucket: String,
    /// Region of `bucket`, used for its public endpoint.
    pub region: String,
    /// Base URL of the indexer node.
    pub indexer_url: Url,
    /// Base URL the head document is fetched from (`<head_url>/head`).
    pub head_url: Url,
    /// Address advertised for the bitswap provider.
    pub bitswap_addr: String,
    /// Address advertised for the HTTP provider.
    pub http_addr: String,
    /// Address sent in announce messages. Defaults to the bucket's endpoint.
    pub announce_addr: Option<Multiaddr>,
    /// Bucket holding the peer identity documents.
    pub peer_id_bucket: String,
    /// Key of the bitswap peer identity document.
    pub peer_id_key: String,
    /// Key of the HTTP peer identity document.
    pub http_peer_id_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl PublisherConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `S3_BUCKET` (required)
    /// - `AWS_REGION` (default: `us-west-2`)
    /// - `INDEXER_NODE_URL` (required)
    /// - `BITSWAP_PEER_MULTIADDR` (required)
    /// - `HTTP_PEER_MULTIADDR` (required)
    /// - `HEAD_URL` (default: `https://<bucket>.s3.<region>.amazonaws.com`)
    /// - `ANNOUNCE_MULTIADDR` (optional)
    /// - `PEER_ID_BUCKET` (default: `S3_BUCKET`)
    /// - `PEER_ID_KEY` (default: `peerId.json`)
    /// - `HTTP_PEER_ID_KEY` (default: `peerId-http.json`)
    /// - `HTTP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::Missing(var.to_string()))
        };

        let bucket = required("S3_BUCKET")?;
        let region = lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let head_url = match lookup("HEAD_URL") {
            Some(raw) => parse_url("HEAD_URL", &raw)?,
            None => parse_url(
                "HEAD_URL",
                &format!("https://{}.s3.{}.amazonaws.com", bucket, region),
            )?,
        };
        let announce_addr = lookup("ANNOUNCE_MULTIADDR")
            .map(|raw| parse_multiaddr("ANNOUNCE_MULTIADDR", &raw))
            .transpose()?;
        let bitswap_addr = required("BITSWAP_PEER_MULTIADDR")?;
        let http_addr = required("HTTP_PEER_MULTIADDR")?;
        parse_multiaddr("BITSWAP_PEER_MULTIADDR", &bitswap_addr)?;
        parse_multiaddr("HTTP_PEER_MULTIADDR", &http_addr)?;

        let timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("HTTP_TIMEOUT_SECS".into(), raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            indexer_url: parse_url("INDEXER_NODE_URL", &required("INDEXER_NODE_URL")?)?,
            head_url,
            bitswap_addr,
            http_addr,
            announce_addr,
            peer_id_bucket: lookup("PEER_ID_BUCKET").unwrap_or_else(|| bucket.clone()),
            peer_id_key: lookup("PEER_ID_KEY").unwrap_or_else(|| DEFAULT_PEER_ID_KEY.to_string()),
            http_peer_id_key: lookup("HTTP_PEER_ID_KEY")
                .unwrap_or_else(|| DEFAULT_HTTP_PEER_ID_KEY.to_string()),
            bucket,
            region,
            timeout_secs,
        })
    }

    /// Create a configuration pointing at local mock servers (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if either URL cannot be parsed.
    pub fn local_mock(head_url: &str, indexer_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: "advertisements".to_string(),
            region: DEFAULT_REGION.to_string(),
            indexer_url: parse_url("INDEXER_NODE_URL", indexer_url)?,
            head_url: parse_url("HEAD_URL", head_url)?,
            bitswap_addr: "/dns4/elastic.dag.house/tcp/443/wss".to_string(),
            http_addr: "/dns4/freeway.dag.house/tcp/443/https".to_string(),
            announce_addr: None,
            peer_id_bucket: "keys".to_string(),
            peer_id_key: DEFAULT_PEER_ID_KEY.to_string(),
            http_peer_id_key: DEFAULT_HTTP_PEER_ID_KEY.to_string(),
            timeout_secs: 5,
        })
    }

    /// `<head_url>/head`.
    pub fn head_document_url(&self) -> String {
        format!("{}/head", self.head_url.as_str().trim_end_matches('/'))
    }

    /// `<indexer_url>/ingest/announce`.
    pub fn announce_url(&self) -> String {
        format!(
            "{}/ingest/announce",
            self.indexer_url.as_str().trim_end_matches('/')
        )
    }

    /// Addresses sent to the indexer, each ending in `/p2p/<peer>`.
    pub fn announce_addrs(&self, peer: &PeerId) -> Result<Vec<Multiaddr>, ConfigError> {
        let addr = match &self.announce_addr {
            Some(addr) => with_peer(addr.clone(), peer),
            None => bucket_announce_addr(&self.bucket, &self.region, peer)
                .map_err(|e| ConfigError::InvalidMultiaddr("S3_BUCKET".into(), e.to_string()))?,
        };
        Ok(vec![addr])
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn parse_multiaddr(var: &str, raw: &str) -> Result<Multiaddr, ConfigError> {
    raw.trim()
        .parse::<Multiaddr>()
        .map_err(|e| ConfigError::InvalidMultiaddr(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid multiaddr for {0}: {1}")]
    InvalidMultiaddr(String, String),
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(String, String),
}
