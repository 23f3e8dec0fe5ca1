//! Indexer announce messages.
//!
//! The indexer's `PUT /ingest/announce` endpoint takes a DAG-CBOR array
//! `[cid, [multiaddr bytes…], extra data]`. The extra data element must be
//! present even when empty.

use ipld_core::ipld::Ipld;
use multiaddr::{Multiaddr, Protocol as AddrProtocol};

use crate::cid::Cid;
use crate::crypto::PeerId;
use crate::error::{CoreError, Result};

/// Content type of an encoded announce message.
pub const ANNOUNCE_CONTENT_TYPE: &str = "application/cbor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceMessage {
    pub cid: Cid,
    pub addrs: Vec<Multiaddr>,
    pub extra_data: Vec<u8>,
}

impl AnnounceMessage {
    pub fn new(cid: Cid, addrs: Vec<Multiaddr>) -> Self {
        Self {
            cid,
            addrs,
            extra_data: Vec::new(),
        }
    }

    pub fn to_value(&self) -> Ipld {
        let addrs = self.addrs.iter().map(|a| Ipld::Bytes(a.to_vec())).collect();
        Ipld::List(vec![
            Ipld::Link(self.cid),
            Ipld::List(addrs),
            Ipld::Bytes(self.extra_data.clone()),
        ])
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_ipld_dagcbor::to_vec(&self.to_value()).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Ipld =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| CoreError::Decoding(e.to_string()))?;
        let malformed = |what: &str| CoreError::Decoding(format!("announce message: {}", what));
        let items = match &value {
            Ipld::List(items) if items.len() == 3 => items,
            _ => return Err(malformed("expected a 3-element array")),
        };
        let cid = match &items[0] {
            Ipld::Link(cid) => *cid,
            _ => return Err(malformed("first element is not a link")),
        };
        let addrs = match &items[1] {
            Ipld::List(addrs) => addrs
                .iter()
                .map(|a| match a {
                    Ipld::Bytes(b) => Multiaddr::try_from(b.clone())
                        .map_err(|e| CoreError::InvalidMultiaddr(e.to_string())),
                    _ => Err(malformed("address is not bytes")),
                })
                .collect::<Result<_>>()?,
            _ => return Err(malformed("addresses are not an array")),
        };
        let extra_data = match &items[2] {
            Ipld::Bytes(b) => b.clone(),
            _ => return Err(malformed("extra data is not bytes")),
        };
        Ok(Self {
            cid,
            addrs,
            extra_data,
        })
    }
}

/// Where the indexer can fetch the chain: the bucket's public HTTPS endpoint.
pub fn bucket_announce_addr(bucket: &str, region: &str, peer: &PeerId) -> Result<Multiaddr> {
    let base: Multiaddr = format!("/dns4/{}.s3.{}.amazonaws.com/tcp/443/https", bucket, region)
        .parse()
        .map_err(|e: multiaddr::Error| CoreError::InvalidMultiaddr(e.to_string()))?;
    Ok(base.with(AddrProtocol::P2p(*peer)))
}

/// Append `/p2p/<peer>` to an explicitly configured address unless it
/// already names a peer.
pub fn with_peer(addr: Multiaddr, peer: &PeerId) -> Multiaddr {
    if addr.iter().any(|p| matches!(p, AddrProtocol::P2p(_))) {
        addr
    } else {
        addr.with(AddrProtocol::P2p(*peer))
    }
}
