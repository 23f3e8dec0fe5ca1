//! Batch references, queue events and content entries blocks.
//!
//! Record bodies are matched exactly: no whitespace is stripped, so
//! `"AnnounceHTTP\n"` is neither the sentinel nor a CID.

use ipld_core::ipld::Ipld;
use multibase::Base;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::cid::{codec, derive_cid, multihash_from_bytes, Cid, Multihash};
use crate::dagjson;
use crate::error::{CoreError, Result};

/// Record body asking for an extended-provider announcement with no content.
pub const ANNOUNCE_TRANSPORTS_SENTINEL: &str = "AnnounceHTTP";

/// What one queued record asks the engine to advertise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchReference {
    /// A previously stored entries block.
    Content(Cid),
    /// Re-announce every configured transport without new content.
    AnnounceTransports,
}

impl BatchReference {
    pub fn parse(body: &str) -> Result<Self> {
        body.parse()
    }

    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content(_))
    }
}

impl FromStr for BatchReference {
    type Err = CoreError;

    /// Any multibase CIDv1 or a base58btc CIDv0 is accepted.
    fn from_str(body: &str) -> Result<Self> {
        if body == ANNOUNCE_TRANSPORTS_SENTINEL {
            return Ok(Self::AnnounceTransports);
        }
        Cid::try_from(body)
            .map(Self::Content)
            .map_err(|e| CoreError::InvalidBatchReference(format!("{:?}: {}", body, e)))
    }
}

impl fmt::Display for BatchReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(cid) => write!(f, "{}", cid),
            Self::AnnounceTransports => f.write_str(ANNOUNCE_TRANSPORTS_SENTINEL),
        }
    }
}

/// One queued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub body: String,
}

/// A batch of queued messages, as delivered by the queue trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Records")]
    pub records: Vec<Record>,
}

impl Event {
    pub fn from_bodies<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: bodies
                .into_iter()
                .map(|b| Record { body: b.into() })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// A content block listing the multihashes an advertisement covers:
/// `{"Entries":[bytes…]}` in DAG-JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntriesBlock {
    pub entries: Vec<Multihash>,
}

impl EntriesBlock {
    /// Build from base58btc multihash strings, one per record.
    pub fn from_base58<'a, I>(multihashes: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = multihashes
            .into_iter()
            .map(|s| {
                let bytes = Base::Base58Btc
                    .decode(s)
                    .map_err(|e| CoreError::InvalidMultihash(format!("{:?}: {}", s, e)))?;
                multihash_from_bytes(&bytes)
            })
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    pub fn to_value(&self) -> Ipld {
        let entries = self
            .entries
            .iter()
            .map(|mh| Ipld::Bytes(mh.to_bytes()))
            .collect();
        Ipld::Map(BTreeMap::from([("Entries".to_string(), Ipld::List(entries))]))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        dagjson::encode(&self.to_value())
    }

    pub fn encode_with_cid(&self) -> Result<(Cid, Vec<u8>)> {
        let bytes = self.encode()?;
        Ok((derive_cid(codec::DAG_JSON, &bytes), bytes))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = dagjson::decode(bytes)?;
        let malformed = || CoreError::Decoding("entries block".into());
        let items = match &value {
            Ipld::Map(m) => match m.get("Entries") {
                Some(Ipld::List(items)) => items,
                _ => return Err(malformed()),
            },
            _ => return Err(malformed()),
        };
        let entries = items
            .iter()
            .map(|v| match v {
                Ipld::Bytes(b) => multihash_from_bytes(b),
                _ => Err(malformed()),
            })
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }
}
