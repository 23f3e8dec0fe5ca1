//! # IPNI Publisher Core
//!
//! Pure primitives for publishing IPNI advertisement chains: content
//! identifiers, canonical codecs, peer identity, signed envelopes,
//! advertisements and the chain head record.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Cid`] - Content identifier derived from canonical bytes
//! - [`Advertisement`] - A signed link in the chain, single or extended form
//! - [`AdvertisementBuilder`] - Builds and signs advertisements from batch references
//! - [`ChainHead`] - Signed pointer to the latest advertisement
//! - [`PeerIdentity`] - Keypair plus derived peer ID, passed explicitly to signers
//! - [`AnnounceMessage`] - DAG-CBOR message telling an indexer about a new head
//!
//! ## Canonicalization
//!
//! Records are built as IPLD values ([`Ipld`]). Advertisements and heads are
//! DAG-JSON ([`dagjson`]); announce messages are DAG-CBOR via
//! `serde_ipld_dagcbor`. Both encoders are deterministic, so the same record
//! always yields the same CID.
//!
//! CIDs, multihashes, multiaddrs, peer IDs and signed envelopes are the
//! multiformats and libp2p types, re-exported here.

pub mod advertisement;
pub mod announce;
pub mod batch;
pub mod cid;
pub mod crypto;
pub mod dagjson;
pub mod envelope;
pub mod error;
pub mod head;
pub mod metadata;
pub mod signature;

pub use advertisement::{
    build, Advertisement, AdvertisementBuilder, AdvertisementKind, Provider, ProviderInfo,
    MAX_CONTEXT_ID_LEN,
};
pub use announce::{bucket_announce_addr, with_peer, AnnounceMessage, ANNOUNCE_CONTENT_TYPE};
pub use batch::{BatchReference, EntriesBlock, Event, Record, ANNOUNCE_TRANSPORTS_SENTINEL};
pub use crate::cid::{codec, derive_cid, no_entries, parse_cid, sha2_256, Cid, Multihash};
pub use crypto::{Keypair, PeerId, PeerIdJson, PeerIdentity, PublicKey};
pub use envelope::{OpenedEnvelope, AD_SIGNATURE_CODEC, AD_SIGNATURE_DOMAIN};
pub use error::{CoreError, Result};
pub use head::{parse_head_document, ChainHead, HEAD_KEY};
pub use metadata::{Protocol, MAX_METADATA_LEN};
pub use signature::{compute_advertisement_signature, provider_signature, verify_signature};

pub use ipld_core::ipld::Ipld;
pub use multiaddr::Multiaddr;
