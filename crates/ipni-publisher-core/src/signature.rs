//! Advertisement signing payloads.
//!
//! The byte layouts here are fixed by the indexer's verifier; any deviation
//! yields advertisements the network silently rejects.
//!
//! Advertisement:
//!
//! ```text
//! previous? || entries || provider || addresses... || metadata || is_rm
//! ```
//!
//! Extended provider entry:
//!
//! ```text
//! previous? || entries || ad.provider || context_id || p.id || p.addresses... || p.metadata || override
//! ```
//!
//! The concatenation is hashed to a sha2-256 multihash, which becomes the
//! payload of a signed envelope under the `indexer` domain.

use crate::advertisement::Provider;
use crate::cid::{sha2_256, Cid};
use crate::crypto::PeerIdentity;
use crate::envelope;
use crate::error::{CoreError, Result};

/// The fields covered by an advertisement's top-level signature.
#[derive(Debug, Clone, Copy)]
pub struct AdSigningFields<'a> {
    pub previous: Option<&'a Cid>,
    pub provider: &'a str,
    pub addresses: &'a [String],
    pub entries: &'a Cid,
    pub metadata: &'a [u8],
    pub is_rm: bool,
}

/// The fields covered by one extended provider entry's signature.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSigningFields<'a> {
    pub previous: Option<&'a Cid>,
    pub ad_provider: &'a str,
    pub entries: &'a Cid,
    pub context_id: &'a [u8],
    pub provider: &'a Provider,
    pub override_: bool,
}

/// Concatenated bytes signed for an advertisement.
pub fn advertisement_signing_bytes(fields: &AdSigningFields<'_>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Some(prev) = fields.previous {
        buf.extend_from_slice(&prev.to_bytes());
    }
    buf.extend_from_slice(&fields.entries.to_bytes());
    buf.extend_from_slice(fields.provider.as_bytes());
    for addr in fields.addresses {
        buf.extend_from_slice(addr.as_bytes());
    }
    buf.extend_from_slice(fields.metadata);
    buf.push(fields.is_rm as u8);
    buf
}

/// Concatenated bytes signed for an extended provider entry.
pub fn provider_signing_bytes(fields: &ProviderSigningFields<'_>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Some(prev) = fields.previous {
        buf.extend_from_slice(&prev.to_bytes());
    }
    buf.extend_from_slice(&fields.entries.to_bytes());
    buf.extend_from_slice(fields.ad_provider.as_bytes());
    buf.extend_from_slice(fields.context_id);
    buf.extend_from_slice(fields.provider.id.as_bytes());
    for addr in &fields.provider.addresses {
        buf.extend_from_slice(addr.as_bytes());
    }
    buf.extend_from_slice(&fields.provider.metadata);
    buf.push(fields.override_ as u8);
    buf
}

/// Envelope payload: the sha2-256 multihash of the signing bytes.
pub fn signature_payload(signing_bytes: &[u8]) -> Vec<u8> {
    sha2_256(signing_bytes).to_bytes()
}

/// Sign an advertisement, returning the marshaled envelope.
pub fn compute_advertisement_signature(
    signer: &PeerIdentity,
    fields: &AdSigningFields<'_>,
) -> Result<Vec<u8>> {
    envelope::seal(signer, signature_payload(&advertisement_signing_bytes(fields)))
}

/// Sign an extended provider entry with that provider's own key.
pub fn provider_signature(
    signer: &PeerIdentity,
    fields: &ProviderSigningFields<'_>,
) -> Result<Vec<u8>> {
    envelope::seal(signer, signature_payload(&provider_signing_bytes(fields)))
}

/// Open `envelope`, check it was signed by `expected_signer`, and check its
/// payload matches `signing_bytes`.
pub fn verify_signature(envelope: &[u8], expected_signer: &str, signing_bytes: &[u8]) -> Result<()> {
    let opened = envelope::open(envelope)?;
    let signer = opened.signer.to_string();
    if signer != expected_signer {
        return Err(CoreError::SignerMismatch {
            signer,
            expected: expected_signer.to_string(),
        });
    }
    if opened.payload != signature_payload(signing_bytes).as_slice() {
        return Err(CoreError::PayloadMismatch(expected_signer.to_string()));
    }
    Ok(())
}
