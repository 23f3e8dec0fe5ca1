//! Signed record envelopes for advertisement signatures.
//!
//! Sealing and opening go through libp2p's [`SignedEnvelope`], which binds a
//! domain string and a payload type to the payload so a signature made for
//! one purpose cannot be replayed for another with the same key. The
//! marshaled form is the libp2p envelope protobuf: signer public key
//! (field 1), payload type (2), payload (3) and signature (5).

use libp2p_core::signed_envelope::ReadPayloadError;
use libp2p_core::SignedEnvelope;

use crate::crypto::{PeerId, PeerIdentity};
use crate::error::{CoreError, Result};

/// Domain for advertisement signatures.
pub const AD_SIGNATURE_DOMAIN: &str = "indexer";

/// Payload type for advertisement signatures.
pub const AD_SIGNATURE_CODEC: &[u8] = b"/indexer/ingest/adSignature";

/// The signer and payload of an envelope whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedEnvelope {
    pub signer: PeerId,
    pub payload: Vec<u8>,
}

/// Sign `payload` as an advertisement signature, returning the marshaled
/// envelope.
pub fn seal(identity: &PeerIdentity, payload: Vec<u8>) -> Result<Vec<u8>> {
    let envelope = SignedEnvelope::new(
        identity.keypair(),
        AD_SIGNATURE_DOMAIN.to_string(),
        AD_SIGNATURE_CODEC.to_vec(),
        payload,
    )
    .map_err(|e| CoreError::Signing(e.to_string()))?;
    Ok(envelope.into_protobuf_encoding())
}

/// Parse a marshaled envelope and verify it as an advertisement signature.
pub fn open(bytes: &[u8]) -> Result<OpenedEnvelope> {
    let envelope = SignedEnvelope::from_protobuf_encoding(bytes)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let (payload, key) = envelope
        .payload_and_signing_key(AD_SIGNATURE_DOMAIN.to_string(), AD_SIGNATURE_CODEC)
        .map_err(|e| match e {
            ReadPayloadError::InvalidSignature => CoreError::InvalidSignature,
            other => CoreError::InvalidEnvelope(other.to_string()),
        })?;
    Ok(OpenedEnvelope {
        signer: key.to_peer_id(),
        payload: payload.to_vec(),
    })
}
