//! Peer identity: Ed25519 keys in libp2p form and their peer IDs.
//!
//! Keys, peer IDs and the protobuf key encoding come from `libp2p-identity`.
//! This module adds the on-disk peer identity document and the
//! [`PeerIdentity`] handle that signers take explicitly.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

pub use libp2p_identity::{Keypair, PeerId, PublicKey};

/// Padded on output; unpadded documents are accepted too.
const KEY_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Parse a protobuf-encoded libp2p public key.
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::try_decode_protobuf(bytes).map_err(|e| CoreError::InvalidPublicKey(e.to_string()))
}

/// Check a raw signature over `message`.
pub fn verify(key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    if key.verify(message, signature) {
        Ok(())
    } else {
        Err(CoreError::InvalidSignature)
    }
}

/// On-disk peer identity document: base64 protobuf keys plus the peer ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerIdJson {
    pub id: String,
    #[serde(rename = "privKey")]
    pub priv_key: String,
    #[serde(rename = "pubKey", default, skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
}

/// A keypair together with its derived peer ID.
///
/// Passed explicitly to whatever signs; there is no process-wide identity.
#[derive(Clone)]
pub struct PeerIdentity {
    keypair: Keypair,
    peer_id: PeerId,
}

impl PeerIdentity {
    pub fn new(keypair: Keypair) -> Self {
        let peer_id = keypair.public().to_peer_id();
        Self { keypair, peer_id }
    }

    /// Ed25519 identity from a 32-byte secret key.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let keypair = Keypair::ed25519_from_bytes(*seed)
            .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::new(keypair))
    }

    pub fn generate() -> Self {
        Self::new(Keypair::generate_ed25519())
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public()
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Raw Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.keypair
            .sign(message)
            .map_err(|e| CoreError::Signing(e.to_string()))
    }

    /// Load from a peer identity JSON document.
    ///
    /// The `id` field must match the peer ID derived from `privKey`, and
    /// `pubKey`, when present, must match the derived public key.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: PeerIdJson = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::InvalidPrivateKey(format!("peer id json: {}", e)))?;
        let keypair = Keypair::from_protobuf_encoding(&base64_decode(&doc.priv_key)?)
            .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;
        let identity = Self::new(keypair);

        let declared: PeerId = doc
            .id
            .parse()
            .map_err(|e| CoreError::InvalidPeerId(format!("{}: {}", doc.id, e)))?;
        if declared != identity.peer_id {
            return Err(CoreError::InvalidPeerId(format!(
                "document id {} does not match key {}",
                declared, identity.peer_id
            )));
        }
        if let Some(pub_key) = doc.pub_key {
            let public = decode_public_key(&base64_decode(&pub_key)?)?;
            if public != identity.public_key() {
                return Err(CoreError::InvalidPublicKey(
                    "pubKey does not match privKey".into(),
                ));
            }
        }
        Ok(identity)
    }

    pub fn to_json(&self) -> Result<PeerIdJson> {
        let private = self
            .keypair
            .to_protobuf_encoding()
            .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;
        Ok(PeerIdJson {
            id: self.peer_id.to_string(),
            priv_key: KEY_BASE64.encode(private),
            pub_key: Some(KEY_BASE64.encode(self.public_key().encode_protobuf())),
        })
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerIdentity({})", self.peer_id)
    }
}

fn base64_decode(s: &str) -> Result<Vec<u8>> {
    KEY_BASE64
        .decode(s)
        .map_err(|e| CoreError::InvalidBase(e.to_string()))
}
