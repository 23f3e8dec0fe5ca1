//! The chain head record.
//!
//! A small signed DAG-JSON document pointing at the latest advertisement:
//!
//! ```json
//! {"head":{"/":"<cid>"},"pubkey":{"/":{"bytes":"…"}},"sig":{"/":{"bytes":"…"}}}
//! ```
//!
//! `pubkey` is the marshaled libp2p public key and `sig` is a raw Ed25519
//! signature over the binary head CID. The record is overwritten on every
//! successful batch and is not itself chained.

use std::collections::BTreeMap;

use ipld_core::ipld::Ipld;
use serde::Deserialize;

use crate::cid::{parse_cid, Cid};
use crate::crypto::{self, decode_public_key, PeerId, PeerIdentity, PublicKey};
use crate::dagjson;
use crate::error::{CoreError, Result};

/// Object key the head record is stored under.
pub const HEAD_KEY: &str = "head";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHead {
    pub head: Cid,
    pub pubkey: Vec<u8>,
    pub sig: Vec<u8>,
}

impl ChainHead {
    pub fn sign(head: Cid, identity: &PeerIdentity) -> Result<Self> {
        let sig = identity.sign(&head.to_bytes())?;
        Ok(Self {
            head,
            pubkey: identity.public_key().encode_protobuf(),
            sig,
        })
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        decode_public_key(&self.pubkey)
    }

    pub fn signer(&self) -> Result<PeerId> {
        Ok(self.public_key()?.to_peer_id())
    }

    pub fn verify(&self) -> Result<()> {
        crypto::verify(&self.public_key()?, &self.head.to_bytes(), &self.sig)
    }

    pub fn to_value(&self) -> Ipld {
        Ipld::Map(BTreeMap::from([
            ("head".to_string(), Ipld::Link(self.head)),
            ("pubkey".to_string(), Ipld::Bytes(self.pubkey.clone())),
            ("sig".to_string(), Ipld::Bytes(self.sig.clone())),
        ]))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        dagjson::encode(&self.to_value())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = dagjson::decode(bytes).map_err(|e| CoreError::MalformedHead(e.to_string()))?;
        let map = match &value {
            Ipld::Map(m) => m,
            _ => return Err(CoreError::MalformedHead("not a map".into())),
        };
        let head = match map.get("head") {
            Some(Ipld::Link(cid)) => *cid,
            _ => return Err(CoreError::MalformedHead("missing head".into())),
        };
        let bytes_field = |key: &str| match map.get(key) {
            Some(Ipld::Bytes(b)) => Ok(b.clone()),
            _ => Err(CoreError::MalformedHead(format!("missing {}", key))),
        };
        Ok(Self {
            head,
            pubkey: bytes_field("pubkey")?,
            sig: bytes_field("sig")?,
        })
    }
}

#[derive(Deserialize)]
struct HeadDocument {
    head: LinkDocument,
}

#[derive(Deserialize)]
struct LinkDocument {
    #[serde(rename = "/")]
    cid: String,
}

/// Extract the head CID from a published head document.
///
/// Only `head."/"` is read; other fields are ignored, so documents written by
/// other publishers parse too.
pub fn parse_head_document(bytes: &[u8]) -> Result<Cid> {
    let doc: HeadDocument =
        serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedHead(e.to_string()))?;
    parse_cid(&doc.head.cid).map_err(|e| CoreError::MalformedHead(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = "baguqeeralr4pwxvbcc6voioqyc6aneg4pkoh5rhrfj35gbhrpxpeavsh6vsa";

    fn identity() -> PeerIdentity {
        PeerIdentity::from_seed(&[0x42; 32]).unwrap()
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let identity = identity();
        let head = ChainHead::sign(HEAD.parse().unwrap(), &identity).unwrap();
        head.verify().unwrap();
        assert_eq!(&head.signer().unwrap(), identity.peer_id());

        let bytes = head.encode().unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();
        assert!(json.starts_with(&format!("{{\"head\":{{\"/\":\"{}\"}},\"pubkey\":", HEAD)));

        let decoded = ChainHead::decode(&bytes).unwrap();
        assert_eq!(decoded, head);
        decoded.verify().unwrap();
    }

    #[test]
    fn test_tampered_head_fails() {
        let mut head = ChainHead::sign(HEAD.parse().unwrap(), &identity()).unwrap();
        head.head = "baguqeera4vd5tybgxaub4elwag6v7yhswhflfyopogr7r32b7dpt5mqfmmoq"
            .parse()
            .unwrap();
        assert!(matches!(head.verify(), Err(CoreError::InvalidSignature)));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let doc = format!(r#"{{"head":{{"/":"{}"}}}}"#, HEAD);
        assert!(matches!(
            ChainHead::decode(doc.as_bytes()),
            Err(CoreError::MalformedHead(_))
        ));
        assert!(ChainHead::decode(br#"{"head":"x","pubkey":{"/":{"bytes":""}}}"#).is_err());
    }

    #[test]
    fn test_parse_head_document() {
        let doc = format!(r#"{{"head":{{"/":"{}"}}}}"#, HEAD);
        assert_eq!(parse_head_document(doc.as_bytes()).unwrap().to_string(), HEAD);

        let full = ChainHead::sign(HEAD.parse().unwrap(), &identity())
            .unwrap()
            .encode()
            .unwrap();
        assert_eq!(parse_head_document(&full).unwrap().to_string(), HEAD);
    }

    #[test]
    fn test_parse_head_document_rejects_garbage() {
        assert!(parse_head_document(b"not json").is_err());
        assert!(parse_head_document(br#"{"head":"x"}"#).is_err());
        assert!(parse_head_document(br#"{"head":{"/":"nope"}}"#).is_err());
    }
}
