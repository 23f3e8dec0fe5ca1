//! Error types for the advertisement chain core.

use thiserror::Error;

/// Errors that can occur while encoding, signing or decoding chain records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid peer id: {0}")]
    InvalidPeerId(String),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("invalid multihash: {0}")]
    InvalidMultihash(String),

    #[error("invalid multiaddr: {0}")]
    InvalidMultiaddr(String),

    #[error("invalid varint: {0}")]
    InvalidVarint(String),

    #[error("invalid base encoding: {0}")]
    InvalidBase(String),

    #[error("unsupported metadata protocol: 0x{0:x}")]
    UnsupportedProtocol(u64),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("envelope signer {signer} does not match provider {expected}")]
    SignerMismatch { signer: String, expected: String },

    #[error("signature payload mismatch for {0}")]
    PayloadMismatch(String),

    #[error("invalid batch reference: {0}")]
    InvalidBatchReference(String),

    #[error("malformed advertisement: {0}")]
    MalformedAdvertisement(String),

    #[error("malformed chain head: {0}")]
    MalformedHead(String),

    #[error("context id too long: {0} bytes (max 64)")]
    ContextIdTooLong(usize),

    #[error("metadata too long: {0} bytes (max 1024)")]
    MetadataTooLong(usize),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
