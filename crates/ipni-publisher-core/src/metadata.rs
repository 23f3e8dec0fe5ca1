//! Transport metadata carried in advertisements.
//!
//! Metadata is `uvarint(protocol code) || protocol payload`. Both supported
//! transports carry an empty payload.

use crate::error::{CoreError, Result};

/// Maximum metadata size accepted in an advertisement.
pub const MAX_METADATA_LEN: usize = 1024;

/// Retrieval protocol advertised for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Bitswap over libp2p (`transport-bitswap`).
    Bitswap,
    /// Trustless gateway over HTTP (`transport-ipfs-gateway-http`).
    Http,
}

impl Protocol {
    pub const fn code(self) -> u64 {
        match self {
            Self::Bitswap => 0x0900,
            Self::Http => 0x0920,
        }
    }

    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0x0900 => Ok(Self::Bitswap),
            0x0920 => Ok(Self::Http),
            other => Err(CoreError::UnsupportedProtocol(other)),
        }
    }

    /// Encoded metadata bytes for this protocol.
    pub fn metadata(self) -> Vec<u8> {
        let mut buf = unsigned_varint::encode::u64_buffer();
        unsigned_varint::encode::u64(self.code(), &mut buf).to_vec()
    }

    /// Identify the protocol of encoded metadata.
    pub fn decode(metadata: &[u8]) -> Result<Self> {
        let (code, payload) = unsigned_varint::decode::u64(metadata)
            .map_err(|e| CoreError::InvalidVarint(e.to_string()))?;
        let protocol = Self::from_code(code)?;
        if !payload.is_empty() {
            return Err(CoreError::Decoding(format!(
                "unexpected {} byte payload for {:?}",
                payload.len(),
                protocol
            )));
        }
        Ok(protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_bytes() {
        assert_eq!(Protocol::Bitswap.metadata(), vec![0x80, 0x12]);
        assert_eq!(Protocol::Http.metadata(), vec![0xa0, 0x12]);
    }

    #[test]
    fn test_decode() {
        assert_eq!(Protocol::decode(&[0x80, 0x12]).unwrap(), Protocol::Bitswap);
        assert_eq!(Protocol::decode(&[0xa0, 0x12]).unwrap(), Protocol::Http);
        assert!(matches!(
            Protocol::decode(&[0x90, 0x12]),
            Err(CoreError::UnsupportedProtocol(0x0910))
        ));
        assert!(Protocol::decode(&[0x80, 0x12, 0x00]).is_err());
        assert!(matches!(Protocol::decode(&[]), Err(CoreError::InvalidVarint(_))));
    }
}
