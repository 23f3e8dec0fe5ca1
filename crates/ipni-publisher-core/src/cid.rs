//! Multihashes and content identifiers.
//!
//! [`Cid`] and [`Multihash`] come from the `cid` and `multihash` crates; this
//! module fixes the codecs and hash function the chain uses and adds the IPNI
//! "no entries" marker. CIDv1 renders as multibase base32 lower (`b` prefix).

use multihash_codetable::{Code, MultihashDigest};

use crate::error::{CoreError, Result};

pub use cid::Cid;

/// Multihash sized for any digest up to 64 bytes.
pub type Multihash = multihash::Multihash<64>;

/// Multicodec codes for the content types this crate addresses.
pub mod codec {
    pub const RAW: u64 = 0x55;
    pub const DAG_PB: u64 = 0x70;
    pub const DAG_CBOR: u64 = 0x71;
    pub const DAG_JSON: u64 = 0x0129;
}

/// Multihash function codes.
pub mod hash {
    pub const IDENTITY: u64 = 0x00;
    pub const SHA2_256: u64 = 0x12;
}

/// sha2-256 multihash of `data`.
pub fn sha2_256(data: &[u8]) -> Multihash {
    Code::Sha2_256.digest(data)
}

/// CIDv1 over the sha2-256 digest of `bytes` under `codec`.
pub fn derive_cid(codec: u64, bytes: &[u8]) -> Cid {
    Cid::new_v1(codec, sha2_256(bytes))
}

/// The IPNI "no entries" marker, used by advertisements that carry no
/// multihashes of their own: raw codec over the first 16 bytes of
/// sha2-256 of the empty string.
pub fn no_entries() -> Cid {
    Cid::new_v1(codec::RAW, sha2_256(b"").truncate(16))
}

/// Parse a CID string in any multibase, or a base58btc CIDv0.
pub fn parse_cid(s: &str) -> Result<Cid> {
    Cid::try_from(s).map_err(|e| CoreError::InvalidCid(format!("{:?}: {}", s, e)))
}

/// Parse a binary CID.
pub fn cid_from_bytes(bytes: &[u8]) -> Result<Cid> {
    Cid::try_from(bytes).map_err(|e| CoreError::InvalidCid(e.to_string()))
}

/// Parse a binary multihash spanning exactly `bytes`.
pub fn multihash_from_bytes(bytes: &[u8]) -> Result<Multihash> {
    Multihash::from_bytes(bytes).map_err(|e| CoreError::InvalidMultihash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid::Version;

    const AD_CID: &str = "baguqeera4vd5tybgxaub4elwag6v7yhswhflfyopogr7r32b7dpt5mqfmmoq";

    #[test]
    fn test_parse_dag_json_cid() {
        let cid = parse_cid(AD_CID).unwrap();
        assert_eq!(cid.version(), Version::V1);
        assert_eq!(cid.codec(), codec::DAG_JSON);
        assert_eq!(cid.hash().code(), hash::SHA2_256);
        assert_eq!(cid.hash().digest().len(), 32);
        assert_eq!(&cid.to_bytes()[..5], &[0x01, 0xa9, 0x02, 0x12, 0x20]);
        assert_eq!(cid.to_string(), AD_CID);
        assert_eq!(cid_from_bytes(&cid.to_bytes()).unwrap(), cid);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive_cid(codec::DAG_JSON, b"{\"a\":1}");
        let b = derive_cid(codec::DAG_JSON, b"{\"a\":1}");
        let c = derive_cid(codec::DAG_JSON, b"{\"a\":2}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.to_string().starts_with("baguqeera"));
    }

    #[test]
    fn test_no_entries_constant() {
        let cid = no_entries();
        assert_eq!(cid.to_string(), "bafkreehdwdcefgh4dqkjv67uzcmw7oje");
        assert_eq!(cid.hash().digest().len(), 16);
        assert_eq!(parse_cid("bafkreehdwdcefgh4dqkjv67uzcmw7oje").unwrap(), cid);
    }

    #[test]
    fn test_parses_base58_forms() {
        let v0 = Cid::new_v0(sha2_256(b"hello")).unwrap();
        let s = v0.to_string();
        assert!(s.starts_with("Qm"));
        assert_eq!(parse_cid(&s).unwrap(), v0);
        assert_eq!(v0.codec(), codec::DAG_PB);

        let v1 = derive_cid(codec::DAG_JSON, b"entries");
        let z = multibase::encode(multibase::Base::Base58Btc, v1.to_bytes());
        assert!(z.starts_with('z'));
        assert_eq!(parse_cid(&z).unwrap(), v1);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_cid("").is_err());
        assert!(parse_cid("zabc").is_err());
        assert!(parse_cid("bafy!").is_err());
        assert!(cid_from_bytes(&[0x02, 0x55, 0x12, 0x00]).is_err());
        assert!(cid_from_bytes(&[0x01, 0x55, 0x12, 0x20, 0x00]).is_err());
        assert!(multihash_from_bytes(&[0x12, 0x20, 0x00]).is_err());
    }
}
