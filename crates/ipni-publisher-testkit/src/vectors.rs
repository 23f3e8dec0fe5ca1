//! Golden test vectors for deterministic verification.
//!
//! Expected values were computed independently of this codebase from the
//! fixture seeds. Any change to canonical encoding, signing payloads or CID
//! derivation shows up here as a mismatch.

use ipni_publisher_core::{
    bucket_announce_addr, build, codec, derive_cid, no_entries, sha2_256, AnnounceMessage,
    BatchReference, ChainHead, Cid, EntriesBlock, PeerIdentity, Result,
};
use multibase::Base;

use crate::fixtures::{TestFixture, BITSWAP_SEED, HTTP_SEED};

/// Bucket name used for the announce vector.
pub const VECTOR_BUCKET: &str = "advertisements";

/// Region used for the announce vector.
pub const VECTOR_REGION: &str = "us-west-2";

pub const NO_ENTRIES_CID: &str = "bafkreehdwdcefgh4dqkjv67uzcmw7oje";

/// base58btc multihashes of sha256([0]), sha256([1]), sha256([2]).
pub const ENTRY_MULTIHASHES: [&str; 3] = [
    "QmVkqaunyKCw4NKmWXbsGhkr5CotM8vCBKWyxsh8FGZyfr",
    "QmTTA2daxGqo5denp6SwLzzkLJm3fuisYEi9CoWsuHpzfb",
    "Qmd8VJwP745eE5xsmvbW56ZuAoQvXDhrZ9evpkNBk5eXiV",
];

pub const ENTRIES_CID: &str = "baguqeeracvql53lknocxiotdybsfwlxfp5nkekw2423y33kcugmcdjaywpsq";

/// Bitswap provider, no previous, entries = [`ENTRIES_CID`].
pub const SINGLE_AD_CID: &str = "baguqeerany3jvrn36wjgrtm6gccchinf6iihoh56panx7rzddszlqlnldykq";

/// Both providers, previous = [`SINGLE_AD_CID`].
pub const EXTENDED_AD_CID: &str = "baguqeeraspfuvwtlvgr5b35knsn7glfjxbrfpccv64wl6arzrbd4hglflska";

/// Head record pointing at [`SINGLE_AD_CID`], signed by the bitswap identity.
pub const HEAD_CID: &str = "baguqeerah4fsh3lbo62x6ovuqyjucwvgzca3kqryb25xkjsphvqyfwsip3ba";

pub const HEAD_SIG_HEX: &str = "d84eacbc9da26c164f3413b46b6ca911bc0ee3daf379bb85deddf8ac2f5d085d8641f1bf275547b4123521f2b46dba7692e1eea4b61e942d71962453da379605";

/// Announce for [`SINGLE_AD_CID`] via the bucket address.
pub const ANNOUNCE_HEX: &str = "83d82a58260001a90212206e369ac5bbf59268cd9e308423a1a5f210771fbe781b7fc7231cb2b82dab1e1581585936296164766572746973656d656e74732e73332e75732d776573742d322e616d617a6f6e6177732e636f6d0601bbbb03a503260024080112208a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c40";

/// A seed with the peer ID it must derive.
#[derive(Debug, Clone)]
pub struct PeerIdVector {
    pub seed: [u8; 32],
    pub expected_peer_id: &'static str,
}

pub fn peer_id_vectors() -> Vec<PeerIdVector> {
    vec![
        PeerIdVector {
            seed: BITSWAP_SEED,
            expected_peer_id: "12D3KooWK99VoVxNE7XzyBwXEzW7xhK7Gpv85r9F3V3fyKSUKPH5",
        },
        PeerIdVector {
            seed: HTTP_SEED,
            expected_peer_id: "12D3KooWJWoaqZhDaoEFshF7Rh1bpY9ohihFhzcW6d69Lr2NASuq",
        },
        PeerIdVector {
            seed: [0x42; 32],
            expected_peer_id: "12D3KooWC4T1AXU2s2YBgGJ2FeaYVtsKoHZWJeubnWe9SnuSE7Zb",
        },
    ]
}

/// Every artifact of a two-link chain, computed from the fixture identities.
#[derive(Debug, Clone)]
pub struct ChainVector {
    pub entries_cid: Cid,
    pub single_ad_cid: Cid,
    pub extended_ad_cid: Cid,
    pub head: ChainHead,
    pub head_cid: Cid,
    pub announce: Vec<u8>,
}

/// Recompute the chain artifacts.
pub fn build_chain_vector() -> Result<ChainVector> {
    let fixture = TestFixture::new();

    let block = EntriesBlock {
        entries: (0u8..3).map(|i| sha2_256(&[i])).collect(),
    };
    let (entries_cid, _) = block.encode_with_cid()?;

    let single = build(
        &BatchReference::Content(entries_cid),
        None,
        &fixture.content_providers(),
    )?;
    let (single_ad_cid, _) = single.encode_with_cid()?;

    let extended = build(
        &BatchReference::AnnounceTransports,
        Some(single_ad_cid),
        &fixture.transport_providers(),
    )?;
    let (extended_ad_cid, _) = extended.encode_with_cid()?;

    let head = ChainHead::sign(single_ad_cid, &fixture.bitswap)?;
    let head_cid = derive_cid(codec::DAG_JSON, &head.encode()?);

    let addr = bucket_announce_addr(VECTOR_BUCKET, VECTOR_REGION, fixture.bitswap.peer_id())?;
    let announce = AnnounceMessage::new(single_ad_cid, vec![addr]).encode()?;

    Ok(ChainVector {
        entries_cid,
        single_ad_cid,
        extended_ad_cid,
        head,
        head_cid,
        announce,
    })
}

/// Check every golden vector. Returns `(name, expected, actual)` for each
/// mismatch; an empty list means the implementation matches.
pub fn verify_all_vectors() -> Vec<(String, String, String)> {
    let mut mismatches = Vec::new();
    let mut check = |name: &str, expected: &str, actual: String| {
        if expected != actual {
            mismatches.push((name.to_string(), expected.to_string(), actual));
        }
    };

    for v in peer_id_vectors() {
        let actual = match PeerIdentity::from_seed(&v.seed) {
            Ok(identity) => identity.peer_id().to_string(),
            Err(e) => e.to_string(),
        };
        check(&format!("peer id {:02x}", v.seed[0]), v.expected_peer_id, actual);
    }
    check("no entries", NO_ENTRIES_CID, no_entries().to_string());

    let hashes: Vec<String> = (0u8..3)
        .map(|i| Base::Base58Btc.encode(sha2_256(&[i]).to_bytes()))
        .collect();
    for (expected, actual) in ENTRY_MULTIHASHES.iter().zip(hashes) {
        check("entry multihash", expected, actual);
    }

    match build_chain_vector() {
        Ok(chain) => {
            check("entries cid", ENTRIES_CID, chain.entries_cid.to_string());
            check("single ad cid", SINGLE_AD_CID, chain.single_ad_cid.to_string());
            check("extended ad cid", EXTENDED_AD_CID, chain.extended_ad_cid.to_string());
            check("head cid", HEAD_CID, chain.head_cid.to_string());
            check("head sig", HEAD_SIG_HEX, hex::encode(&chain.head.sig));
            check("announce", ANNOUNCE_HEX, hex::encode(&chain.announce));
        }
        Err(e) => check("chain", "built", e.to_string()),
    }

    mismatches
}
