//! Proptest generators for property-based testing.

use proptest::prelude::*;

use ipni_publisher_core::{
    codec, sha2_256, BatchReference, Cid, Event, Multihash, PeerIdentity, Protocol, ProviderInfo,
};

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = PeerIdentity> {
    any::<[u8; 32]>()
        .prop_map(|seed| PeerIdentity::from_seed(&seed).expect("any 32 bytes are an ed25519 key"))
}

/// Generate a sha2-256 multihash over random bytes.
pub fn multihash() -> impl Strategy<Value = Multihash> {
    prop::collection::vec(any::<u8>(), 0..64).prop_map(|data| sha2_256(&data))
}

/// Generate a CIDv1 with one of the codecs the chain uses.
pub fn cid() -> impl Strategy<Value = Cid> {
    (
        prop_oneof![Just(codec::DAG_JSON), Just(codec::RAW), Just(codec::DAG_CBOR)],
        multihash(),
    )
        .prop_map(|(codec, hash)| Cid::new_v1(codec, hash))
}

/// Generate a batch reference, mostly content.
pub fn batch_reference() -> impl Strategy<Value = BatchReference> {
    prop_oneof![
        4 => cid().prop_map(BatchReference::Content),
        1 => Just(BatchReference::AnnounceTransports),
    ]
}

/// Generate a `/dns4/<host>/tcp/<port>/<transport>` address string.
pub fn address() -> impl Strategy<Value = String> {
    (
        "[a-z][a-z0-9]{0,15}\\.example\\.com",
        1u16..=u16::MAX,
        prop_oneof![Just("ws"), Just("wss"), Just("http"), Just("https")],
    )
        .prop_map(|(host, port, transport)| format!("/dns4/{}/tcp/{}/{}", host, port, transport))
}

/// Generate a bitswap primary and an HTTP secondary provider.
pub fn providers() -> impl Strategy<Value = Vec<ProviderInfo>> {
    (identity(), address(), identity(), address()).prop_map(|(a, a_addr, b, b_addr)| {
        vec![
            ProviderInfo::new(a, Protocol::Bitswap, vec![a_addr]),
            ProviderInfo::new(b, Protocol::Http, vec![b_addr]),
        ]
    })
}

/// Generate a queue event of up to `max_len` batch references.
pub fn event(max_len: usize) -> impl Strategy<Value = Event> {
    prop::collection::vec(batch_reference(), 0..=max_len)
        .prop_map(|refs| Event::from_bodies(refs.iter().map(|r| r.to_string())))
}
