//! Advertisements: the signed, content-addressed links of the chain.
//!
//! An advertisement names a provider, the content it holds (`Entries`), and
//! optionally the previous advertisement in the chain. The extended form also
//! lists every transport the publisher is reachable on, each entry signed by
//! that transport's own key.
//!
//! Wire form is a DAG-JSON map:
//!
//! | key | value |
//! |---|---|
//! | `PreviousID` | link, omitted for the first advertisement |
//! | `Provider` | peer ID string |
//! | `Addresses` | multiaddr strings |
//! | `Entries` | link |
//! | `ContextID` | bytes |
//! | `Metadata` | bytes |
//! | `IsRm` | bool |
//! | `ExtendedProvider` | `{Providers: [...], Override: bool}`, extended form only |
//! | `Signature` | marshaled envelope bytes |

use std::collections::BTreeMap;

use ipld_core::ipld::Ipld;

use crate::batch::BatchReference;
use crate::cid::{codec, derive_cid, no_entries, Cid};
use crate::crypto::PeerIdentity;
use crate::dagjson;
use crate::error::{CoreError, Result};
use crate::metadata::{Protocol, MAX_METADATA_LEN};
use crate::signature::{
    advertisement_signing_bytes, compute_advertisement_signature, provider_signature,
    provider_signing_bytes, verify_signature, AdSigningFields, ProviderSigningFields,
};

/// Maximum ContextID length accepted by indexers.
pub const MAX_CONTEXT_ID_LEN: usize = 64;

mod keys {
    pub const PREVIOUS_ID: &str = "PreviousID";
    pub const PROVIDER: &str = "Provider";
    pub const ADDRESSES: &str = "Addresses";
    pub const ENTRIES: &str = "Entries";
    pub const CONTEXT_ID: &str = "ContextID";
    pub const METADATA: &str = "Metadata";
    pub const IS_RM: &str = "IsRm";
    pub const EXTENDED_PROVIDER: &str = "ExtendedProvider";
    pub const PROVIDERS: &str = "Providers";
    pub const OVERRIDE: &str = "Override";
    pub const SIGNATURE: &str = "Signature";
    pub const ID: &str = "ID";
}

/// One retrieval endpoint inside an extended provider set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub id: String,
    pub addresses: Vec<String>,
    pub metadata: Vec<u8>,
    pub signature: Option<Vec<u8>>,
}

/// Single vs extended advertisement shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertisementKind {
    Single,
    Extended {
        providers: Vec<Provider>,
        override_: bool,
    },
}

/// A signed advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub previous: Option<Cid>,
    pub provider: String,
    pub addresses: Vec<String>,
    pub entries: Cid,
    pub context_id: Vec<u8>,
    pub metadata: Vec<u8>,
    pub is_rm: bool,
    pub kind: AdvertisementKind,
    pub signature: Vec<u8>,
}

impl Advertisement {
    pub fn is_extended(&self) -> bool {
        matches!(self.kind, AdvertisementKind::Extended { .. })
    }

    /// Fields covered by the top-level signature.
    pub fn signing_fields(&self) -> AdSigningFields<'_> {
        AdSigningFields {
            previous: self.previous.as_ref(),
            provider: &self.provider,
            addresses: &self.addresses,
            entries: &self.entries,
            metadata: &self.metadata,
            is_rm: self.is_rm,
        }
    }

    /// Check structural limits. Called before every encode.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(CoreError::MalformedAdvertisement("empty provider".into()));
        }
        if self.context_id.len() > MAX_CONTEXT_ID_LEN {
            return Err(CoreError::ContextIdTooLong(self.context_id.len()));
        }
        if self.metadata.len() > MAX_METADATA_LEN {
            return Err(CoreError::MetadataTooLong(self.metadata.len()));
        }
        if self.signature.is_empty() {
            return Err(CoreError::MalformedAdvertisement("unsigned".into()));
        }
        if let AdvertisementKind::Extended { providers, .. } = &self.kind {
            if providers.is_empty() {
                return Err(CoreError::MalformedAdvertisement(
                    "extended provider list is empty".into(),
                ));
            }
            for p in providers {
                if p.id.is_empty() {
                    return Err(CoreError::MalformedAdvertisement(
                        "extended provider without id".into(),
                    ));
                }
                if p.metadata.len() > MAX_METADATA_LEN {
                    return Err(CoreError::MetadataTooLong(p.metadata.len()));
                }
                if p.signature.as_ref().map_or(true, |s| s.is_empty()) {
                    return Err(CoreError::MalformedAdvertisement(format!(
                        "extended provider {} is unsigned",
                        p.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Verify the top-level signature and every extended provider signature.
    pub fn verify(&self) -> Result<()> {
        verify_signature(
            &self.signature,
            &self.provider,
            &advertisement_signing_bytes(&self.signing_fields()),
        )?;

        if let AdvertisementKind::Extended {
            providers,
            override_,
        } = &self.kind
        {
            for p in providers {
                let envelope = p.signature.as_deref().ok_or_else(|| {
                    CoreError::MalformedAdvertisement(format!("provider {} is unsigned", p.id))
                })?;
                let fields = ProviderSigningFields {
                    previous: self.previous.as_ref(),
                    ad_provider: &self.provider,
                    entries: &self.entries,
                    context_id: &self.context_id,
                    provider: p,
                    override_: *override_,
                };
                verify_signature(envelope, &p.id, &provider_signing_bytes(&fields))?;
            }
        }
        Ok(())
    }

    /// Data-model form.
    pub fn to_value(&self) -> Ipld {
        let mut entries = BTreeMap::new();
        if let Some(prev) = self.previous {
            entries.insert(keys::PREVIOUS_ID.to_string(), Ipld::Link(prev));
        }
        entries.insert(keys::PROVIDER.to_string(), text(&self.provider));
        entries.insert(keys::ADDRESSES.to_string(), text_list(&self.addresses));
        entries.insert(keys::ENTRIES.to_string(), Ipld::Link(self.entries));
        entries.insert(keys::CONTEXT_ID.to_string(), Ipld::Bytes(self.context_id.clone()));
        entries.insert(keys::METADATA.to_string(), Ipld::Bytes(self.metadata.clone()));
        entries.insert(keys::IS_RM.to_string(), Ipld::Bool(self.is_rm));
        if let AdvertisementKind::Extended {
            providers,
            override_,
        } = &self.kind
        {
            let providers = providers.iter().map(provider_to_value).collect();
            entries.insert(
                keys::EXTENDED_PROVIDER.to_string(),
                Ipld::Map(BTreeMap::from([
                    (keys::PROVIDERS.to_string(), Ipld::List(providers)),
                    (keys::OVERRIDE.to_string(), Ipld::Bool(*override_)),
                ])),
            );
        }
        entries.insert(keys::SIGNATURE.to_string(), Ipld::Bytes(self.signature.clone()));
        Ipld::Map(entries)
    }

    /// Canonical DAG-JSON bytes. Invalid advertisements are rejected before
    /// any bytes are produced.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        dagjson::encode(&self.to_value())
    }

    /// Encode and derive the advertisement's CID.
    pub fn encode_with_cid(&self) -> Result<(Cid, Vec<u8>)> {
        let bytes = self.encode()?;
        Ok((derive_cid(codec::DAG_JSON, &bytes), bytes))
    }

    pub fn cid(&self) -> Result<Cid> {
        Ok(self.encode_with_cid()?.0)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = dagjson::decode(bytes)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Ipld) -> Result<Self> {
        let map = as_map(value, "advertisement")?;

        let previous = match map.get(keys::PREVIOUS_ID) {
            None | Some(Ipld::Null) => None,
            Some(Ipld::Link(cid)) => Some(*cid),
            Some(_) => return Err(missing(keys::PREVIOUS_ID)),
        };
        let kind = match map.get(keys::EXTENDED_PROVIDER) {
            None | Some(Ipld::Null) => AdvertisementKind::Single,
            Some(v) => {
                let ext = as_map(v, keys::EXTENDED_PROVIDER)?;
                let providers = match ext.get(keys::PROVIDERS) {
                    Some(Ipld::List(items)) => {
                        items.iter().map(provider_from_value).collect::<Result<_>>()?
                    }
                    _ => return Err(missing(keys::PROVIDERS)),
                };
                let override_ = match ext.get(keys::OVERRIDE) {
                    Some(Ipld::Bool(b)) => *b,
                    None => false,
                    _ => return Err(missing(keys::OVERRIDE)),
                };
                AdvertisementKind::Extended {
                    providers,
                    override_,
                }
            }
        };

        let ad = Self {
            previous,
            provider: get_text(map, keys::PROVIDER)?,
            addresses: get_text_list(map, keys::ADDRESSES)?,
            entries: match map.get(keys::ENTRIES) {
                Some(Ipld::Link(cid)) => *cid,
                _ => return Err(missing(keys::ENTRIES)),
            },
            context_id: get_bytes(map, keys::CONTEXT_ID)?,
            metadata: get_bytes(map, keys::METADATA)?,
            is_rm: match map.get(keys::IS_RM) {
                Some(Ipld::Bool(b)) => *b,
                _ => return Err(missing(keys::IS_RM)),
            },
            kind,
            signature: get_bytes(map, keys::SIGNATURE)?,
        };
        ad.validate()?;
        Ok(ad)
    }
}

type IpldMap = BTreeMap<String, Ipld>;

fn provider_to_value(p: &Provider) -> Ipld {
    let mut entries = BTreeMap::from([
        (keys::ID.to_string(), text(&p.id)),
        (keys::ADDRESSES.to_string(), text_list(&p.addresses)),
        (keys::METADATA.to_string(), Ipld::Bytes(p.metadata.clone())),
    ]);
    if let Some(sig) = &p.signature {
        entries.insert(keys::SIGNATURE.to_string(), Ipld::Bytes(sig.clone()));
    }
    Ipld::Map(entries)
}

fn provider_from_value(value: &Ipld) -> Result<Provider> {
    let map = as_map(value, "provider")?;
    Ok(Provider {
        id: get_text(map, keys::ID)?,
        addresses: get_text_list(map, keys::ADDRESSES)?,
        metadata: get_bytes(map, keys::METADATA)?,
        signature: match map.get(keys::SIGNATURE) {
            Some(Ipld::Bytes(b)) => Some(b.clone()),
            None => None,
            _ => return Err(missing(keys::SIGNATURE)),
        },
    })
}

fn text(s: &str) -> Ipld {
    Ipld::String(s.to_string())
}

fn text_list(items: &[String]) -> Ipld {
    Ipld::List(items.iter().map(|s| text(s)).collect())
}

fn missing(key: &str) -> CoreError {
    CoreError::MalformedAdvertisement(format!("missing or invalid {}", key))
}

fn as_map<'a>(value: &'a Ipld, what: &str) -> Result<&'a IpldMap> {
    match value {
        Ipld::Map(m) => Ok(m),
        _ => Err(CoreError::MalformedAdvertisement(format!("{} is not a map", what))),
    }
}

fn get_text(map: &IpldMap, key: &str) -> Result<String> {
    match map.get(key) {
        Some(Ipld::String(s)) => Ok(s.clone()),
        _ => Err(missing(key)),
    }
}

fn get_bytes(map: &IpldMap, key: &str) -> Result<Vec<u8>> {
    match map.get(key) {
        Some(Ipld::Bytes(b)) => Ok(b.clone()),
        _ => Err(missing(key)),
    }
}

fn get_text_list(map: &IpldMap, key: &str) -> Result<Vec<String>> {
    match map.get(key) {
        Some(Ipld::List(items)) => items
            .iter()
            .map(|v| match v {
                Ipld::String(s) => Ok(s.clone()),
                _ => Err(missing(key)),
            })
            .collect(),
        _ => Err(missing(key)),
    }
}

/// A configured transport: the identity that signs for it, the addresses it
/// is reachable on, and its retrieval protocol.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub identity: PeerIdentity,
    pub addresses: Vec<String>,
    pub protocol: Protocol,
}

impl ProviderInfo {
    pub fn new(identity: PeerIdentity, protocol: Protocol, addresses: Vec<String>) -> Self {
        Self {
            identity,
            addresses,
            protocol,
        }
    }

    pub fn peer_id(&self) -> String {
        self.identity.peer_id().to_string()
    }

    fn unsigned(&self) -> Provider {
        Provider {
            id: self.peer_id(),
            addresses: self.addresses.clone(),
            metadata: self.protocol.metadata(),
            signature: None,
        }
    }
}

/// Builds and signs advertisements.
///
/// The first configured provider is the primary: it is the advertisement's
/// `Provider` and signs the top-level signature.
#[derive(Debug)]
pub struct AdvertisementBuilder<'a> {
    providers: &'a [ProviderInfo],
    previous: Option<Cid>,
}

impl<'a> AdvertisementBuilder<'a> {
    pub fn new(providers: &'a [ProviderInfo]) -> Self {
        Self {
            providers,
            previous: None,
        }
    }

    pub fn previous(mut self, previous: Option<Cid>) -> Self {
        self.previous = previous;
        self
    }

    /// Build from a batch reference: a content CID yields a single-provider
    /// advertisement, the transport sentinel an extended one.
    pub fn build(self, reference: &BatchReference) -> Result<Advertisement> {
        match reference {
            BatchReference::Content(entries) => self.build_single(*entries),
            BatchReference::AnnounceTransports => self.build_extended(),
        }
    }

    /// Single-provider advertisement for `entries`. ContextID is the UTF-8
    /// form of the entries CID.
    pub fn build_single(self, entries: Cid) -> Result<Advertisement> {
        let primary = self.primary()?;
        let context_id = entries.to_string().into_bytes();
        let mut ad = Advertisement {
            previous: self.previous,
            provider: primary.peer_id(),
            addresses: primary.addresses.clone(),
            entries,
            context_id,
            metadata: primary.protocol.metadata(),
            is_rm: false,
            kind: AdvertisementKind::Single,
            signature: Vec::new(),
        };
        check_limits(&ad)?;
        ad.signature = compute_advertisement_signature(&primary.identity, &ad.signing_fields())?;
        Ok(ad)
    }

    /// Extended-provider advertisement listing every configured provider,
    /// with no entries and an empty ContextID.
    pub fn build_extended(self) -> Result<Advertisement> {
        let primary = self.primary()?;
        let mut ad = Advertisement {
            previous: self.previous,
            provider: primary.peer_id(),
            addresses: primary.addresses.clone(),
            entries: no_entries(),
            context_id: Vec::new(),
            metadata: primary.protocol.metadata(),
            is_rm: false,
            kind: AdvertisementKind::Single,
            signature: Vec::new(),
        };
        check_limits(&ad)?;

        let override_ = false;
        let mut providers = Vec::with_capacity(self.providers.len());
        for info in self.providers {
            let mut provider = info.unsigned();
            let fields = ProviderSigningFields {
                previous: ad.previous.as_ref(),
                ad_provider: &ad.provider,
                entries: &ad.entries,
                context_id: &ad.context_id,
                provider: &provider,
                override_,
            };
            let signature = provider_signature(&info.identity, &fields)?;
            provider.signature = Some(signature);
            providers.push(provider);
        }

        ad.kind = AdvertisementKind::Extended {
            providers,
            override_,
        };
        ad.signature = compute_advertisement_signature(&primary.identity, &ad.signing_fields())?;
        Ok(ad)
    }

    fn primary(&self) -> Result<&'a ProviderInfo> {
        self.providers
            .first()
            .ok_or_else(|| CoreError::MalformedAdvertisement("no providers configured".into()))
    }
}

/// Limits that must hold before anything is signed.
fn check_limits(ad: &Advertisement) -> Result<()> {
    if ad.context_id.len() > MAX_CONTEXT_ID_LEN {
        return Err(CoreError::ContextIdTooLong(ad.context_id.len()));
    }
    if ad.metadata.len() > MAX_METADATA_LEN {
        return Err(CoreError::MetadataTooLong(ad.metadata.len()));
    }
    Ok(())
}

/// Build and sign the advertisement for one batch reference.
pub fn build(
    reference: &BatchReference,
    previous: Option<Cid>,
    providers: &[ProviderInfo],
) -> Result<Advertisement> {
    AdvertisementBuilder::new(providers)
        .previous(previous)
        .build(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::Multihash;
    use crate::crypto::PeerIdentity;

    fn providers() -> Vec<ProviderInfo> {
        vec![
            ProviderInfo::new(
                PeerIdentity::from_seed(&[1; 32]).unwrap(),
                Protocol::Bitswap,
                vec!["/dns4/bitswap.example.com/tcp/3000/ws".into()],
            ),
            ProviderInfo::new(
                PeerIdentity::from_seed(&[2; 32]).unwrap(),
                Protocol::Http,
                vec!["/dns4/freeway.dag.house/tcp/443/https".into()],
            ),
        ]
    }

    fn entries() -> Cid {
        "baguqeera4vd5tybgxaub4elwag6v7yhswhflfyopogr7r32b7dpt5mqfmmoq"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_single_without_previous_omits_key() {
        let ad = build(&BatchReference::Content(entries()), None, &providers()).unwrap();
        let json = String::from_utf8(ad.encode().unwrap()).unwrap();
        assert!(!json.contains("PreviousID"));
        assert!(!json.contains("ExtendedProvider"));
        assert!(json.contains("\"IsRm\":false"));
        assert_eq!(ad.context_id, entries().to_string().into_bytes());
        ad.verify().unwrap();
    }

    #[test]
    fn test_previous_roundtrips() {
        let prev: Cid = "baguqeeramxlkaqnblpdl53ygpu4ackscn7ipm54ra2iwiq5kfolvd6vh6bda"
            .parse()
            .unwrap();
        let ad = build(
            &BatchReference::Content(entries()),
            Some(prev),
            &providers(),
        )
        .unwrap();
        let bytes = ad.encode().unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();
        assert!(json.starts_with(r#"{"Addresses":["/dns4/bitswap.example.com/tcp/3000/ws"]"#));
        assert!(json.contains(&format!("\"PreviousID\":{{\"/\":\"{}\"}}", prev)));

        let decoded = Advertisement::decode(&bytes).unwrap();
        assert_eq!(decoded.previous.as_ref().map(|c| c.to_string()), Some(prev.to_string()));
        assert_eq!(decoded, ad);
        decoded.verify().unwrap();
    }

    #[test]
    fn test_cid_is_deterministic() {
        let a = build(&BatchReference::Content(entries()), None, &providers()).unwrap();
        let b = build(&BatchReference::Content(entries()), None, &providers()).unwrap();
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
        let cid = a.cid().unwrap();
        assert_eq!(cid, b.cid().unwrap());
        assert_eq!(cid.codec(), codec::DAG_JSON);
        assert!(cid.to_string().starts_with("baguqeera"));
    }

    #[test]
    fn test_extended_has_one_signed_provider_per_transport() {
        let infos = providers();
        let ad = build(&BatchReference::AnnounceTransports, None, &infos).unwrap();

        assert_eq!(ad.entries, no_entries());
        assert!(ad.context_id.is_empty());
        assert_eq!(ad.provider, infos[0].peer_id());
        assert_eq!(ad.metadata, Protocol::Bitswap.metadata());

        match &ad.kind {
            AdvertisementKind::Extended {
                providers,
                override_,
            } => {
                assert!(!override_);
                assert_eq!(providers.len(), 2);
                assert_eq!(providers[0].id, infos[0].peer_id());
                assert_eq!(providers[1].id, infos[1].peer_id());
                assert_eq!(providers[1].metadata, Protocol::Http.metadata());
                assert!(providers.iter().all(|p| p.signature.is_some()));
            }
            AdvertisementKind::Single => panic!("expected extended advertisement"),
        }
        ad.verify().unwrap();

        let decoded = Advertisement::decode(&ad.encode().unwrap()).unwrap();
        assert_eq!(decoded, ad);
        decoded.verify().unwrap();
    }

    #[test]
    fn test_tampered_extended_entry_fails() {
        let ad = build(&BatchReference::AnnounceTransports, None, &providers()).unwrap();
        let mut tampered = ad.clone();
        if let AdvertisementKind::Extended { providers, .. } = &mut tampered.kind {
            providers[1].addresses = vec!["/dns4/evil.example.com/tcp/443/https".into()];
        }
        assert!(matches!(
            tampered.verify(),
            Err(CoreError::PayloadMismatch(_))
        ));
    }

    #[test]
    fn test_swapped_provider_signatures_fail() {
        let ad = build(&BatchReference::AnnounceTransports, None, &providers()).unwrap();
        let mut tampered = ad.clone();
        if let AdvertisementKind::Extended { providers, .. } = &mut tampered.kind {
            let first = providers[0].signature.take();
            providers[0].signature = providers[1].signature.take();
            providers[1].signature = first;
        }
        assert!(matches!(
            tampered.verify(),
            Err(CoreError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_top_level_tamper_fails() {
        let mut ad = build(&BatchReference::Content(entries()), None, &providers()).unwrap();
        ad.is_rm = true;
        assert!(ad.verify().is_err());
    }

    #[test]
    fn test_rejects_long_context_id() {
        let mut ad = build(&BatchReference::Content(entries()), None, &providers()).unwrap();
        ad.context_id = vec![0; MAX_CONTEXT_ID_LEN + 1];
        assert!(matches!(ad.encode(), Err(CoreError::ContextIdTooLong(65))));
    }

    #[test]
    fn test_rejects_long_entries_cid_before_signing() {
        // A 64-byte digest pushes the CID string past the ContextID limit.
        let long = Cid::new_v1(codec::RAW, Multihash::wrap(0x13, &[7; 64]).unwrap());
        assert!(matches!(
            build(&BatchReference::Content(long), None, &providers()),
            Err(CoreError::ContextIdTooLong(_))
        ));
    }

    #[test]
    fn test_rejects_unsigned_and_empty() {
        let mut ad = build(&BatchReference::Content(entries()), None, &providers()).unwrap();
        ad.signature.clear();
        assert!(ad.encode().is_err());
        assert!(build(&BatchReference::Content(entries()), None, &[]).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(Advertisement::decode(br#"{"Provider":"x"}"#).is_err());
        assert!(Advertisement::decode(b"[]").is_err());
    }

    #[test]
    fn test_different_previous_changes_cid() {
        let p1 = derive_cid(codec::DAG_JSON, b"1");
        let p2 = derive_cid(codec::DAG_JSON, b"2");
        let a = build(&BatchReference::Content(entries()), Some(p1), &providers()).unwrap();
        let b = build(&BatchReference::Content(entries()), Some(p2), &providers()).unwrap();
        assert_ne!(a.cid().unwrap(), b.cid().unwrap());
    }
}
