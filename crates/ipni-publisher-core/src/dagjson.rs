//! DAG-JSON codec over the IPLD data model.
//!
//! Output is compact JSON with map keys sorted bytewise. Links render as
//! `{"/":"<cid>"}` and byte strings as `{"/":{"bytes":"<base64>"}}` using
//! standard unpadded base64. The `/` key is reserved for these two forms.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use ipld_core::ipld::Ipld;
use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::cid::parse_cid;
use crate::error::{CoreError, Result};

/// Unpadded on output; padding is tolerated on input.
const BYTES_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode a value to canonical DAG-JSON bytes.
pub fn encode(value: &Ipld) -> Result<Vec<u8>> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out.into_bytes())
}

/// Decode DAG-JSON bytes into the data model.
pub fn decode(bytes: &[u8]) -> Result<Ipld> {
    let json: Json = serde_json::from_slice(bytes).map_err(|e| CoreError::Decoding(e.to_string()))?;
    from_json(&json)
}

fn write_value(out: &mut String, value: &Ipld) -> Result<()> {
    match value {
        Ipld::Null => out.push_str("null"),
        Ipld::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Ipld::Integer(i) => out.push_str(&i.to_string()),
        Ipld::Float(_) => return Err(CoreError::Encoding("floats not supported".into())),
        Ipld::String(s) => write_string(out, s)?,
        Ipld::Bytes(b) => {
            out.push_str("{\"/\":{\"bytes\":\"");
            out.push_str(&BYTES_BASE64.encode(b));
            out.push_str("\"}}");
        }
        Ipld::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        Ipld::Map(entries) => write_map(out, entries)?,
        Ipld::Link(cid) => {
            out.push_str("{\"/\":\"");
            out.push_str(&cid.to_string());
            out.push_str("\"}");
        }
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> Result<()> {
    let escaped = serde_json::to_string(s).map_err(|e| CoreError::Encoding(e.to_string()))?;
    out.push_str(&escaped);
    Ok(())
}

// BTreeMap<String, _> iterates in bytewise key order.
fn write_map(out: &mut String, entries: &BTreeMap<String, Ipld>) -> Result<()> {
    if entries.contains_key("/") {
        return Err(CoreError::Encoding("reserved map key \"/\"".into()));
    }
    out.push('{');
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key)?;
        out.push(':');
        write_value(out, value)?;
    }
    out.push('}');
    Ok(())
}

fn from_json(json: &Json) -> Result<Ipld> {
    Ok(match json {
        Json::Null => Ipld::Null,
        Json::Bool(b) => Ipld::Bool(*b),
        Json::Number(n) => number_to_value(n)?,
        Json::String(s) => Ipld::String(s.clone()),
        Json::Array(items) => Ipld::List(items.iter().map(from_json).collect::<Result<_>>()?),
        Json::Object(map) => match map.get("/") {
            Some(slash) => reserved_form(map, slash)?,
            None => Ipld::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), from_json(v)?)))
                    .collect::<Result<_>>()?,
            ),
        },
    })
}

fn number_to_value(n: &Number) -> Result<Ipld> {
    if let Some(u) = n.as_u64() {
        Ok(Ipld::Integer(u.into()))
    } else if let Some(i) = n.as_i64() {
        Ok(Ipld::Integer(i.into()))
    } else {
        Err(CoreError::Decoding(format!("floats not supported: {}", n)))
    }
}

fn reserved_form(map: &JsonMap<String, Json>, slash: &Json) -> Result<Ipld> {
    if map.len() != 1 {
        return Err(CoreError::Decoding("\"/\" must be the only key".into()));
    }
    match slash {
        Json::String(s) => Ok(Ipld::Link(parse_cid(s)?)),
        Json::Object(inner) => match (inner.len(), inner.get("bytes")) {
            (1, Some(Json::String(b64))) => BYTES_BASE64
                .decode(b64)
                .map(Ipld::Bytes)
                .map_err(|e| CoreError::InvalidBase(e.to_string())),
            _ => Err(CoreError::Decoding("malformed bytes form".into())),
        },
        _ => Err(CoreError::Decoding("malformed \"/\" value".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::{codec, derive_cid};

    fn map<const N: usize>(entries: [(&str, Ipld); N]) -> Ipld {
        Ipld::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn test_compact_sorted_output() {
        let value = map([
            ("b", Ipld::Integer(1)),
            ("Z", Ipld::Bool(true)),
            ("a", Ipld::List(vec![Ipld::Null, Ipld::String("x\"y".into())])),
        ]);
        let bytes = encode(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"Z":true,"a":[null,"x\"y"],"b":1}"#
        );
    }

    #[test]
    fn test_bytes_and_links() {
        let cid = derive_cid(codec::RAW, b"data");
        let value = map([
            ("link", Ipld::Link(cid)),
            ("raw", Ipld::Bytes(vec![0x80, 0x12])),
        ]);
        let bytes = encode(&value).unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(
            json,
            format!(r#"{{"link":{{"/":"{}"}},"raw":{{"/":{{"bytes":"gBI"}}}}}}"#, cid)
        );
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_reencode_is_stable() {
        let input = br#"{"b":[1,-2],"a":{"/":{"bytes":"AAE"}}}"#;
        let value = decode(input).unwrap();
        let once = encode(&value).unwrap();
        let twice = encode(&decode(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, br#"{"a":{"/":{"bytes":"AAE"}},"b":[1,-2]}"#.to_vec());
    }

    #[test]
    fn test_rejects_floats_and_reserved_keys() {
        assert!(encode(&Ipld::Float(0.5)).is_err());
        assert!(decode(b"1.5").is_err());
        assert!(encode(&map([("/", Ipld::Null)])).is_err());
        assert!(decode(br#"{"/":"not-a-cid"}"#).is_err());
        assert!(decode(br#"{"/":"x","y":1}"#).is_err());
        assert!(decode(br#"{"/":{"bytes":"!!"}}"#).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_reencode_is_identity(
            entries in proptest::collection::btree_map("[a-zA-Z]{1,8}", proptest::prelude::any::<i64>(), 0..8)
        ) {
            let value = Ipld::Map(
                entries.into_iter().map(|(k, v)| (k, Ipld::Integer(v.into()))).collect(),
            );
            let a = encode(&value).unwrap();
            proptest::prop_assert_eq!(&decode(&a).unwrap(), &value);
            proptest::prop_assert_eq!(encode(&decode(&a).unwrap()).unwrap(), a);
        }
    }
}
