//! Canonical CBOR encoding of policies.
//!
//! Key material is bound to a policy through its digest, so the same policy
//! must produce identical bytes everywhere. Encoding follows RFC 8949 Core
//! Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats

use ciborium::value::Value;

use crate::error::{CoreError, Result};
use crate::policy::PolicyDescriptor;
use crate::types::Blake3Hash;

/// Domain separator mixed into every policy digest.
const POLICY_DOMAIN: &[u8] = b"sealdoc-policy-v1:";

/// Encode a policy to canonical CBOR bytes.
pub fn canonical_policy_bytes(policy: &PolicyDescriptor) -> Result<Vec<u8>> {
    let value = Value::serialized(policy).map_err(|e| CoreError::Encoding(e.to_string()))?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Blake3 digest of a policy's canonical bytes.
pub fn policy_digest(policy: &PolicyDescriptor) -> Result<Blake3Hash> {
    let bytes = canonical_policy_bytes(policy)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(POLICY_DOMAIN);
    hasher.update(&bytes);
    Ok(Blake3Hash(*hasher.finalize().as_bytes()))
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::Encoding(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => return Err(CoreError::Encoding("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Major types 0 and 1.
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Major type 5, keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AccessCondition, Comparator};

    fn sample() -> PolicyDescriptor {
        PolicyDescriptor::standard(vec![AccessCondition::new("0x1", "balanceOf")
            .contract_type("ERC20")
            .param(":userAddress")
            .expect(Comparator::Ge, "100")])
    }

    #[test]
    fn test_canonical_is_deterministic() {
        let a = canonical_policy_bytes(&sample()).unwrap();
        let b = canonical_policy_bytes(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_top_level_keys_sorted() {
        let bytes = canonical_policy_bytes(&sample()).unwrap();

        // Two entries. Keys compare by encoded bytes, so the shorter "type"
        // (0x64 prefix) comes before "conditions" (0x6a prefix).
        assert_eq!(bytes[0], 0xa2);
        assert_eq!(&bytes[1..6], b"\x64type");
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_floats_rejected() {
        let mut buf = Vec::new();
        assert!(encode_value_to(&mut buf, &Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_digest_is_domain_separated() {
        let bytes = canonical_policy_bytes(&sample()).unwrap();
        let plain = Blake3Hash::hash(&bytes);
        assert_ne!(policy_digest(&sample()).unwrap(), plain);
    }
}
