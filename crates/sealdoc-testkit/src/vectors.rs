//! Golden test vectors for the text-safe encoding.
//!
//! Stored bundles must stay readable by every client, so the encoding is
//! pinned to RFC 4648 standard base64 with padding.

use sealdoc_core::{codec, PolicyKind, WireBundle};

/// A golden codec vector.
#[derive(Debug, Clone)]
pub struct CodecVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Raw bytes.
    pub raw: &'static [u8],
    /// Expected encoding.
    pub encoded: &'static str,
}

/// Get all golden codec vectors.
pub fn codec_vectors() -> Vec<CodecVector> {
    vec![
        CodecVector { name: "empty", raw: b"", encoded: "" },
        CodecVector { name: "one byte", raw: b"f", encoded: "Zg==" },
        CodecVector { name: "two bytes", raw: b"fo", encoded: "Zm8=" },
        CodecVector { name: "three bytes", raw: b"foo", encoded: "Zm9v" },
        CodecVector { name: "four bytes", raw: b"foob", encoded: "Zm9vYg==" },
        CodecVector { name: "five bytes", raw: b"fooba", encoded: "Zm9vYmE=" },
        CodecVector { name: "six bytes", raw: b"foobar", encoded: "Zm9vYmFy" },
        CodecVector { name: "hello", raw: b"hello", encoded: "aGVsbG8=" },
        CodecVector { name: "low bytes", raw: &[0x00, 0x01, 0x02, 0x03], encoded: "AAECAw==" },
        CodecVector { name: "high bytes", raw: &[0xfb, 0xff, 0xbf], encoded: "+/+/" },
    ]
}

/// Inputs every decoder must reject.
pub fn malformed_encodings() -> Vec<(&'static str, &'static str)> {
    vec![
        ("illegal character", "Zm9v!"),
        ("url-safe alphabet", "-_-_"),
        ("missing padding", "Zg"),
        ("short padding", "Zg="),
        ("padding in the middle", "Zg==Zg=="),
        ("non-zero trailing bits", "Zh=="),
    ]
}

/// A stored bundle in the persisted JSON layout.
pub const WIRE_BUNDLE_JSON: &str = r#"{
  "encryptedZip": "aGVsbG8=",
  "symKey": "AAECAw==",
  "accessControlConditions": {
    "type": "standard",
    "conditions": [
      {
        "contractAddress": "0x00000000000000000000000000000000000000aa",
        "standardContractType": "ERC721",
        "method": "balanceOf",
        "parameters": [":userAddress"],
        "returnValueTest": { "comparator": ">", "value": "0" }
      }
    ]
  },
  "chain": "ethereum",
  "accessControlConditionType": "standard"
}"#;

/// Parse [`WIRE_BUNDLE_JSON`].
pub fn wire_bundle() -> WireBundle {
    serde_json::from_str(WIRE_BUNDLE_JSON).expect("golden bundle parses")
}

/// Check every codec vector, returning `(name, passed, detail)` per vector.
pub fn verify_codec_vectors() -> Vec<(String, bool, String)> {
    codec_vectors()
        .into_iter()
        .map(|v| {
            let encoded = codec::encode(v.raw);
            if encoded != v.encoded {
                return (v.name.to_string(), false, format!("encoded as {encoded}"));
            }
            match codec::decode(v.encoded) {
                Ok(raw) if raw == v.raw => (v.name.to_string(), true, String::new()),
                Ok(raw) => (v.name.to_string(), false, format!("decoded to {}", hex::encode(raw))),
                Err(e) => (v.name.to_string(), false, e.to_string()),
            }
        })
        .collect()
}
