//! # Canonical Serialization — Deterministic Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! digest computation and signature input across the RDA Stack.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()` / `from_value()`, which
//! reject floats and then serialize with RFC 8785 (JSON Canonicalization
//! Scheme) rules: sorted keys, compact separators, deterministic bytes.
//!
//! Claim signatures and deployment-address derivation both depend on two
//! parties producing byte-identical encodings of the same value. Funneling
//! every signing and digest path through one constructor makes a divergent
//! encoding unrepresentable rather than merely discouraged.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with float rejection.
///
/// # Invariants
///
/// - The only constructors are `CanonicalBytes::new()` and `from_value()`.
/// - Numeric values are integers; floats are rejected at construction.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
///
/// The inner `Vec<u8>` is private, so downstream code cannot smuggle
/// non-canonical bytes into a digest or signature path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains
    /// float numbers, or `SerializationFailed` if JCS serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest or signature computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively reject float values anywhere in a JSON tree.
///
/// Amounts in the RDA Stack are integers (token base units) or strings.
/// A float admits multiple canonical encodings across languages and would
/// split the digest space, so it is an error rather than a coercion.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_floats(v)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for v in arr {
                reject_floats(v)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_keys_compact_separators() {
        let data = serde_json::json!({"topic": 7, "issuer": "0xabc", "data": {"kyc": true}});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"data":{"kyc":true},"issuer":"0xabc","topic":7}"#);
    }

    #[test]
    fn float_amount_rejected() {
        let data = serde_json::json!({"amount": 10.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 10.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn nested_float_rejected() {
        let data = serde_json::json!({"cfg": {"modules": [{"cap": 0.25}]}});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integer_amounts_accepted() {
        let data = serde_json::json!({"amount": 1_000_000u64});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"amount":1000000}"#);
    }

    #[test]
    fn empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), 2);
    }

    #[test]
    fn deterministic_across_constructions() {
        let data = serde_json::json!({"b": 2, "a": 1});
        let cb1 = CanonicalBytes::new(&data).unwrap();
        let cb2 = CanonicalBytes::from_value(data).unwrap();
        assert_eq!(cb1, cb2);
    }

    #[test]
    fn unicode_passes_through() {
        let data = serde_json::json!({"name": "Ürdoga Sécurité"});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert!(s.contains("Sécurité"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for JSON values over the float-free domain.
    fn json_value_no_floats() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,40}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(|m| {
                    let map: serde_json::Map<String, Value> = m.into_iter().collect();
                    Value::Object(map)
                }),
            ]
        })
    }

    proptest! {
        /// Canonicalization succeeds and is deterministic over float-free values.
        #[test]
        fn canonicalization_deterministic(value in json_value_no_floats()) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        /// Canonical output is valid JSON.
        #[test]
        fn canonical_output_parses(value in json_value_no_floats()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let parsed: Result<Value, _> = serde_json::from_slice(cb.as_bytes());
            prop_assert!(parsed.is_ok());
        }

        /// Any non-integer float anywhere in the tree is rejected.
        #[test]
        fn floats_always_rejected(f in any::<f64>().prop_filter("non-integer", |f| {
            f.fract() != 0.0 && f.is_finite()
        })) {
            let data = serde_json::json!({"amount": f});
            prop_assert!(CanonicalBytes::new(&data).is_err());
        }
    }
}
