//! # Canonical JSON Serialization
//!
//! Deterministic byte encoding of JSON schemas. Two semantically equal
//! schemas must produce byte-identical canonical output across every
//! conforming implementation, otherwise signatures made by one
//! implementation would fail to verify in another.
//!
//! ## Canonicalization Rules
//!
//! 1. **Object keys** are emitted in lexicographic order of their UTF-8
//!    byte sequences.
//! 2. **No insignificant whitespace**; separators are exactly `,` and `:`.
//! 3. **Strings** use minimal escaping: only `"`, `\`, and control
//!    characters below U+0020 are escaped. All other characters are
//!    emitted as raw UTF-8, never as `\uXXXX`.
//! 4. **Numbers** use the shortest decimal form that round-trips to the
//!    same IEEE-754 double. Doubles with no fractional part inside the
//!    `i64` range are emitted without a decimal point.
//! 5. **Arrays** keep their element order.
//!
//! Non-finite numbers (NaN, infinities) are not representable in a
//! [`serde_json::Value`]. Duplicate object keys cannot exist in one
//! either, but a plain parse would silently keep the last duplicate
//! from the source text — [`parse_schema`] rejects them instead and is
//! the required entry point for untrusted schema text.
//!
//! ## Threat Model
//!
//! Canonicalization defends against key-reordering and whitespace
//! manipulation: without it, an attacker could present a bytewise
//! different but semantically identical schema that hashes differently,
//! or sneak a semantic change past a byte-level comparison.
//!
//! ## Example
//!
//! ```rust
//! use schemapin_crypto::canonicalize::canonicalize;
//! use serde_json::json;
//!
//! let schema = json!({"name": "t", "description": "A test"});
//! assert_eq!(canonicalize(&schema), r#"{"description":"A test","name":"t"}"#);
//! ```

use crate::models::Hash;
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Parses schema text strictly, rejecting duplicate object keys.
///
/// A lenient parse keeps the last of two duplicate keys, which would
/// let two implementations disagree about what was signed. This parser
/// errors instead, and also refuses non-finite numbers.
///
/// # Example
///
/// ```rust
/// use schemapin_crypto::canonicalize::parse_schema;
///
/// assert!(parse_schema(r#"{"a": 1, "b": 2}"#).is_ok());
/// assert!(parse_schema(r#"{"a": 1, "a": 2}"#).is_err());
/// ```
pub fn parse_schema(text: &str) -> serde_json::Result<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let value = StrictValue.deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

struct StrictValue;

impl<'de> DeserializeSeed<'de> for StrictValue {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictValueVisitor)
    }
}

struct StrictValueVisitor;

impl<'de> Visitor<'de> for StrictValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| de::Error::custom("non-finite numbers are not permitted"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut array = Vec::new();
        while let Some(value) = seq.next_element_seed(StrictValue)? {
            array.push(value);
        }
        Ok(Value::Array(array))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = serde_json::Map::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(StrictValue)?;
            if object.insert(key.clone(), value).is_some() {
                return Err(de::Error::custom(format!("duplicate object key: {:?}", key)));
            }
        }
        Ok(Value::Object(object))
    }
}

/// Canonicalizes a JSON value to its deterministic string form.
///
/// The output depends only on the value, never on map insertion order
/// or the formatting of the source text.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Computes the SHA-256 digest of the canonical form of a JSON value.
///
/// This digest is what gets signed and verified; see the signing module.
///
/// # Example
///
/// ```rust
/// use schemapin_crypto::canonicalize::canonicalize_and_hash;
/// use serde_json::json;
///
/// let a = canonicalize_and_hash(&json!({"b": 1, "a": 2}));
/// let b = canonicalize_and_hash(&json!({"a": 2, "b": 1}));
/// assert_eq!(a, b);
/// ```
pub fn canonicalize_and_hash(value: &Value) -> Hash {
    let canonical = canonicalize(value);
    Sha256::digest(canonical.as_bytes()).into()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            // Lexicographic on UTF-8 bytes, which for Unicode scalar
            // values equals code-point order.
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, val);
            }
            out.push('}');
        }
    }
}

/// Emits a number in its shortest round-tripping decimal form.
fn write_number(out: &mut String, n: &serde_json::Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        // Integral doubles inside the i64 range drop the fractional part.
        if f.fract() == 0.0 && f > (i64::MIN as f64) && f < (i64::MAX as f64) {
            out.push_str(&(f as i64).to_string());
        } else {
            // Rust's Display for f64 emits the shortest digit sequence
            // that parses back to the same double.
            out.push_str(&f.to_string());
        }
    } else {
        out.push_str(&n.to_string());
    }
}

/// Emits a string with minimal JSON escaping.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
