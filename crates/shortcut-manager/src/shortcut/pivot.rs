//! Conversion between the untyped VDF tree and `serde_json::Value`.
//!
//! The JSON value is the pivot through which shortcuts are (de)serialized with
//! serde. Going to the pivot is lossless. Coming back, every number is narrowed
//! to the single integer width VDF supports and anything VDF cannot express is
//! dropped with a warning:
//!
//! | pivot value                            | VDF value              |
//! |----------------------------------------|------------------------|
//! | unsigned integer `<= u32::MAX`         | `U32`                  |
//! | negative integer `>= i32::MIN`         | `U32` (two's complement) |
//! | float with no fractional part, in range | `U32` as above        |
//! | string                                 | `String`               |
//! | object                                 | `Map` (recursively)    |
//! | null, bool, array, other numbers       | dropped                |

use serde_json::{Map, Number, Value};
use steam_vdf::{GenericMap, GenericValue};
use tracing::warn;

pub fn to_pivot(map: &GenericMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), value_to_pivot(value)))
            .collect(),
    )
}

fn value_to_pivot(value: &GenericValue) -> Value {
    match value {
        GenericValue::U32(number) => Value::Number(Number::from(*number)),
        GenericValue::String(text) => Value::String(text.clone()),
        GenericValue::Map(map) => to_pivot(map),
    }
}

/// Narrows a pivot value back into a VDF tree. A non-object root yields an
/// empty map.
pub fn from_pivot(value: &Value) -> GenericMap {
    match value {
        Value::Object(object) => coerce_object(object, ""),
        other => {
            warn!(
                event = "vdf.pivot.dropped",
                key = "<root>",
                kind = kind_of(other),
                "root value is not an object"
            );
            GenericMap::new()
        }
    }
}

fn coerce_object(object: &Map<String, Value>, parent: &str) -> GenericMap {
    let mut map = GenericMap::new();
    for (key, value) in object {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{parent}.{key}")
        };
        match coerce_value(value, &path) {
            Some(coerced) => {
                map.insert(key.clone(), coerced);
            }
            None => {
                warn!(
                    event = "vdf.pivot.dropped",
                    key = %path,
                    kind = kind_of(value),
                    "value has no VDF representation, dropping"
                );
            }
        }
    }
    map
}

fn coerce_value(value: &Value, path: &str) -> Option<GenericValue> {
    match value {
        Value::Number(number) => coerce_number(number).map(GenericValue::U32),
        Value::String(text) => Some(GenericValue::String(text.clone())),
        Value::Object(object) => Some(GenericValue::Map(coerce_object(object, path))),
        Value::Null | Value::Bool(_) | Value::Array(_) => None,
    }
}

fn coerce_number(number: &Number) -> Option<u32> {
    if let Some(unsigned) = number.as_u64() {
        return u32::try_from(unsigned).ok();
    }
    if let Some(signed) = number.as_i64() {
        return i32::try_from(signed).ok().map(|value| value as u32);
    }
    let float = number.as_f64()?;
    if !float.is_finite() || float.fract() != 0.0 {
        return None;
    }
    if (0.0..=u32::MAX as f64).contains(&float) {
        Some(float as u32)
    } else if (i32::MIN as f64..0.0).contains(&float) {
        Some(float as i32 as u32)
    } else {
        None
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pivot_keeps_types_and_order() {
        let mut inner = GenericMap::new();
        inner.insert("b".to_string(), GenericValue::U32(2));
        inner.insert("a".to_string(), GenericValue::from("x"));
        let mut root = GenericMap::new();
        root.insert("10".to_string(), GenericValue::Map(inner));
        root.insert("2".to_string(), GenericValue::U32(0));

        let pivot = to_pivot(&root);
        assert_eq!(pivot, json!({"10": {"b": 2, "a": "x"}, "2": 0}));
        assert_eq!(from_pivot(&pivot), root);
    }

    #[test]
    fn numeric_forms_encode_identically() {
        let signed = from_pivot(&json!({"n": 42i64}));
        let float = from_pivot(&json!({"n": 42.0f64}));
        let native = from_pivot(&json!({"n": 42u64}));
        assert_eq!(signed["n"], GenericValue::U32(42));
        assert_eq!(signed, float);
        assert_eq!(float, native);
        assert_eq!(
            steam_vdf::encode(&signed).expect("encode"),
            steam_vdf::encode(&float).expect("encode")
        );
    }

    #[test]
    fn negative_values_wrap_to_u32() {
        let map = from_pivot(&json!({"a": -1, "b": -2.0}));
        assert_eq!(map["a"], GenericValue::U32(u32::MAX));
        assert_eq!(map["b"], GenericValue::U32(u32::MAX - 1));
    }

    #[test]
    fn unsupported_values_are_dropped() {
        let pivot = json!({
            "keep": "yes",
            "null": null,
            "list": [1, 2],
            "flag": true,
            "fraction": 1.5,
            "huge": 5_000_000_000u64,
            "tiny": -3_000_000_000i64,
            "nested": {"gone": null, "kept": 1},
        });
        let map = from_pivot(&pivot);
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["keep", "nested"]);
        let nested = map["nested"].as_map().expect("nested map");
        assert_eq!(nested.len(), 1);
        assert_eq!(nested["kept"], GenericValue::U32(1));

        let bytes = steam_vdf::encode(&map).expect("encoding still succeeds");
        assert_eq!(steam_vdf::decode(&bytes).expect("decode"), map);
    }

    #[test]
    fn non_object_root_is_empty() {
        assert!(from_pivot(&json!([1, 2])).is_empty());
    }
}
