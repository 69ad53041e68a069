//! Plain JSON codec.

use serde_json::Value as JsonValue;

use crate::{KindSet, PayloadCodec, SerializationError, Value};

/// Codec for props that are plain JSON.
///
/// Rejects maps, sets, dates, regular expressions, bigints, non-finite
/// numbers, `undefined` and shared references.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    pub fn new() -> Self {
        Self
    }
}

impl PayloadCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn supported_kinds(&self) -> KindSet {
        KindSet::json()
    }

    fn encode(&self, value: &Value) -> Result<String, SerializationError> {
        self.validate(value)?;
        let json = to_json(value)?;
        Ok(serde_json::to_string(&json)?)
    }

    fn decode(&self, payload: &str) -> Result<Value, SerializationError> {
        let json: JsonValue = serde_json::from_str(payload)?;
        Ok(Value::from(json))
    }
}

fn to_json(value: &Value) -> Result<JsonValue, SerializationError> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => number_to_json(*n).ok_or_else(|| unsupported(value))?,
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Array(items) => JsonValue::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        Value::Object(fields) => JsonValue::Object(
            fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<Result<_, SerializationError>>()?,
        ),
        Value::Shared(node) => node.with(to_json)?,
        other => return Err(unsupported(other)),
    })
}

fn unsupported(value: &Value) -> SerializationError {
    SerializationError::Unsupported {
        codec: "json",
        kind: value.kind(),
        path: "$".to_string(),
    }
}

/// Convert a finite number, keeping integral values integral.
pub(crate) fn number_to_json(n: f64) -> Option<JsonValue> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(JsonValue::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(JsonValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SharedValue, ValueKind};
    use serde_json::json;

    #[test]
    fn test_encode_plain_object() {
        let value = Value::from(json!({"a": 1, "b": [1.5, "x", null, true]}));
        let encoded = JsonCodec::new().encode(&value).unwrap();

        assert_eq!(encoded, r#"{"a":1,"b":[1.5,"x",null,true]}"#);
    }

    #[test]
    fn test_round_trip() {
        let codec = JsonCodec::new();
        let value = Value::from(json!({"title": "Hello", "tags": ["a", "b"], "n": 3}));

        let decoded = codec.decode(&codec.encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_rejects_date() {
        let value = Value::object([("at", Value::from(chrono::Utc::now()))]);
        let err = JsonCodec::new().encode(&value).unwrap_err();

        assert_eq!(
            err,
            SerializationError::Unsupported {
                codec: "json",
                kind: ValueKind::Date,
                path: "$.at".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_shared_reference() {
        let node = SharedValue::new(Value::empty_object());
        let value = Value::object([
            ("a", Value::Shared(node.clone())),
            ("b", Value::Shared(node)),
        ]);

        assert!(JsonCodec::new().encode(&value).is_err());
    }

    #[test]
    fn test_single_shared_node_is_plain_json() {
        let value = Value::object([("a", Value::from(1).shared())]);
        assert_eq!(JsonCodec::new().encode(&value).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(
            JsonCodec::new().decode("{oops"),
            Err(SerializationError::Json(_))
        ));
    }
}
