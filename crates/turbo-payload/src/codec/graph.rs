//! Reference-preserving graph codec.
//!
//! The payload is a flat JSON array of nodes. Node 0 is the root; containers
//! refer to other nodes by index, so shared and cyclic references survive the
//! round trip. Values with no JSON form use negative sentinel indices:
//!
//! ```text
//! {a: 1, b: Set {1}}   =>   [{"a":1,"b":2},1,["Set",3],1]
//! undefined             =>   -1
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use super::json::number_to_json;
use crate::{KindSet, Object, PayloadCodec, SerializationError, SharedValue, Value};

const UNDEFINED: i64 = -1;
const NAN: i64 = -3;
const POSITIVE_INFINITY: i64 = -4;
const NEGATIVE_INFINITY: i64 = -5;
const NEGATIVE_ZERO: i64 = -6;

/// Codec supporting every structured value kind, including cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphCodec;

impl GraphCodec {
    /// Create a new graph codec.
    pub fn new() -> Self {
        Self
    }
}

impl PayloadCodec for GraphCodec {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn supported_kinds(&self) -> KindSet {
        KindSet::structured()
    }

    fn encode(&self, value: &Value) -> Result<String, SerializationError> {
        self.validate(value)?;

        let mut encoder = Encoder::default();
        let root = encoder.flatten(value)?;
        if root < 0 {
            return Ok(root.to_string());
        }
        Ok(serde_json::to_string(&JsonValue::Array(encoder.values))?)
    }

    fn decode(&self, payload: &str) -> Result<Value, SerializationError> {
        match serde_json::from_str::<JsonValue>(payload)? {
            JsonValue::Number(n) => match n.as_i64() {
                Some(index) if index < 0 => special(index),
                _ => Err(malformed("root index must be a negative sentinel")),
            },
            JsonValue::Array(entries) if !entries.is_empty() => {
                Decoder::new(&entries)?.hydrate(0)
            }
            _ => Err(malformed("expected a node array")),
        }
    }
}

fn malformed(message: impl Into<String>) -> SerializationError {
    SerializationError::Malformed(message.into())
}

#[derive(Default)]
struct Encoder {
    values: Vec<JsonValue>,
    nodes: HashMap<usize, i64>,
    in_progress: HashSet<usize>,
}

impl Encoder {
    fn reserve(&mut self) -> i64 {
        self.values.push(JsonValue::Null);
        (self.values.len() - 1) as i64
    }

    fn flatten(&mut self, value: &Value) -> Result<i64, SerializationError> {
        match value {
            Value::Undefined => return Ok(UNDEFINED),
            Value::Number(n) if n.is_nan() => return Ok(NAN),
            Value::Number(n) if n.is_infinite() => {
                return Ok(if *n > 0.0 {
                    POSITIVE_INFINITY
                } else {
                    NEGATIVE_INFINITY
                });
            }
            Value::Number(n) if *n == 0.0 && n.is_sign_negative() => return Ok(NEGATIVE_ZERO),
            Value::Shared(node) => return self.flatten_shared(node),
            _ => {}
        }

        let index = self.reserve();
        let entry = self.entry(value)?;
        self.values[index as usize] = entry;
        Ok(index)
    }

    fn flatten_shared(&mut self, node: &SharedValue) -> Result<i64, SerializationError> {
        let addr = node.addr();
        if let Some(index) = self.nodes.get(&addr) {
            return Ok(*index);
        }
        if !self.in_progress.insert(addr) {
            return Err(malformed("reference cycle does not pass through a container"));
        }

        let index = node.with(|inner| {
            if !is_container(inner) {
                return self.flatten(inner);
            }
            let index = self.reserve();
            self.nodes.insert(addr, index);
            let entry = self.entry(inner)?;
            self.values[index as usize] = entry;
            Ok(index)
        })?;

        self.in_progress.remove(&addr);
        if index >= 0 {
            self.nodes.insert(addr, index);
        }
        Ok(index)
    }

    fn entry(&mut self, value: &Value) -> Result<JsonValue, SerializationError> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => number_to_json(*n).ok_or_else(|| malformed("non-finite number"))?,
            Value::String(s) => JsonValue::String(s.clone()),
            Value::BigInt(n) => tagged("BigInt", [JsonValue::String(n.to_string())]),
            Value::Date(date) => tagged(
                "Date",
                [JsonValue::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true))],
            ),
            Value::RegExp(re) => tagged(
                "RegExp",
                [
                    JsonValue::String(re.source.clone()),
                    JsonValue::String(re.flags.clone()),
                ],
            ),
            Value::Array(items) => JsonValue::Array(self.flatten_all(items)?),
            Value::Set(items) => {
                let indexes = self.flatten_all(items)?;
                tagged("Set", indexes)
            }
            Value::Map(entries) => {
                let mut indexes = Vec::with_capacity(entries.len() * 2);
                for (k, v) in entries {
                    indexes.push(JsonValue::from(self.flatten(k)?));
                    indexes.push(JsonValue::from(self.flatten(v)?));
                }
                tagged("Map", indexes)
            }
            Value::Object(fields) => {
                let mut map = serde_json::Map::with_capacity(fields.len());
                for (k, v) in fields {
                    map.insert(k.clone(), JsonValue::from(self.flatten(v)?));
                }
                JsonValue::Object(map)
            }
            other => {
                return Err(SerializationError::Unsupported {
                    codec: "graph",
                    kind: other.kind(),
                    path: "$".to_string(),
                })
            }
        })
    }

    fn flatten_all(&mut self, items: &[Value]) -> Result<Vec<JsonValue>, SerializationError> {
        items
            .iter()
            .map(|v| self.flatten(v).map(JsonValue::from))
            .collect()
    }
}

fn is_container(value: &Value) -> bool {
    matches!(
        value,
        Value::Array(_) | Value::Object(_) | Value::Map(_) | Value::Set(_)
    )
}

fn tagged(tag: &str, rest: impl IntoIterator<Item = JsonValue>) -> JsonValue {
    let mut items = vec![JsonValue::String(tag.to_string())];
    items.extend(rest);
    JsonValue::Array(items)
}

fn special(index: i64) -> Result<Value, SerializationError> {
    match index {
        UNDEFINED => Ok(Value::Undefined),
        NAN => Ok(Value::Number(f64::NAN)),
        POSITIVE_INFINITY => Ok(Value::Number(f64::INFINITY)),
        NEGATIVE_INFINITY => Ok(Value::Number(f64::NEG_INFINITY)),
        NEGATIVE_ZERO => Ok(Value::Number(-0.0)),
        other => Err(malformed(format!("unknown sentinel {other}"))),
    }
}

fn as_index(value: &JsonValue) -> Result<i64, SerializationError> {
    value
        .as_i64()
        .ok_or_else(|| malformed(format!("expected node index, found {value}")))
}

/// Node indexes referenced by an entry.
fn children(entry: &JsonValue) -> Result<Vec<i64>, SerializationError> {
    match entry {
        JsonValue::Array(items) => match items.first() {
            Some(JsonValue::String(tag)) => match tag.as_str() {
                "Set" | "Map" => items[1..].iter().map(as_index).collect(),
                _ => Ok(Vec::new()),
            },
            _ => items.iter().map(as_index).collect(),
        },
        JsonValue::Object(fields) => fields.values().map(as_index).collect(),
        _ => Ok(Vec::new()),
    }
}

struct Decoder<'a> {
    entries: &'a [JsonValue],
    refs: Vec<usize>,
    shared: HashMap<usize, SharedValue>,
    building: HashSet<usize>,
}

impl<'a> Decoder<'a> {
    fn new(entries: &'a [JsonValue]) -> Result<Self, SerializationError> {
        let mut refs = vec![0usize; entries.len()];
        refs[0] = 1;
        for entry in entries {
            for child in children(entry)? {
                if child < 0 {
                    special(child)?;
                    continue;
                }
                let slot = refs
                    .get_mut(child as usize)
                    .ok_or_else(|| malformed(format!("node index {child} out of range")))?;
                *slot += 1;
            }
        }

        Ok(Self {
            entries,
            refs,
            shared: HashMap::new(),
            building: HashSet::new(),
        })
    }

    fn hydrate(&mut self, index: i64) -> Result<Value, SerializationError> {
        if index < 0 {
            return special(index);
        }
        let i = index as usize;

        if self.refs[i] > 1 {
            if let Some(node) = self.shared.get(&i) {
                return Ok(Value::Shared(node.clone()));
            }
            let node = SharedValue::new(Value::Undefined);
            self.shared.insert(i, node.clone());
            let value = self.build(i)?;
            node.set(value);
            return Ok(Value::Shared(node));
        }

        if !self.building.insert(i) {
            return Err(malformed(format!("node {i} is part of an unshared cycle")));
        }
        let value = self.build(i)?;
        self.building.remove(&i);
        Ok(value)
    }

    fn build(&mut self, i: usize) -> Result<Value, SerializationError> {
        let entries = self.entries;
        Ok(match &entries[i] {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => match items.first() {
                Some(JsonValue::String(tag)) => self.build_tagged(tag, &items[1..])?,
                _ => Value::Array(self.hydrate_all(items)?),
            },
            JsonValue::Object(fields) => {
                let mut object = Object::with_capacity(fields.len());
                for (k, v) in fields {
                    object.insert(k.clone(), self.hydrate(as_index(v)?)?);
                }
                Value::Object(object)
            }
        })
    }

    fn build_tagged(&mut self, tag: &str, rest: &[JsonValue]) -> Result<Value, SerializationError> {
        let text = |n: usize| {
            rest.get(n)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| malformed(format!("{tag} node is missing field {n}")))
        };

        Ok(match tag {
            "Date" => {
                let date = DateTime::parse_from_rfc3339(text(0)?)
                    .map_err(|e| malformed(format!("invalid date: {e}")))?;
                Value::Date(date.with_timezone(&Utc))
            }
            "RegExp" => Value::regexp(text(0)?, rest.get(1).and_then(JsonValue::as_str).unwrap_or("")),
            "BigInt" => {
                let n = text(0)?
                    .parse::<i128>()
                    .map_err(|e| malformed(format!("invalid bigint: {e}")))?;
                Value::BigInt(n)
            }
            "Set" => Value::Set(self.hydrate_all(rest)?),
            "Map" => {
                if rest.len() % 2 != 0 {
                    return Err(malformed("map node has an odd number of indexes"));
                }
                let mut entries = Vec::with_capacity(rest.len() / 2);
                for pair in rest.chunks(2) {
                    let k = self.hydrate(as_index(&pair[0])?)?;
                    let v = self.hydrate(as_index(&pair[1])?)?;
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
            other => return Err(malformed(format!("unknown node type {other:?}"))),
        })
    }

    fn hydrate_all(&mut self, items: &[JsonValue]) -> Result<Vec<Value>, SerializationError> {
        items.iter().map(|v| self.hydrate(as_index(v)?)).collect()
    }
}
