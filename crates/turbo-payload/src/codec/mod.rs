//! Pluggable payload codecs.

mod graph;
mod json;

pub use graph::GraphCodec;
pub use json::JsonCodec;

use crate::{KindSet, SerializationError, Value};

/// A codec that turns a prop graph into text embeddable in a page and back.
///
/// Codecs declare the value kinds they support so callers can validate a
/// graph before committing to embedding it.
pub trait PayloadCodec: Send + Sync {
    /// Codec name, used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Value kinds this codec can represent.
    fn supported_kinds(&self) -> KindSet;

    /// Encode a value graph.
    fn encode(&self, value: &Value) -> Result<String, SerializationError>;

    /// Decode a payload produced by [`PayloadCodec::encode`].
    fn decode(&self, payload: &str) -> Result<Value, SerializationError>;

    /// Check that every node in `value` is supported.
    fn validate(&self, value: &Value) -> Result<(), SerializationError> {
        match value.find_unsupported(self.supported_kinds()) {
            Some((kind, path)) => Err(SerializationError::Unsupported {
                codec: self.name(),
                kind,
                path,
            }),
            None => Ok(()),
        }
    }
}
