//! Serialization error types.

use thiserror::Error;

use crate::ValueKind;

/// Errors raised while encoding or decoding a props payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializationError {
    /// The value graph contains a kind the codec cannot represent.
    #[error("{kind} at {path} is not supported by the {codec} codec")]
    Unsupported {
        codec: &'static str,
        kind: ValueKind,
        path: String,
    },

    /// The payload text is not a valid encoding.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SerializationError {
    fn from(e: serde_json::Error) -> Self {
        SerializationError::Json(e.to_string())
    }
}
