//! Cross-runtime serialization bridge.
//!
//! On the server, props are encoded into a `<script>` element so the client
//! can hydrate without running the load routine again. The whole value
//! graph is validated against the codec before anything is produced, so a
//! failure leaves the page untouched.

use std::sync::Arc;

use turbo_payload::{GraphCodec, PayloadCodec, SerializationError};

use crate::dispatch::escape_html;
use crate::Props;

/// Default `id` of the embedded data script.
pub const DEFAULT_DATA_SCRIPT_ID: &str = "__turbo_data";

/// Encoded props ready to be placed in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPayload {
    /// Name of the codec that produced `data`.
    pub codec: &'static str,
    /// The encoded props.
    pub data: String,
    /// `<script>` element carrying `data`.
    pub html: String,
}

impl EmbeddedPayload {
    /// Size of the encoded props in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encodes props for embedding and decodes them during hydration.
#[derive(Clone)]
pub struct SerializationBridge {
    codec: Arc<dyn PayloadCodec>,
    script_id: String,
}

impl std::fmt::Debug for SerializationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationBridge")
            .field("codec", &self.codec.name())
            .field("script_id", &self.script_id)
            .finish()
    }
}

impl Default for SerializationBridge {
    fn default() -> Self {
        Self::new(Arc::new(GraphCodec::new()))
    }
}

impl SerializationBridge {
    /// Create a bridge using `codec`.
    pub fn new(codec: Arc<dyn PayloadCodec>) -> Self {
        Self {
            codec,
            script_id: DEFAULT_DATA_SCRIPT_ID.to_string(),
        }
    }

    /// Set the `id` of the data script.
    pub fn with_script_id(mut self, id: impl Into<String>) -> Self {
        self.script_id = id.into();
        self
    }

    /// The codec in use.
    pub fn codec(&self) -> &dyn PayloadCodec {
        self.codec.as_ref()
    }

    /// The `id` of the data script.
    pub fn script_id(&self) -> &str {
        &self.script_id
    }

    /// Encode props for embedding.
    ///
    /// Functions and unrecognized object types fail with
    /// [`SerializationError`]; nothing is produced in that case.
    pub fn embed(&self, props: &Props) -> Result<EmbeddedPayload, SerializationError> {
        self.codec.validate(&props.values)?;
        let data = self.codec.encode(&props.values)?;
        let html = format!(
            r#"<script type="application/json" id="{}" data-codec="{}">{}</script>"#,
            escape_html(&self.script_id),
            self.codec.name(),
            escape_script_text(&data)
        );
        Ok(EmbeddedPayload {
            codec: self.codec.name(),
            data,
            html,
        })
    }

    /// Find the encoded props inside a rendered document.
    pub fn locate<'a>(&self, document: &'a str) -> Option<&'a str> {
        let id_attr = format!(r#"id="{}""#, escape_html(&self.script_id));
        let mut rest = document;
        while let Some(start) = rest.find("<script") {
            let after = &rest[start..];
            let open_end = after.find('>')?;
            let body = &after[open_end + 1..];
            let close = body.find("</script>")?;
            if after[..open_end].contains(&id_attr) {
                return Some(&body[..close]);
            }
            rest = &body[close..];
        }
        None
    }

    /// Decode props embedded by [`SerializationBridge::embed`].
    pub fn extract(&self, data: &str) -> Result<Props, SerializationError> {
        Ok(Props::new(self.codec.decode(data)?))
    }
}

/// Make encoded JSON safe inside a `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where their `\u` escapes
/// decode to the same text. U+2028 and U+2029 are escaped the same way.
pub fn escape_script_text(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
