//! Prop values and hydration payload codecs for TurboCommerce.
//!
//! Pages receive their props as a dynamic [`Value`] graph. On the server the
//! graph is encoded into the initial HTML so the browser can rebuild the
//! props without running the page's load routine a second time.
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_payload::{GraphCodec, PayloadCodec, SharedValue, Value};
//!
//! let author = SharedValue::new(Value::object([("name", Value::from("Ada"))]));
//! let props = Value::object([
//!     ("author", Value::Shared(author.clone())),
//!     ("editor", Value::Shared(author)),
//! ]);
//!
//! let codec = GraphCodec::new();
//! let encoded = codec.encode(&props)?;
//! let decoded = codec.decode(&encoded)?;
//! assert_eq!(decoded, props);
//! ```

mod codec;
mod error;
mod kind;
mod value;

pub use codec::{GraphCodec, JsonCodec, PayloadCodec};
pub use error::SerializationError;
pub use kind::{KindSet, ValueKind};
pub use value::{CustomObject, FunctionRef, Object, RegExp, SharedValue, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        GraphCodec, JsonCodec, KindSet, Object, PayloadCodec, SerializationError, SharedValue,
        Value, ValueKind,
    };
}
