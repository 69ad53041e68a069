//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use turbo_sdk::prelude::*;
//! ```
//!
//! This imports all commonly used items:
//! - App setup: `TurboApp`, `TurboConfig`, `Page`
//! - Load routines: `load_fn`, `sync_load_fn`, `LoadContext`, `LoadReturn`
//! - Runtimes: `ServerRuntime`, `ClientRuntime`
//! - Routing: `RouteMatch`, `RouteRegistry`, `QueryValue`
//! - Requests: `Api`, `Transport`

pub use turbo_core::prelude::*;

pub use turbo_core::{Dispatched, LoadInvoker, NavigationId, SerializationBridge};
pub use turbo_observability::{LogFormat, NavigationMetrics, StructuredLogger};
