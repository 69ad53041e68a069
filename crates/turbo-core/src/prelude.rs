//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use turbo_core::prelude::*;
//! ```

// Router
pub use turbo_router::prelude::*;

// Payload values
pub use turbo_payload::{SerializationError, Value};

// Request facade
pub use turbo_data::{Api, FetchError, Transport};

// TurboCore types
pub use crate::{
    load_fn, sync_load_fn, ClientRuntime, LoadContext, LoadError, LoadOutcome, LoadReturn,
    LoadRoutine, NavigationResult, Page, Props, RedirectLoopError, Renderer, ServerRequest,
    ServerResponse, ServerRuntime, Session, TurboApp, TurboConfig, TurboError,
};
