//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use turbo_router::prelude::*;
//! ```

pub use crate::{
    QueryValue, RouteEntry, RouteError, RouteMatch, RouteMatchBuilder, RouteMeta, RouteRegistry,
};
