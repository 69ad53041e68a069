//! Route matching primitives for TurboCommerce framework.
//!
//! The router hands the load pipeline an already-resolved [`RouteMatch`]:
//!
//! ```text
//! https://shop.example/blog/some-post?foo=bar&baz
//!   host   = "shop.example"
//!   path   = "/blog/some-post"
//!   params = { slug: "some-post" }      (pattern "/blog/:slug")
//!   query  = { foo: "bar", baz: true }
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use turbo_router::prelude::*;
//!
//! let mut registry = RouteRegistry::new();
//! registry.register("/blog/:slug", "BlogPost");
//! registry.error_boundary("/blog", "BlogError");
//!
//! let (entry, route) = registry.resolve("shop.example", "/blog/hello?draft").unwrap();
//! assert_eq!(route.param("slug"), Some("hello"));
//! assert!(route.query_flag("draft"));
//! ```

pub mod prelude;
mod error;
mod registry;
mod route;

pub use error::*;
pub use registry::*;
pub use route::*;
