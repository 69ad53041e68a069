//! TurboCommerce Core Framework
//!
//! Universal page data loading: every page may declare a load routine that
//! runs on the server for the first request and on the client for later
//! navigations, with the same result either way.
//!
//! # Architecture
//!
//! A navigation flows through five steps:
//! - [`LoadContext::build`] assembles the routine's argument from the
//!   resolved route, the session and the navigation id
//! - [`LoadInvoker::invoke`] runs the routine, catching failures and panics
//! - [`normalize`] turns whatever it returned into a [`LoadOutcome`]
//! - [`Dispatcher::dispatch`] renders the page, an error boundary, or
//!   follows a redirect
//! - [`SerializationBridge`] carries props from the server render into
//!   client hydration
//!
//! [`ServerRuntime`] and [`ClientRuntime`] wire these together.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use turbo_core::prelude::*;
//!
//! let app = TurboApp::new("my-store")
//!     .page(
//!         "/product/:id",
//!         Page::new("ProductPage").with_load(load_fn(|ctx: LoadContext| async move {
//!             let id = ctx.page().param("id").unwrap_or_default().to_string();
//!             Ok(LoadReturn::props(serde_json::json!({ "id": id })))
//!         })),
//!     )
//!     .error_boundary("/", "ErrorPage");
//!
//! let server = ServerRuntime::from_app(app, renderer)?;
//! let response = server.render(ServerRequest::new("my-store.com", "/product/42")).await?;
//! ```

pub mod prelude;
mod app;
mod bridge;
mod client;
mod context;
mod dispatch;
mod error;
mod load;
mod navigation;
mod outcome;
mod pipeline;
mod server;

pub use app::*;
pub use bridge::*;
pub use client::*;
pub use context::*;
pub use dispatch::*;
pub use error::*;
pub use load::*;
pub use navigation::*;
pub use outcome::*;
pub use server::*;
