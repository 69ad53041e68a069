//! # TurboCommerce SDK
//!
//! Universal page data loading: a page's load routine runs on the server
//! for the first request and on the client for every later navigation,
//! and its result becomes props, an error page, or a redirect.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use turbo_sdk::prelude::*;
//!
//! let app = TurboApp::new("my-store")
//!     .page(
//!         "/product/:id",
//!         Page::new("ProductPage").with_load(load_fn(|ctx: LoadContext| async move {
//!             let api = ctx.api().ok_or_else(|| LoadError::msg("no transport"))?;
//!             let id = ctx.page().param("id").unwrap_or_default();
//!             let product: serde_json::Value = api.get(format!("/api/products/{}", id)).send_json().await?;
//!             Ok(LoadReturn::props(product))
//!         })),
//!     )
//!     .page("/account", Page::new("Account").with_load(sync_load_fn(|ctx| {
//!         if ctx.session().get("user").is_none() {
//!             return Ok(LoadReturn::redirect(302, "/login"));
//!         }
//!         Ok(LoadReturn::nothing())
//!     })))
//!     .error_boundary("/", "ErrorPage");
//! ```
//!
//! ## Crates
//!
//! - [`turbo_core`]: context building, invocation, normalization, dispatch,
//!   the server and client runtimes
//! - [`turbo_router`]: route matching and error boundaries
//! - [`turbo_payload`]: prop values and the payload codecs
//! - [`turbo_data`]: the request facade shared by both runtimes
//! - [`turbo_observability`]: structured logging and navigation metrics

pub mod prelude;

// Re-export framework crates
pub use turbo_core;
pub use turbo_data;
pub use turbo_observability;
pub use turbo_payload;
pub use turbo_router;

// Re-export core types
pub use turbo_core::{
    generate_shell_html, ClientRuntime, NavigationResult, Page, ServerRequest, ServerResponse,
    ServerRuntime, TurboApp, TurboConfig, TurboError,
};
pub use turbo_observability::init_tracing;

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::sync::Arc;

    struct TitleRenderer;

    impl Renderer for TitleRenderer {
        fn render(&self, component: &str, props: &Props) -> String {
            let title = props.get("title").and_then(|t| t.as_str().map(str::to_owned));
            format!("<{}>{}</{}>", component, title.unwrap_or_default(), component)
        }
    }

    fn app() -> TurboApp {
        TurboApp::new("store")
            .page(
                "/product/:id",
                Page::new("ProductPage").with_load(sync_load_fn(|ctx| {
                    let id = ctx.page().param("id").unwrap_or_default();
                    Ok(LoadReturn::props(serde_json::json!({ "title": format!("Product {}", id) })))
                })),
            )
            .error_boundary("/", "ErrorPage")
    }

    // === Prelude Tests ===

    #[tokio::test]
    async fn test_server_render_then_client_hydrate() {
        let server = ServerRuntime::from_app(app(), Arc::new(TitleRenderer)).unwrap();
        let client = ClientRuntime::from_app(app(), Arc::new(TitleRenderer), "store.test").unwrap();

        let response = server.render(ServerRequest::new("store.test", "/product/5")).await.unwrap();
        let html = response.html().unwrap();
        assert!(html.contains("<ProductPage>Product 5</ProductPage>"));

        let result = client.hydrate_document("/product/5", html).await.unwrap();
        assert_eq!(result.html(), Some("<ProductPage>Product 5</ProductPage>"));
    }

    #[tokio::test]
    async fn test_unknown_page_uses_boundary() {
        let client = ClientRuntime::from_app(app(), Arc::new(TitleRenderer), "store.test").unwrap();
        let result = client.navigate("/nowhere").await.unwrap();

        assert!(matches!(result, NavigationResult::ErrorRendered { status: 404, .. }));
    }
}
