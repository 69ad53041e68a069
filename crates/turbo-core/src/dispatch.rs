//! Outcome dispatch.
//!
//! One [`Dispatcher`] per navigation moves through
//! `Pending -> {Rendering, ErrorRendering, Redirecting} -> Done` exactly once.

use turbo_payload::Value;
use turbo_router::split_url;

use crate::{DispatchError, LoadOutcome, Props, RedirectLoopError};

/// Default cap on the length of a redirect chain.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Produces markup for a component. Implemented by the view layer.
pub trait Renderer: Send + Sync {
    /// Render `component` with `props` as its inputs.
    fn render(&self, component: &str, props: &Props) -> String;
}

/// Dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Pending,
    Rendering,
    ErrorRendering,
    Redirecting,
    Done,
}

/// Components available to a navigation.
#[derive(Clone, Copy)]
pub struct DispatchTargets<'a> {
    /// The matched page, if any route matched.
    pub page: Option<&'a str>,
    /// The nearest error boundary covering the path.
    pub error_boundary: Option<&'a str>,
    pub renderer: &'a dyn Renderer,
}

/// The terminal action taken for a navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The page rendered with its props.
    Rendered { html: String, props: Props },
    /// An error boundary (or the default error page) rendered.
    ErrorRendered {
        status: u16,
        message: String,
        html: String,
    },
    /// Rendering was abandoned in favor of a new navigation.
    Redirect { status: u16, to: String },
}

/// Bounds a chain of redirects that started from one navigation.
#[derive(Debug, Clone)]
pub struct RedirectGuard {
    limit: u32,
    chain: Vec<String>,
}

impl RedirectGuard {
    /// Start a chain at `origin`.
    pub fn new(origin: &str, limit: u32) -> Self {
        Self {
            limit,
            chain: vec![request_target(origin)],
        }
    }

    /// Number of redirects followed so far.
    pub fn redirects(&self) -> u32 {
        (self.chain.len() - 1) as u32
    }

    /// Request targets visited, starting with the origin.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Record a redirect from `from` to `to`.
    ///
    /// Fails immediately when `to` is the request target that triggered the redirect,
    /// and once the chain grows past the limit.
    pub fn check(&mut self, from: &str, to: &str) -> Result<(), RedirectLoopError> {
        let from = request_target(from);
        let to = request_target(to);

        if from == to {
            return Err(RedirectLoopError::SelfRedirect { path: from });
        }

        self.chain.push(to);
        if self.redirects() > self.limit {
            return Err(RedirectLoopError::TooManyRedirects {
                limit: self.limit,
                chain: self.chain.clone(),
            });
        }
        Ok(())
    }
}

/// Reduce a URL to a comparable request target.
///
/// Drops scheme, host and fragment, and a trailing slash on the path. The
/// query is kept, so `/search` and `/search?page=1` are different targets.
pub fn request_target(url: &str) -> String {
    let without_origin = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    };
    let (path, query) = split_url(without_origin);
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}

/// Routes one navigation's outcome to its terminal action.
#[derive(Debug)]
pub struct Dispatcher {
    path: String,
    state: DispatchState,
}

impl Dispatcher {
    /// Create a dispatcher for the navigation to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: DispatchState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Dispatch `outcome`. Only the first call succeeds.
    pub fn dispatch(
        &mut self,
        outcome: LoadOutcome,
        targets: DispatchTargets<'_>,
        guard: &mut RedirectGuard,
    ) -> Result<Dispatched, DispatchError> {
        if self.state != DispatchState::Pending {
            return Err(DispatchError::AlreadyDispatched { state: self.state });
        }

        let dispatched = match outcome {
            LoadOutcome::Props(props) => match targets.page {
                Some(page) => {
                    self.state = DispatchState::Rendering;
                    let html = targets.renderer.render(page, &props);
                    Dispatched::Rendered { html, props }
                }
                None => self.render_error(404, "Not found".to_string(), targets),
            },
            LoadOutcome::ErrorPage { status, message } => self.render_error(status, message, targets),
            LoadOutcome::Redirect { status, to } => {
                self.state = DispatchState::Redirecting;
                if let Err(loop_error) = guard.check(&self.path, &to) {
                    self.state = DispatchState::Done;
                    return Err(loop_error.into());
                }
                Dispatched::Redirect { status, to }
            }
        };

        self.state = DispatchState::Done;
        Ok(dispatched)
    }

    fn render_error(&mut self, status: u16, message: String, targets: DispatchTargets<'_>) -> Dispatched {
        self.state = DispatchState::ErrorRendering;
        let html = match targets.error_boundary {
            Some(boundary) => {
                let props = Props::new(Value::object([
                    ("status", Value::from(status)),
                    ("message", Value::from(message.as_str())),
                ]));
                targets.renderer.render(boundary, &props)
            }
            None => default_error_html(status, &message),
        };
        Dispatched::ErrorRendered { status, message, html }
    }
}

/// The error page used when no boundary covers a path.
pub fn default_error_html(status: u16, message: &str) -> String {
    let message = if message.is_empty() {
        reason_phrase(status)
    } else {
        message
    };
    format!(
        r#"<main class="turbo-error"><h1>{}</h1><p>{}</p></main>"#,
        status,
        escape_html(message)
    )
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        410 => "Gone",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Error",
    }
}

/// Escape text for inclusion in HTML content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NameRenderer;

    impl Renderer for NameRenderer {
        fn render(&self, component: &str, props: &Props) -> String {
            let status = props.get("status").and_then(|s| s.as_f64());
            match status {
                Some(status) => format!("<{} status={}>", component, status),
                None => format!("<{}>", component),
            }
        }
    }

    fn targets(boundary: Option<&'static str>) -> DispatchTargets<'static> {
        DispatchTargets {
            page: Some("ProductPage"),
            error_boundary: boundary,
            renderer: &NameRenderer,
        }
    }

    fn guard() -> RedirectGuard {
        RedirectGuard::new("/account", DEFAULT_MAX_REDIRECTS)
    }

    // === State Machine Tests ===

    #[test]
    fn test_props_render_page() {
        let mut dispatcher = Dispatcher::new("/account");
        let dispatched = dispatcher
            .dispatch(LoadOutcome::Props(Props::empty()), targets(None), &mut guard())
            .unwrap();

        assert_eq!(
            dispatched,
            Dispatched::Rendered {
                html: "<ProductPage>".into(),
                props: Props::empty()
            }
        );
        assert_eq!(dispatcher.state(), DispatchState::Done);
    }

    #[test]
    fn test_outcome_dispatched_once() {
        let mut dispatcher = Dispatcher::new("/account");
        let mut guard = guard();
        dispatcher
            .dispatch(LoadOutcome::Props(Props::empty()), targets(None), &mut guard)
            .unwrap();

        let second = dispatcher.dispatch(LoadOutcome::error(500, "x"), targets(None), &mut guard);
        assert_eq!(
            second,
            Err(DispatchError::AlreadyDispatched {
                state: DispatchState::Done
            })
        );
    }

    // === Error Rendering Tests ===

    #[test]
    fn test_error_uses_boundary() {
        let mut dispatcher = Dispatcher::new("/account");
        let dispatched = dispatcher
            .dispatch(LoadOutcome::error(404, "Not found"), targets(Some("AccountError")), &mut guard())
            .unwrap();

        assert_eq!(
            dispatched,
            Dispatched::ErrorRendered {
                status: 404,
                message: "Not found".into(),
                html: "<AccountError status=404>".into(),
            }
        );
    }

    #[test]
    fn test_error_falls_back_to_default_page() {
        let mut dispatcher = Dispatcher::new("/account");
        let dispatched = dispatcher
            .dispatch(LoadOutcome::error(500, "<oops>"), targets(None), &mut guard())
            .unwrap();

        match dispatched {
            Dispatched::ErrorRendered { html, .. } => {
                assert!(html.contains("<h1>500</h1>"));
                assert!(html.contains("&lt;oops&gt;"));
            }
            other => panic!("expected error page, got {:?}", other),
        }
    }

    #[test]
    fn test_props_without_page_render_404() {
        let mut dispatcher = Dispatcher::new("/nowhere");
        let targets = DispatchTargets {
            page: None,
            error_boundary: None,
            renderer: &NameRenderer,
        };

        let dispatched = dispatcher
            .dispatch(LoadOutcome::Props(Props::empty()), targets, &mut guard())
            .unwrap();
        assert!(matches!(dispatched, Dispatched::ErrorRendered { status: 404, .. }));
    }

    // === Redirect Tests ===

    #[test]
    fn test_redirect_does_not_render() {
        let mut dispatcher = Dispatcher::new("/account");
        let dispatched = dispatcher
            .dispatch(
                LoadOutcome::Redirect {
                    status: 302,
                    to: "/login".into(),
                },
                targets(None),
                &mut guard(),
            )
            .unwrap();

        assert_eq!(
            dispatched,
            Dispatched::Redirect {
                status: 302,
                to: "/login".into()
            }
        );
    }

    #[test]
    fn test_self_redirect_fails_fast() {
        let mut dispatcher = Dispatcher::new("/account?tab=orders");
        let result = dispatcher.dispatch(
            LoadOutcome::Redirect {
                status: 302,
                to: "https://shop.test/account/?tab=orders#top".into(),
            },
            targets(None),
            &mut guard(),
        );

        assert_eq!(
            result,
            Err(DispatchError::RedirectLoop(RedirectLoopError::SelfRedirect {
                path: "/account?tab=orders".into()
            }))
        );
        assert_eq!(dispatcher.state(), DispatchState::Done);
    }

    #[test]
    fn test_redirect_changing_only_query_is_followed() {
        let mut guard = RedirectGuard::new("/search", DEFAULT_MAX_REDIRECTS);
        let mut dispatcher = Dispatcher::new("/search");
        let dispatched = dispatcher
            .dispatch(
                LoadOutcome::Redirect {
                    status: 302,
                    to: "/search?page=1".into(),
                },
                targets(None),
                &mut guard,
            )
            .unwrap();

        assert_eq!(
            dispatched,
            Dispatched::Redirect {
                status: 302,
                to: "/search?page=1".into()
            }
        );
        assert_eq!(guard.chain(), ["/search".to_string(), "/search?page=1".to_string()]);
    }

    #[test]
    fn test_guard_caps_chain_length() {
        let mut guard = RedirectGuard::new("/a", 2);
        guard.check("/a", "/b").unwrap();
        guard.check("/b", "/a").unwrap();

        let err = guard.check("/a", "/b").unwrap_err();
        assert_eq!(
            err,
            RedirectLoopError::TooManyRedirects {
                limit: 2,
                chain: vec!["/a".into(), "/b".into(), "/a".into(), "/b".into()],
            }
        );
    }

    #[test]
    fn test_request_target() {
        assert_eq!(request_target("/cart?x=1#y"), "/cart?x=1");
        assert_eq!(request_target("/cart?#y"), "/cart");
        assert_eq!(request_target("https://shop.test"), "/");
        assert_eq!(request_target("https://shop.test/cart/?x=1"), "/cart?x=1");
        assert_eq!(request_target("/"), "/");
    }
}
