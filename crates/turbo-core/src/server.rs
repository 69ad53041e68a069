//! Server-side rendering.
//!
//! [`ServerRuntime`] handles one navigation per HTTP request: resolve the
//! page, run its load routine, dispatch the outcome and, for rendered
//! pages, embed the props so the client can hydrate without loading again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use turbo_data::{Api, Transport};
use turbo_observability::{LogCapture, LogFormat, MetricsCollector, NavigationMetrics, StructuredLogger};
use turbo_router::{split_url, RouteRegistry};

use crate::dispatch::{escape_html, RedirectGuard};
use crate::pipeline;
use crate::{
    ContextError, Dispatched, Dispatcher, EmbeddedPayload, LoadContext, LoadInvoker, LoadOutcome,
    NavigationId, Page, RedirectLoopError, Renderer, SerializationBridge, Session, TurboApp,
    TurboConfig, TurboError,
};

type MetricsHook = Arc<dyn Fn(&NavigationMetrics) + Send + Sync>;

/// Generate the HTML shell for SSR.
///
/// This creates the initial HTML document that wraps the page. It includes:
/// - DOCTYPE and HTML structure
/// - Meta tags and viewport
/// - The stylesheet link
/// - The embedded data script, if any
pub fn generate_shell_html(
    title: &str,
    css_path: Option<&str>,
    body_html: &str,
    data_script: Option<&str>,
) -> String {
    let css_link = css_path
        .map(|p| format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(p)))
        .unwrap_or_default();
    let title = escape_html(title);
    let data_script = data_script.unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    {css_link}
    <title>{title}</title>
</head>
<body>
    {body_html}
    {data_script}
</body>
</html>"#
    )
}

/// An incoming page request.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    /// Request host.
    pub host: String,
    /// Request target, e.g. `/blog/post?draft`.
    pub url: String,
    /// Session resolved by the hosting layer.
    pub session: Session,
}

impl ServerRequest {
    /// Create a request with an empty session.
    pub fn new(host: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            url: url.into(),
            session: Session::empty(),
        }
    }

    /// Attach the request's session.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }
}

/// The response for a page request.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerResponse {
    /// An HTML document.
    Page {
        status: u16,
        html: String,
        /// Embedded props, when they could be serialized.
        payload: Option<EmbeddedPayload>,
        /// The client must run the load routine itself because no props
        /// were embedded.
        client_load: bool,
    },
    /// Redirect the browser.
    Redirect { status: u16, location: String },
}

impl ServerResponse {
    /// HTTP status.
    pub fn status(&self) -> u16 {
        match self {
            ServerResponse::Page { status, .. } | ServerResponse::Redirect { status, .. } => *status,
        }
    }

    /// The HTML document, for page responses.
    pub fn html(&self) -> Option<&str> {
        match self {
            ServerResponse::Page { html, .. } => Some(html),
            ServerResponse::Redirect { .. } => None,
        }
    }
}

/// Renders pages for concurrent requests. Share it behind an `Arc`.
pub struct ServerRuntime {
    config: TurboConfig,
    routes: RouteRegistry<Page>,
    renderer: Arc<dyn Renderer>,
    bridge: SerializationBridge,
    invoker: LoadInvoker,
    api: Option<Api>,
    next_navigation: AtomicU64,
    log_format: LogFormat,
    log_capture: Option<LogCapture>,
    metrics_hook: Option<MetricsHook>,
}

impl std::fmt::Debug for ServerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRuntime")
            .field("config", &self.config)
            .field("bridge", &self.bridge)
            .field("invoker", &self.invoker)
            .finish_non_exhaustive()
    }
}

impl ServerRuntime {
    /// Create a runtime for validated config and routes.
    pub fn new(config: TurboConfig, routes: RouteRegistry<Page>, renderer: Arc<dyn Renderer>) -> Self {
        let bridge = SerializationBridge::new(config.payload_format.codec())
            .with_script_id(config.data_script_id.clone());
        let invoker = LoadInvoker::new().with_timeout(config.load_timeout);
        Self {
            config,
            routes,
            renderer,
            bridge,
            invoker,
            api: None,
            next_navigation: AtomicU64::new(0),
            log_format: LogFormat::default(),
            log_capture: None,
            metrics_hook: None,
        }
    }

    /// Build a runtime from an app builder.
    pub fn from_app(app: TurboApp, renderer: Arc<dyn Renderer>) -> Result<Self, TurboError> {
        let (config, routes) = app.build()?;
        Ok(Self::new(config, routes, renderer))
    }

    /// Give load routines a request facade backed by `transport`.
    ///
    /// Relative paths resolve against `api_origin`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        let api = Api::server(transport);
        self.api = Some(match &self.config.api_origin {
            Some(origin) => api.with_origin(origin.clone()),
            None => api,
        });
        self
    }

    /// Set the log output format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Copy every log entry into `capture`.
    pub fn with_log_capture(mut self, capture: LogCapture) -> Self {
        self.log_capture = Some(capture);
        self
    }

    /// Call `hook` with the metrics of every finished navigation.
    pub fn with_metrics_hook(mut self, hook: impl Fn(&NavigationMetrics) + Send + Sync + 'static) -> Self {
        self.metrics_hook = Some(Arc::new(hook));
        self
    }

    /// The configuration.
    pub fn config(&self) -> &TurboConfig {
        &self.config
    }

    /// Render the page for `request`.
    ///
    /// Every failure short of a redirect loop is turned into a response.
    pub async fn render(&self, request: ServerRequest) -> Result<ServerResponse, RedirectLoopError> {
        let navigation = NavigationId::new(self.next_navigation.fetch_add(1, Ordering::Relaxed) + 1);
        let (path, _) = split_url(&request.url);
        let logger = self.logger(navigation, path);
        let mut metrics = MetricsCollector::new(navigation);
        metrics.set_route(path);

        let (page, outcome) = match self.routes.resolve(&request.host, &request.url) {
            Ok(Some((entry, route))) => {
                let outcome = match LoadContext::build(&route, &request.session, navigation) {
                    Ok(ctx) => {
                        let ctx = match &self.api {
                            Some(api) => ctx.with_api(api.clone()),
                            None => ctx,
                        };
                        pipeline::load(&self.invoker, &entry.page, &ctx, &logger, &mut metrics).await
                    }
                    Err(e) => self.context_failure(e, &logger),
                };
                (Some(&entry.page), outcome)
            }
            Ok(None) => {
                logger.info("no route matches");
                (None, LoadOutcome::error(404, "Not found"))
            }
            Err(e) => (None, self.context_failure(e.into(), &logger)),
        };
        metrics.record_outcome(outcome.kind(), outcome.status());

        let targets = pipeline::targets(&self.routes, page, path, self.renderer.as_ref());
        let mut guard = RedirectGuard::new(&request.url, self.config.max_redirects);
        let dispatched = pipeline::settle(
            Dispatcher::new(request.url.as_str()).dispatch(outcome, targets, &mut guard),
            &logger,
        );

        let response = match dispatched {
            Ok(dispatched) => self.respond(dispatched, &logger, &mut metrics),
            Err(loop_error) => {
                self.finish(metrics);
                return Err(loop_error);
            }
        };
        self.finish(metrics);
        Ok(response)
    }

    fn respond(
        &self,
        dispatched: Dispatched,
        logger: &StructuredLogger,
        metrics: &mut MetricsCollector,
    ) -> ServerResponse {
        match dispatched {
            Dispatched::Rendered { html, props } => {
                let payload = if self.config.embed_payload {
                    match self.bridge.embed(&props) {
                        Ok(payload) => Some(payload),
                        Err(e) => {
                            logger
                                .warn_builder("props not embeddable, client will load")
                                .field("error", e.to_string())
                                .emit();
                            None
                        }
                    }
                } else {
                    None
                };
                if let Some(payload) = &payload {
                    metrics.record_payload(payload.len());
                }

                let document = self.document(&html, payload.as_ref().map(|p| p.html.as_str()));
                ServerResponse::Page {
                    status: 200,
                    html: document,
                    client_load: payload.is_none(),
                    payload,
                }
            }
            Dispatched::ErrorRendered { status, html, .. } => ServerResponse::Page {
                status,
                html: self.document(&html, None),
                payload: None,
                client_load: false,
            },
            Dispatched::Redirect { status, to } => {
                metrics.record_redirect();
                logger.info_builder("redirect").field("location", to.clone()).emit();
                ServerResponse::Redirect { status, location: to }
            }
        }
    }

    fn document(&self, body: &str, data_script: Option<&str>) -> String {
        generate_shell_html(
            &self.config.default_title,
            self.config.css_path.as_deref(),
            body,
            data_script,
        )
    }

    fn context_failure(&self, err: ContextError, logger: &StructuredLogger) -> LoadOutcome {
        logger
            .error_builder("cannot build load context")
            .field("error", err.to_string())
            .emit();
        LoadOutcome::error(500, err.to_string())
    }

    fn logger(&self, navigation: NavigationId, path: &str) -> StructuredLogger {
        let logger = StructuredLogger::new(navigation)
            .with_runtime("server")
            .with_route(path)
            .with_format(self.log_format);
        match &self.log_capture {
            Some(capture) => logger.with_capture(capture.clone()),
            None => logger,
        }
    }

    fn finish(&self, metrics: MetricsCollector) {
        if let Some(hook) = &self.metrics_hook {
            hook(&metrics.finalize());
        }
    }
}
