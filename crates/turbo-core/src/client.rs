//! Client-side navigation.
//!
//! [`ClientRuntime`] owns the navigations of one browser tab. The first page
//! hydrates from the props the server embedded; later navigations run the
//! load routine on the client, follow redirects, and drop results that
//! arrive after a newer navigation started.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use turbo_data::{Api, Transport};
use turbo_observability::{
    LoadSource, LogCapture, LogFormat, MetricsCollector, NavigationMetrics, StructuredLogger,
};
use turbo_router::{split_url, RouteRegistry};

use crate::dispatch::RedirectGuard;
use crate::pipeline;
use crate::{
    ContextError, Dispatched, Dispatcher, LoadContext, LoadInvoker, LoadOutcome, NavigationId,
    NavigationTracker, Page, Props, RedirectLoopError, Renderer, SerializationBridge, Session,
    TurboApp, TurboConfig, TurboError,
};

type MetricsHook = Arc<dyn Fn(&NavigationMetrics) + Send + Sync>;

/// Props loaded ahead of a navigation.
struct Prefetched {
    outcome: LoadOutcome,
    stored_at: Instant,
}

impl Prefetched {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// How a client navigation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationResult {
    /// The page rendered. `url` is the final URL after any redirects.
    Rendered { url: String, html: String, props: Props },
    /// An error boundary (or the default error page) rendered.
    ErrorRendered {
        url: String,
        status: u16,
        message: String,
        html: String,
    },
    /// A redirect left the application; the browser must load `location`.
    External { status: u16, location: String },
    /// A newer navigation started before this one settled. Nothing rendered.
    Superseded { navigation: NavigationId },
}

impl NavigationResult {
    /// The rendered markup, if anything rendered.
    pub fn html(&self) -> Option<&str> {
        match self {
            NavigationResult::Rendered { html, .. } | NavigationResult::ErrorRendered { html, .. } => {
                Some(html)
            }
            _ => None,
        }
    }

    /// The URL that ended up rendered.
    pub fn url(&self) -> Option<&str> {
        match self {
            NavigationResult::Rendered { url, .. } | NavigationResult::ErrorRendered { url, .. } => {
                Some(url)
            }
            _ => None,
        }
    }
}

/// Drives navigations in the browser.
pub struct ClientRuntime {
    config: TurboConfig,
    routes: RouteRegistry<Page>,
    renderer: Arc<dyn Renderer>,
    bridge: SerializationBridge,
    invoker: LoadInvoker,
    tracker: NavigationTracker,
    host: String,
    session: Session,
    api: Option<Api>,
    prefetched: Mutex<HashMap<String, Prefetched>>,
    log_format: LogFormat,
    log_capture: Option<LogCapture>,
    metrics_hook: Option<MetricsHook>,
}

impl std::fmt::Debug for ClientRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRuntime")
            .field("host", &self.host)
            .field("current", &self.tracker.current())
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl ClientRuntime {
    /// Create a runtime for the application served from `host`.
    pub fn new(
        config: TurboConfig,
        routes: RouteRegistry<Page>,
        renderer: Arc<dyn Renderer>,
        host: impl Into<String>,
    ) -> Self {
        let bridge = SerializationBridge::new(config.payload_format.codec())
            .with_script_id(config.data_script_id.clone());
        let invoker = LoadInvoker::new().with_timeout(config.load_timeout);
        Self {
            config,
            routes,
            renderer,
            bridge,
            invoker,
            tracker: NavigationTracker::new(),
            host: host.into(),
            session: Session::empty(),
            api: None,
            prefetched: Mutex::new(HashMap::new()),
            log_format: LogFormat::default(),
            log_capture: None,
            metrics_hook: None,
        }
    }

    /// Build a runtime from an app builder.
    pub fn from_app(app: TurboApp, renderer: Arc<dyn Renderer>, host: impl Into<String>) -> Result<Self, TurboError> {
        let (config, routes) = app.build()?;
        Ok(Self::new(config, routes, renderer, host))
    }

    /// Set the session handed to load routines.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Give load routines a request facade backed by `transport`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.api = Some(Api::client(transport));
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

    /// The current navigation, if one is in flight.
    pub fn current_navigation(&self) -> Option<NavigationId> {
        self.tracker.current()
    }

    /// Render the server-rendered page at `url` from its embedded props.
    ///
    /// `payload` is the encoded props. When it is missing or cannot be
    /// decoded the load routine runs on the client instead.
    pub async fn hydrate(&self, url: &str, payload: Option<&str>) -> Result<NavigationResult, RedirectLoopError> {
        let started = Instant::now();
        let decoded = payload.map(|data| self.bridge.extract(data));
        let props = match decoded {
            Some(Ok(props)) => props,
            Some(Err(e)) => return self.navigate_with(url, Some(e.to_string())).await,
            None => return self.navigate(url).await,
        };

        let ticket = self.tracker.begin();
        let navigation = ticket.id();
        let (path, _) = split_url(url);
        let logger = self.logger(navigation, path);
        let mut metrics = MetricsCollector::new(navigation);
        metrics.set_route(path);
        metrics.record_load(LoadSource::Hydrated, started.elapsed());
        logger.debug("hydrating from embedded props");

        let outcome = LoadOutcome::Props(props);
        metrics.record_outcome(outcome.kind(), outcome.status());
        let mut guard = RedirectGuard::new(url, self.config.max_redirects);
        let dispatched = pipeline::settle(
            Dispatcher::new(url).dispatch(outcome, self.targets(path), &mut guard),
            &logger,
        );
        self.tracker.finish(navigation);
        self.finish(metrics);

        Ok(match dispatched? {
            Dispatched::Rendered { html, props } => NavigationResult::Rendered {
                url: url.to_string(),
                html,
                props,
            },
            Dispatched::ErrorRendered { status, message, html } => NavigationResult::ErrorRendered {
                url: url.to_string(),
                status,
                message,
                html,
            },
            Dispatched::Redirect { status, to } => NavigationResult::External { status, location: to },
        })
    }

    /// Hydrate from a whole server-rendered document.
    pub async fn hydrate_document(&self, url: &str, document: &str) -> Result<NavigationResult, RedirectLoopError> {
        let payload = self.bridge.locate(document);
        self.hydrate(url, payload).await
    }

    /// Navigate to `url`.
    ///
    /// Runs the page's load routine (or uses a prefetched result) and
    /// dispatches the outcome. Redirects inside the application start a new
    /// navigation, up to `max_redirects` hops.
    pub async fn navigate(&self, url: &str) -> Result<NavigationResult, RedirectLoopError> {
        self.navigate_with(url, None).await
    }

    /// Navigate to `url`, reporting `unreadable` as the reason hydration
    /// fell back to loading.
    async fn navigate_with(
        &self,
        url: &str,
        mut unreadable: Option<String>,
    ) -> Result<NavigationResult, RedirectLoopError> {
        let mut target = url.to_string();
        let mut guard = RedirectGuard::new(url, self.config.max_redirects);

        loop {
            let ticket = self.tracker.begin();
            let navigation = ticket.id();
            let path = split_url(&target).0.to_string();
            let logger = self.logger(navigation, &path);
            let mut metrics = MetricsCollector::new(navigation);
            metrics.set_route(path.as_str());
            if let Some(error) = unreadable.take() {
                logger
                    .warn_builder("embedded props unreadable, loading on client")
                    .field("error", error)
                    .emit();
            }

            let settled = self
                .tracker
                .run(ticket, self.outcome_for(&target, navigation, &logger, &mut metrics))
                .await;
            let outcome = match settled {
                Ok(outcome) => outcome,
                Err(superseded) => {
                    logger.debug("navigation superseded, result discarded");
                    metrics.record_superseded();
                    self.finish(metrics);
                    return Ok(NavigationResult::Superseded {
                        navigation: superseded.navigation,
                    });
                }
            };
            metrics.record_outcome(outcome.kind(), outcome.status());

            let dispatched = pipeline::settle(
                Dispatcher::new(target.as_str()).dispatch(outcome, self.targets(&path), &mut guard),
                &logger,
            );
            self.tracker.finish(navigation);

            let dispatched = match dispatched {
                Ok(dispatched) => dispatched,
                Err(loop_error) => {
                    self.finish(metrics);
                    return Err(loop_error);
                }
            };

            match dispatched {
                Dispatched::Rendered { html, props } => {
                    self.finish(metrics);
                    return Ok(NavigationResult::Rendered { url: target, html, props });
                }
                Dispatched::ErrorRendered { status, message, html } => {
                    self.finish(metrics);
                    return Ok(NavigationResult::ErrorRendered {
                        url: target,
                        status,
                        message,
                        html,
                    });
                }
                Dispatched::Redirect { status, to } => {
                    metrics.record_redirect();
                    logger.info_builder("redirect").field("location", to.clone()).emit();
                    self.finish(metrics);
                    match self.internal_target(&to) {
                        Some(next) => target = next,
                        None => return Ok(NavigationResult::External { status, location: to }),
                    }
                }
            }
        }
    }

    /// Run the load routine for `url` ahead of a navigation.
    ///
    /// Props are kept for the next navigation to exactly `url`, for at most
    /// `prefetch_ttl`. Once `prefetch_capacity` pages are held the oldest is
    /// dropped. Returns whether anything was stored; error and redirect
    /// outcomes are not.
    pub async fn prefetch(&self, url: &str) -> Result<bool, ContextError> {
        let Some((entry, route)) = self.routes.resolve(&self.host, url)? else {
            return Ok(false);
        };
        let navigation = self.tracker.next_id();
        let (path, _) = split_url(url);
        let logger = self.logger(navigation, path);
        let ctx = self.context(LoadContext::build(&route, &self.session, navigation)?);

        let mut metrics = MetricsCollector::new(navigation);
        metrics.set_route(path);
        let outcome = pipeline::load(&self.invoker, &entry.page, &ctx, &logger, &mut metrics).await;
        metrics.record_outcome(outcome.kind(), outcome.status());
        self.finish(metrics);

        if matches!(outcome, LoadOutcome::Props(_)) {
            logger.debug("prefetched props");
            self.store_prefetched(url, outcome);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Whether prefetched props are waiting for `url`.
    pub fn is_prefetched(&self, url: &str) -> bool {
        self.prefetched
            .lock()
            .get(url)
            .is_some_and(|entry| !entry.is_expired(self.config.prefetch_ttl))
    }

    fn store_prefetched(&self, url: &str, outcome: LoadOutcome) {
        let ttl = self.config.prefetch_ttl;
        let mut prefetched = self.prefetched.lock();
        prefetched.retain(|_, entry| !entry.is_expired(ttl));
        prefetched.remove(url);
        while prefetched.len() >= self.config.prefetch_capacity {
            let Some(oldest) = prefetched
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            prefetched.remove(&oldest);
        }
        prefetched.insert(
            url.to_string(),
            Prefetched {
                outcome,
                stored_at: Instant::now(),
            },
        );
    }

    async fn outcome_for(
        &self,
        url: &str,
        navigation: NavigationId,
        logger: &StructuredLogger,
        metrics: &mut MetricsCollector,
    ) -> LoadOutcome {
        let prefetched = self.prefetched.lock().remove(url);
        match prefetched {
            Some(entry) if !entry.is_expired(self.config.prefetch_ttl) => {
                metrics.record_load(LoadSource::Prefetched, Duration::ZERO);
                logger.debug("using prefetched props");
                return entry.outcome;
            }
            Some(_) => logger.debug("prefetched props expired"),
            None => {}
        }

        match self.routes.resolve(&self.host, url) {
            Ok(Some((entry, route))) => match LoadContext::build(&route, &self.session, navigation) {
                Ok(ctx) => {
                    let ctx = self.context(ctx);
                    pipeline::load(&self.invoker, &entry.page, &ctx, logger, metrics).await
                }
                Err(e) => context_failure(e, logger),
            },
            Ok(None) => {
                logger.info("no route matches");
                LoadOutcome::error(404, "Not found")
            }
            Err(e) => context_failure(e.into(), logger),
        }
    }

    fn context(&self, ctx: LoadContext) -> LoadContext {
        match &self.api {
            Some(api) => ctx.with_api(api.clone()),
            None => ctx,
        }
    }

    fn targets<'a>(&'a self, path: &str) -> crate::DispatchTargets<'a> {
        let page = self.routes.match_path(path).map(|(entry, _)| &entry.page);
        pipeline::targets(&self.routes, page, path, self.renderer.as_ref())
    }

    /// The request target to follow for a redirect, or `None` if it leaves
    /// the application.
    fn internal_target(&self, to: &str) -> Option<String> {
        let Some((_, rest)) = to.split_once("://") else {
            return Some(to.to_string());
        };
        let (authority, target) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        (authority == self.host).then(|| target.to_string())
    }

    fn logger(&self, navigation: NavigationId, path: &str) -> StructuredLogger {
        let logger = StructuredLogger::new(navigation)
            .with_runtime("client")
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

fn context_failure(err: ContextError, logger: &StructuredLogger) -> LoadOutcome {
    logger
        .error_builder("cannot build load context")
        .field("error", err.to_string())
        .emit();
    LoadOutcome::error(500, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{load_fn, sync_load_fn, LoadError, LoadReturn};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use turbo_data::testing::StubTransport;
    use turbo_data::{Credentials, Response};
    use turbo_observability::LogLevel;
    use turbo_payload::Value;

    struct HtmlRenderer;

    impl Renderer for HtmlRenderer {
        fn render(&self, component: &str, props: &Props) -> String {
            let title = props.get("title").and_then(|t| t.as_str().map(str::to_owned));
            format!("<{}>{}</{}>", component, title.unwrap_or_default(), component)
        }
    }

    fn counting_app(calls: Arc<AtomicUsize>) -> TurboApp {
        TurboApp::new("shop")
            .page(
                "/products/:id",
                Page::new("Product").with_load(sync_load_fn(move |ctx| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(LoadReturn::props(Value::object([(
                        "title",
                        Value::from(ctx.page().param("id").unwrap_or_default()),
                    )])))
                })),
            )
            .page(
                "/old",
                Page::new("Old").with_load(sync_load_fn(|_| Ok(LoadReturn::redirect(301, "/products/1?from=old")))),
            )
            .page(
                "/ping",
                Page::new("Ping").with_load(sync_load_fn(|_| Ok(LoadReturn::redirect(302, "/pong")))),
            )
            .page(
                "/pong",
                Page::new("Pong").with_load(sync_load_fn(|_| Ok(LoadReturn::redirect(302, "/ping")))),
            )
            .page(
                "/leave",
                Page::new("Leave")
                    .with_load(sync_load_fn(|_| Ok(LoadReturn::redirect(303, "https://pay.example/checkout")))),
            )
            .page(
                "/home",
                Page::new("Home").with_load(sync_load_fn(|_| Ok(LoadReturn::redirect(302, "https://shop.test/products/5")))),
            )
            .route("/about", "About")
            .error_boundary("/", "AppError")
    }

    fn runtime() -> ClientRuntime {
        ClientRuntime::from_app(counting_app(Arc::default()), Arc::new(HtmlRenderer), "shop.test").unwrap()
    }

    // === Navigate Tests ===

    #[tokio::test]
    async fn test_navigate_renders_page() {
        let result = runtime().navigate("/products/4").await.unwrap();

        match result {
            NavigationResult::Rendered { url, html, props } => {
                assert_eq!(url, "/products/4");
                assert_eq!(html, "<Product>4</Product>");
                assert_eq!(props.get("title"), Some(Value::from("4")));
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_navigate_unknown_path_renders_boundary() {
        let result = runtime().navigate("/missing").await.unwrap();
        assert!(matches!(
            result,
            NavigationResult::ErrorRendered { status: 404, ref html, .. } if html.starts_with("<AppError>")
        ));
    }

    #[tokio::test]
    async fn test_navigate_follows_redirect() {
        let runtime = runtime();
        let result = runtime.navigate("/old").await.unwrap();

        assert_eq!(result.url(), Some("/products/1?from=old"));
        assert_eq!(result.html(), Some("<Product>1</Product>"));
        assert_eq!(runtime.current_navigation(), None);
    }

    #[tokio::test]
    async fn test_same_host_absolute_redirect_stays_internal() {
        let result = runtime().navigate("/home").await.unwrap();
        assert_eq!(result.url(), Some("/products/5"));
    }

    #[tokio::test]
    async fn test_external_redirect() {
        let result = runtime().navigate("/leave").await.unwrap();
        assert_eq!(
            result,
            NavigationResult::External {
                status: 303,
                location: "https://pay.example/checkout".into()
            }
        );
    }

    #[tokio::test]
    async fn test_redirect_cycle_is_bounded() {
        let (config, routes) = counting_app(Arc::default()).build().unwrap();
        let runtime = ClientRuntime::new(config.with_max_redirects(3), routes, Arc::new(HtmlRenderer), "shop.test");

        let err = runtime.navigate("/ping").await.unwrap_err();
        match err {
            RedirectLoopError::TooManyRedirects { limit, chain } => {
                assert_eq!(limit, 3);
                assert_eq!(chain, vec!["/ping", "/pong", "/ping", "/pong", "/ping"]);
            }
            other => panic!("expected too many redirects, got {:?}", other),
        }
    }

    // === Supersede Tests ===

    #[tokio::test]
    async fn test_pending_navigation_is_superseded() {
        let app = TurboApp::new("shop")
            .page(
                "/slow",
                Page::new("Slow").with_load(load_fn(|_| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(LoadReturn::props(Value::object([("title", Value::from("stale"))])))
                })),
            )
            .route("/fast", "Fast");
        let capture = LogCapture::new();
        let runtime = ClientRuntime::from_app(app, Arc::new(HtmlRenderer), "shop.test")
            .unwrap()
            .with_log_capture(capture.clone());

        let (slow, fast) = tokio::join!(runtime.navigate("/slow"), async {
            tokio::task::yield_now().await;
            runtime.navigate("/fast").await
        });

        assert!(matches!(slow.unwrap(), NavigationResult::Superseded { .. }));
        assert_eq!(fast.unwrap().html(), Some("<Fast></Fast>"));
        assert!(capture
            .at_level(LogLevel::Debug)
            .iter()
            .any(|e| e.message.contains("superseded")));
    }

    // === Hydrate Tests ===

    #[tokio::test]
    async fn test_hydrate_does_not_invoke_routine() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = ClientRuntime::from_app(counting_app(calls.clone()), Arc::new(HtmlRenderer), "shop.test").unwrap();
        let payload = runtime
            .bridge
            .embed(&Props::new(Value::object([("title", Value::from("from server"))])))
            .unwrap();

        let result = runtime.hydrate("/products/9", Some(&payload.data)).await.unwrap();

        assert_eq!(result.html(), Some("<Product>from server</Product>"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hydrate_without_payload_loads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = ClientRuntime::from_app(counting_app(calls.clone()), Arc::new(HtmlRenderer), "shop.test").unwrap();

        let result = runtime.hydrate("/products/9", None).await.unwrap();

        assert_eq!(result.html(), Some("<Product>9</Product>"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hydrate_with_corrupt_payload_loads_and_warns() {
        let calls = Arc::new(AtomicUsize::new(0));
        let capture = LogCapture::new();
        let navigations = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorded = navigations.clone();
        let runtime = ClientRuntime::from_app(counting_app(calls.clone()), Arc::new(HtmlRenderer), "shop.test")
            .unwrap()
            .with_log_capture(capture.clone())
            .with_metrics_hook(move |m| recorded.lock().push(m.navigation_id.clone()));

        let result = runtime.hydrate("/products/2", Some("{not json")).await.unwrap();

        assert_eq!(result.html(), Some("<Product>2</Product>"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let warnings = capture.at_level(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert_eq!(*navigations.lock(), vec![warnings[0].navigation_id.clone()]);
    }

    // === Prefetch Tests ===

    #[tokio::test]
    async fn test_prefetched_props_are_used_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = ClientRuntime::from_app(counting_app(calls.clone()), Arc::new(HtmlRenderer), "shop.test").unwrap();

        assert!(runtime.prefetch("/products/3").await.unwrap());
        assert!(runtime.is_prefetched("/products/3"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        runtime.navigate("/products/3").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!runtime.is_prefetched("/products/3"));

        runtime.navigate("/products/3").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    fn prefetching_runtime(calls: Arc<AtomicUsize>, ttl: Duration, capacity: usize) -> ClientRuntime {
        let (config, routes) = counting_app(calls).build().unwrap();
        let config = config.with_prefetch_ttl(ttl).with_prefetch_capacity(capacity);
        ClientRuntime::new(config, routes, Arc::new(HtmlRenderer), "shop.test")
    }

    #[tokio::test]
    async fn test_expired_prefetch_runs_routine_again() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = prefetching_runtime(calls.clone(), Duration::from_millis(5), 4);

        assert!(runtime.prefetch("/products/3").await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!runtime.is_prefetched("/products/3"));

        let result = runtime.navigate("/products/3").await.unwrap();
        assert_eq!(result.html(), Some("<Product>3</Product>"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_prefetch_drops_oldest_past_capacity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = prefetching_runtime(calls.clone(), Duration::from_secs(60), 2);

        for id in 1..=3 {
            assert!(runtime.prefetch(&format!("/products/{}", id)).await.unwrap());
        }

        assert!(!runtime.is_prefetched("/products/1"));
        assert!(runtime.is_prefetched("/products/2"));
        assert!(runtime.is_prefetched("/products/3"));
        assert_eq!(runtime.prefetched.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_skips_redirects_and_unknown_paths() {
        let runtime = runtime();
        assert!(!runtime.prefetch("/old").await.unwrap());
        assert!(!runtime.prefetch("/missing").await.unwrap());
        assert!(!runtime.is_prefetched("/old"));
    }

    #[tokio::test]
    async fn test_prefetch_malformed_route() {
        let runtime = ClientRuntime::from_app(counting_app(Arc::default()), Arc::new(HtmlRenderer), "").unwrap();
        assert!(runtime.prefetch("/about").await.is_err());
    }

    // === Request Facade Tests ===

    #[tokio::test]
    async fn test_routine_uses_client_api() {
        let transport = Arc::new(StubTransport::new());
        transport.respond("/api/user", Response::json_body(&serde_json::json!({"title": "Ada"})));

        let app = TurboApp::new("shop").page(
            "/me",
            Page::new("Me").with_load(load_fn(|ctx: LoadContext| async move {
                let api = ctx.api().ok_or_else(|| LoadError::msg("no api"))?;
                let user: serde_json::Value = api.get("/api/user").send_json().await?;
                Ok::<_, LoadError>(LoadReturn::props(Value::from(user)))
            })),
        );
        let runtime = ClientRuntime::from_app(app, Arc::new(HtmlRenderer), "shop.test")
            .unwrap()
            .with_transport(transport.clone());

        let result = runtime.navigate("/me").await.unwrap();

        assert_eq!(result.html(), Some("<Me>Ada</Me>"));
        assert_eq!(transport.requests()[0].credentials, Credentials::Include);
    }

    // === Metrics Tests ===

    #[tokio::test]
    async fn test_metrics_per_hop() {
        let seen: Arc<parking_lot::Mutex<Vec<NavigationMetrics>>> = Arc::default();
        let sink = seen.clone();
        let runtime = runtime().with_metrics_hook(move |m| sink.lock().push(m.clone()));

        runtime.navigate("/old").await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].outcome.as_deref(), Some("redirect"));
        assert_eq!(seen[0].redirects, 1);
        assert_eq!(seen[1].outcome.as_deref(), Some("props"));
        assert_eq!(seen[1].source, Some(LoadSource::Invoked));
    }
}
