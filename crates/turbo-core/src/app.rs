//! TurboApp configuration and setup.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use turbo_payload::{GraphCodec, JsonCodec, PayloadCodec};
use turbo_router::{RouteError, RouteRegistry};

use crate::bridge::DEFAULT_DATA_SCRIPT_ID;
use crate::dispatch::DEFAULT_MAX_REDIRECTS;
use crate::{ConfigError, LoadRoutine, TurboError};

/// Default lifetime of prefetched props.
pub const DEFAULT_PREFETCH_TTL: Duration = Duration::from_secs(30);

/// Default number of prefetched pages kept.
pub const DEFAULT_PREFETCH_CAPACITY: usize = 16;

/// Codec used to embed props in server-rendered pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Indexed graph format with maps, sets, dates and cycles.
    #[default]
    Graph,
    /// Plain JSON.
    Json,
}

impl PayloadFormat {
    /// Instantiate the codec.
    pub fn codec(self) -> Arc<dyn PayloadCodec> {
        match self {
            PayloadFormat::Graph => Arc::new(GraphCodec::new()),
            PayloadFormat::Json => Arc::new(JsonCodec::new()),
        }
    }
}

/// Configuration for a TurboCommerce application.
///
/// Loadable from TOML:
///
/// ```toml
/// name = "my-store"
/// default_title = "My Store"
/// load_timeout_ms = 5000
/// max_redirects = 5
/// prefetch_ttl_ms = 10000
/// api_origin = "https://api.my-store.com"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboConfig {
    /// Application name.
    pub name: String,
    /// Default page title.
    pub default_title: String,
    /// CSS file path.
    pub css_path: Option<String>,
    /// Give up on load routines after this long and render a 504.
    #[serde(rename = "load_timeout_ms", with = "opt_millis")]
    pub load_timeout: Option<Duration>,
    /// Longest redirect chain followed before declaring a loop.
    pub max_redirects: u32,
    /// Whether server-rendered pages embed their props.
    pub embed_payload: bool,
    /// Codec for embedded props.
    pub payload_format: PayloadFormat,
    /// `id` of the embedded data script.
    pub data_script_id: String,
    /// Origin that relative request paths resolve against on the server.
    pub api_origin: Option<String>,
    /// How long prefetched props stay usable on the client.
    #[serde(rename = "prefetch_ttl_ms", with = "millis")]
    pub prefetch_ttl: Duration,
    /// Most prefetched pages held at once. The oldest is dropped first.
    pub prefetch_capacity: usize,
}

impl Default for TurboConfig {
    fn default() -> Self {
        Self {
            name: "TurboApp".to_string(),
            default_title: "TurboCommerce".to_string(),
            css_path: None,
            load_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            embed_payload: true,
            payload_format: PayloadFormat::default(),
            data_script_id: DEFAULT_DATA_SCRIPT_ID.to_string(),
            api_origin: None,
            prefetch_ttl: DEFAULT_PREFETCH_TTL,
            prefetch_capacity: DEFAULT_PREFETCH_CAPACITY,
        }
    }
}

impl TurboConfig {
    /// Create a new configuration with the given app name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load TOML config: {}", path.display()))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid {
                field: "load_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.prefetch_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                field: "prefetch_ttl_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.prefetch_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "prefetch_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.data_script_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "data_script_id",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(origin) = &self.api_origin {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field: "api_origin",
                    reason: format!("{:?} is not an http(s) origin", origin),
                });
            }
        }
        Ok(())
    }

    /// Set the default page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    /// Set the CSS file path.
    pub fn with_css(mut self, path: impl Into<String>) -> Self {
        self.css_path = Some(path.into());
        self
    }

    /// Set the load routine timeout.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Set the redirect chain limit.
    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set how long prefetched props stay usable.
    pub fn with_prefetch_ttl(mut self, ttl: Duration) -> Self {
        self.prefetch_ttl = ttl;
        self
    }

    /// Set how many prefetched pages are kept.
    pub fn with_prefetch_capacity(mut self, capacity: usize) -> Self {
        self.prefetch_capacity = capacity;
        self
    }

    /// Enable or disable payload embedding.
    pub fn with_embed_payload(mut self, enabled: bool) -> Self {
        self.embed_payload = enabled;
        self
    }

    /// Set the payload codec.
    pub fn with_payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = format;
        self
    }

    /// Set the server-side API origin.
    pub fn with_api_origin(mut self, origin: impl Into<String>) -> Self {
        self.api_origin = Some(origin.into());
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_u64(d.as_millis() as u64),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// A page: the component that renders it and its optional load routine.
#[derive(Clone)]
pub struct Page {
    component: String,
    load: Option<Arc<dyn LoadRoutine>>,
}

impl Page {
    /// A page without a load routine.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            load: None,
        }
    }

    /// Attach a load routine.
    pub fn with_load(mut self, routine: impl LoadRoutine + 'static) -> Self {
        self.load = Some(Arc::new(routine));
        self
    }

    /// Component name handed to the renderer.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The load routine, if any.
    pub fn load_routine(&self) -> Option<&dyn LoadRoutine> {
        self.load.as_deref()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("component", &self.component)
            .field("has_load", &self.load.is_some())
            .finish()
    }
}

/// TurboCommerce application builder.
///
/// # Example
///
/// ```rust,ignore
/// let (config, routes) = TurboApp::new("my-store")
///     .with_title("My Store")
///     .page("/product/:id", Page::new("ProductPage").with_load(load_product))
///     .error_boundary("/", "ErrorPage")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct TurboApp {
    config: TurboConfig,
    routes: RouteRegistry<Page>,
    error: Option<RouteError>,
}

impl TurboApp {
    /// Create a new TurboApp with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(TurboConfig::new(name))
    }

    /// Create an app from a full configuration.
    pub fn with_config(config: TurboConfig) -> Self {
        Self {
            config,
            routes: RouteRegistry::new(),
            error: None,
        }
    }

    /// Set the default page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config = self.config.with_title(title);
        self
    }

    /// Set the CSS file path.
    pub fn with_css(mut self, path: impl Into<String>) -> Self {
        self.config = self.config.with_css(path);
        self
    }

    /// Set the load routine timeout.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_load_timeout(timeout);
        self
    }

    /// Set the redirect chain limit.
    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.config = self.config.with_max_redirects(max);
        self
    }

    /// Register a page under a route pattern.
    ///
    /// Invalid patterns are reported by [`TurboApp::build`].
    pub fn page(mut self, pattern: impl Into<String>, page: Page) -> Self {
        if let Err(e) = self.routes.register(pattern, page) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Register a page without a load routine.
    pub fn route(self, pattern: impl Into<String>, component: impl Into<String>) -> Self {
        self.page(pattern, Page::new(component))
    }

    /// Register an error boundary component for paths under `prefix`.
    pub fn error_boundary(mut self, prefix: impl Into<String>, component: impl Into<String>) -> Self {
        self.routes.error_boundary(prefix, Page::new(component));
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &TurboConfig {
        &self.config
    }

    /// Get the route registry.
    pub fn routes(&self) -> &RouteRegistry<Page> {
        &self.routes
    }

    /// Validate and return the configuration and routes.
    pub fn build(self) -> Result<(TurboConfig, RouteRegistry<Page>), TurboError> {
        if let Some(e) = self.error {
            return Err(e.into());
        }
        self.config.validate()?;
        Ok((self.config, self.routes))
    }
}
