//! Environment-neutral HTTP request facade for TurboCommerce.
//!
//! Load routines run on the server during the first render and in the
//! browser on later navigations. [`Api`] gives them one request surface
//! that behaves correctly in both places:
//!
//! - On the server, relative paths are resolved against the configured
//!   origin and ambient credentials are never attached.
//! - In the browser, relative paths are sent as-is and the user's
//!   cookies travel with the request.
//!
//! The actual network I/O is done by an injected [`Transport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_data::Api;
//!
//! let api = Api::server(transport).with_origin("https://shop.example.com");
//!
//! let product: Product = api
//!     .get("/api/products/123")
//!     .send_json()
//!     .await?;
//! ```

mod error;
mod request;
mod response;
pub mod testing;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use error::FetchError;
pub use request::{Credentials, Method, Request, RequestBuilder};
pub use response::Response;

/// Performs the network I/O for an [`Api`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a resolved request.
    async fn send(&self, request: Request) -> Result<Response, FetchError>;
}

/// Where requests originate from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Server-side rendering. Relative paths need an origin.
    Server { origin: Option<String> },
    /// The browser. Relative paths resolve against the current document.
    Browser,
}

/// Request facade handed to load routines.
#[derive(Clone)]
pub struct Api {
    environment: Environment,
    transport: Arc<dyn Transport>,
    default_headers: HashMap<String, String>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("environment", &self.environment)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Create a server-side facade with no origin configured.
    pub fn server(transport: Arc<dyn Transport>) -> Self {
        Self {
            environment: Environment::Server { origin: None },
            transport,
            default_headers: HashMap::new(),
        }
    }

    /// Create a browser-side facade.
    pub fn client(transport: Arc<dyn Transport>) -> Self {
        Self {
            environment: Environment::Browser,
            transport,
            default_headers: HashMap::new(),
        }
    }

    /// Set the origin relative paths resolve against on the server.
    ///
    /// Has no effect in the browser.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        if let Environment::Server { origin: slot } = &mut self.environment {
            *slot = Some(origin.into());
        }
        self
    }

    /// Add a default header that will be included in all requests.
    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// The environment this facade targets.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> ApiRequest {
        self.request(Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(&self, url: impl Into<String>) -> ApiRequest {
        self.request(Method::Post, url)
    }

    /// Create a PUT request.
    pub fn put(&self, url: impl Into<String>) -> ApiRequest {
        self.request(Method::Put, url)
    }

    /// Create a PATCH request.
    pub fn patch(&self, url: impl Into<String>) -> ApiRequest {
        self.request(Method::Patch, url)
    }

    /// Create a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> ApiRequest {
        self.request(Method::Delete, url)
    }

    /// Create a request with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> ApiRequest {
        let url = url.into();
        let resolved = self.resolve(&url);
        let credentials = match self.environment {
            Environment::Server { .. } => Credentials::Omit,
            Environment::Browser => Credentials::Include,
        };

        let builder = RequestBuilder::new(method, resolved.as_deref().unwrap_or(&url))
            .default_headers(&self.default_headers)
            .credentials(credentials);

        ApiRequest {
            builder: resolved.map(|_| builder),
            transport: Arc::clone(&self.transport),
        }
    }

    fn resolve(&self, url: &str) -> Result<String, FetchError> {
        if is_absolute(url) {
            return Ok(url.to_string());
        }
        match &self.environment {
            Environment::Browser => Ok(url.to_string()),
            Environment::Server { origin: Some(origin) } => {
                let origin = origin.trim_end_matches('/');
                if url.starts_with('/') {
                    Ok(format!("{}{}", origin, url))
                } else {
                    Ok(format!("{}/{}", origin, url))
                }
            }
            Environment::Server { origin: None } => Err(FetchError::InvalidUrl(format!(
                "relative URL {:?} cannot be resolved on the server without an origin",
                url
            ))),
        }
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// A request bound to an [`Api`] and its transport.
///
/// URL resolution errors are deferred until [`ApiRequest::send`].
pub struct ApiRequest {
    builder: Result<RequestBuilder, FetchError>,
    transport: Arc<dyn Transport>,
}

impl ApiRequest {
    fn map(mut self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
        self.builder = self.builder.map(f);
        self
    }

    /// Add a header to the request.
    pub fn header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|b| b.header(key, value))
    }

    /// Set the request body as raw bytes.
    pub fn body(self, body: impl Into<Vec<u8>>) -> Self {
        self.map(|b| b.body(body))
    }

    /// Set the request body as a string.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.map(|b| b.text(text))
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, FetchError> {
        self.builder = match self.builder {
            Ok(builder) => Ok(builder.json(value)?),
            Err(e) => Err(e),
        };
        Ok(self)
    }

    /// Add a bearer token authorization header.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        self.map(|b| b.bearer_auth(token))
    }

    /// Add a basic authorization header.
    pub fn basic_auth(self, username: impl AsRef<str>, password: Option<&str>) -> Self {
        self.map(|b| b.basic_auth(username, password))
    }

    /// Send the request and return the response.
    pub async fn send(self) -> Result<Response, FetchError> {
        let request = self.builder?.build();
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if response.url.is_empty() {
            return Ok(response.with_url(url));
        }
        Ok(response)
    }

    /// Send the request, fail on non-2xx, and parse the body as JSON.
    pub async fn send_json<T: serde::de::DeserializeOwned>(self) -> Result<T, FetchError> {
        self.send().await?.error_for_status()?.json()
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Api, ApiRequest, Credentials, FetchError, Method, Response, Transport};
}
