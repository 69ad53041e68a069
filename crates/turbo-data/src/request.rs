//! Requests as seen by a [`Transport`](crate::Transport).

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use crate::FetchError;

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";

/// Request methods the facade issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case method name for the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Whether ambient credentials (browser cookies) travel with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Never attach ambient credentials.
    #[default]
    Omit,
    /// Attach them for same-origin requests only.
    SameOrigin,
    /// Always attach them.
    Include,
}

/// A fully resolved request handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Absolute URL, or a relative one in the browser.
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub credentials: Credentials,
}

impl Request {
    /// Look up a header, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v.as_str()))
}

/// Assembles a [`Request`]. Obtained from [`Api`](crate::Api) in normal use.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) credentials: Credentials,
}

impl RequestBuilder {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            credentials: Credentials::default(),
        }
    }

    /// Set a header, replacing any earlier value under the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Set headers that were not set explicitly.
    pub fn default_headers<'a>(mut self, defaults: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (name, value) in defaults {
            if find_header(&self.headers, name).is_none() {
                self.headers.insert(name.clone(), value.clone());
            }
        }
        self
    }

    /// Raw body bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Text body. Defaults the content type to `text/plain`.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        if find_header(&self.headers, CONTENT_TYPE).is_none() {
            self.headers.insert(CONTENT_TYPE.to_owned(), "text/plain".to_owned());
        }
        self.body = Some(text.into().into_bytes());
        self
    }

    /// JSON body. Always sets the content type.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, FetchError> {
        let encoded = serde_json::to_vec(value)?;
        Ok(self.header(CONTENT_TYPE, "application/json").body(encoded))
    }

    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        self.header(AUTHORIZATION, format!("Bearer {}", token.as_ref()))
    }

    pub fn basic_auth(self, username: impl AsRef<str>, password: Option<&str>) -> Self {
        let pair = format!("{}:{}", username.as_ref(), password.unwrap_or_default());
        self.header(AUTHORIZATION, format!("Basic {}", STANDARD.encode(pair)))
    }

    /// Whether ambient credentials travel with the request.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            credentials: self.credentials,
        }
    }
}
