//! Resolved route matches.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;

use crate::RouteError;

/// Extracted route parameters (e.g., `:id` from `/products/:id`).
pub type RouteParams = HashMap<String, String>;

/// Parsed query string parameters.
pub type QueryParams = HashMap<String, QueryValue>;

/// A single query string value.
///
/// Keys written without `=value` (`?preview`) surface as [`QueryValue::Flag`],
/// the boolean `true` of the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// `key=value`.
    Text(String),
    /// Bare `key`.
    Flag,
}

impl Serialize for QueryValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Flag => serializer.serialize_bool(true),
        }
    }
}

impl QueryValue {
    /// Get the text value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Flag => None,
        }
    }

    /// Check if this is a bare flag.
    pub fn is_flag(&self) -> bool {
        matches!(self, Self::Flag)
    }
}

/// A route match resolved by the router.
///
/// Immutable once built: `params` holds exactly the named segments of the
/// matched pattern and `query` is derived from the URL's query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMatch {
    host: String,
    path: String,
    params: RouteParams,
    query: QueryParams,
}

impl RouteMatch {
    /// Start building a route match for `host` and `path`.
    pub fn builder(host: impl Into<String>, path: impl Into<String>) -> RouteMatchBuilder {
        RouteMatchBuilder::new(host, path)
    }

    /// Build a route match from a request target such as `/blog/post?draft#top`.
    pub fn from_url(
        host: impl Into<String>,
        url: &str,
        params: RouteParams,
    ) -> Result<Self, RouteError> {
        let (path, query) = split_url(url);
        let mut builder = RouteMatchBuilder::new(host, path).params(params);
        if let Some(qs) = query {
            builder = builder.query_string(qs);
        }
        builder.build()
    }

    /// Parse a raw query string (without the leading `?`).
    ///
    /// Repeated keys keep the last occurrence. Keys and values are
    /// percent-decoded and `+` decodes to a space.
    pub fn parse_query(qs: &str) -> QueryParams {
        qs.split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = match pair.split_once('=') {
                    Some((k, v)) => (k, Some(v)),
                    None => (pair, None),
                };
                let key = decode_component(key);
                if key.is_empty() {
                    return None;
                }
                let value = match value {
                    Some(v) => QueryValue::Text(decode_component(v)),
                    None => QueryValue::Flag,
                };
                Some((key, value))
            })
            .collect()
    }

    /// Request host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Request path, without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All route parameters.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// All query parameters.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Get a route parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    /// Get a raw query value by name.
    pub fn query_value(&self, name: &str) -> Option<&QueryValue> {
        self.query.get(name)
    }

    /// Get a `key=value` query parameter as text.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(QueryValue::as_str)
    }

    /// Check whether a bare `key` flag is present.
    pub fn query_flag(&self, name: &str) -> bool {
        self.query.get(name).is_some_and(QueryValue::is_flag)
    }
}

/// Builder that validates the fields of a [`RouteMatch`].
#[derive(Debug, Clone)]
pub struct RouteMatchBuilder {
    host: String,
    path: String,
    params: RouteParams,
    query: QueryParams,
}

impl RouteMatchBuilder {
    /// Create a new builder.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            params: HashMap::new(),
            query: HashMap::new(),
        }
    }

    /// Add a route parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add multiple route parameters.
    pub fn params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    /// Parse and merge a raw query string.
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query.extend(RouteMatch::parse_query(qs));
        self
    }

    /// Add a single query value.
    pub fn query(mut self, name: impl Into<String>, value: QueryValue) -> Self {
        self.query.insert(name.into(), value);
        self
    }

    /// Validate and build the route match.
    pub fn build(self) -> Result<RouteMatch, RouteError> {
        if self.host.trim().is_empty() {
            return Err(RouteError::MissingHost);
        }
        if !self.path.starts_with('/') {
            return Err(RouteError::InvalidPath(self.path));
        }
        if self.params.keys().any(|k| k.is_empty()) {
            return Err(RouteError::EmptyParamName(self.path));
        }

        Ok(RouteMatch {
            host: self.host,
            path: self.path,
            params: self.params,
            query: self.query,
        })
    }
}

/// Split a request target into path and optional query, dropping any fragment.
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Query Parsing Tests ===

    #[test]
    fn test_parse_query_text_and_flag() {
        let query = RouteMatch::parse_query("foo=bar&baz");

        assert_eq!(query.get("foo"), Some(&QueryValue::Text("bar".to_string())));
        assert_eq!(query.get("baz"), Some(&QueryValue::Flag));
    }

    #[test]
    fn test_parse_query_empty_value_is_text() {
        let query = RouteMatch::parse_query("q=");

        assert_eq!(query.get("q"), Some(&QueryValue::Text(String::new())));
    }

    #[test]
    fn test_parse_query_decodes() {
        let query = RouteMatch::parse_query("q=red+shoes&name=caf%C3%A9&a%20b=1");

        assert_eq!(query.get("q").and_then(QueryValue::as_str), Some("red shoes"));
        assert_eq!(query.get("name").and_then(QueryValue::as_str), Some("café"));
        assert!(query.contains_key("a b"));
    }

    #[test]
    fn test_parse_query_last_wins_and_skips_empty() {
        let query = RouteMatch::parse_query("&a=1&&a=2&=x");

        assert_eq!(query.len(), 1);
        assert_eq!(query.get("a").and_then(QueryValue::as_str), Some("2"));
    }

    // === RouteMatch Tests ===

    #[test]
    fn test_from_url_blog_post() {
        let params = HashMap::from([("slug".to_string(), "some-post".to_string())]);
        let route = RouteMatch::from_url("localhost", "/blog/some-post?foo=bar&baz", params).unwrap();

        assert_eq!(route.path(), "/blog/some-post");
        assert_eq!(route.param("slug"), Some("some-post"));
        assert_eq!(route.query_param("foo"), Some("bar"));
        assert!(route.query_flag("baz"));
        assert!(!route.query_flag("foo"));
    }

    #[test]
    fn test_from_url_drops_fragment() {
        let route = RouteMatch::from_url("localhost", "/about#team", HashMap::new()).unwrap();

        assert_eq!(route.path(), "/about");
        assert!(route.query().is_empty());
    }

    #[test]
    fn test_builder_rejects_missing_host() {
        let err = RouteMatch::builder("  ", "/").build().unwrap_err();
        assert_eq!(err, RouteError::MissingHost);
    }

    #[test]
    fn test_builder_rejects_relative_path() {
        let err = RouteMatch::builder("localhost", "blog").build().unwrap_err();
        assert_eq!(err, RouteError::InvalidPath("blog".to_string()));
    }

    #[test]
    fn test_builder_rejects_empty_param_name() {
        let err = RouteMatch::builder("localhost", "/x")
            .param("", "value")
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::EmptyParamName(_)));
    }

    #[test]
    fn test_flag_serializes_as_true() {
        let route = RouteMatch::builder("localhost", "/")
            .query_string("preview&page=2")
            .build()
            .unwrap();

        let json = serde_json::to_value(route.query()).unwrap();
        assert_eq!(json["preview"], serde_json::json!(true));
        assert_eq!(json["page"], serde_json::json!("2"));
    }

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("/a?b=1#c"), ("/a", Some("b=1")));
        assert_eq!(split_url("/a"), ("/a", None));
    }
}
