//! Responses returned by a transport.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::request::find_header;
use crate::FetchError;

/// What a [`Transport`](crate::Transport) got back for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// URL of the request, filled in by [`ApiRequest::send`](crate::ApiRequest::send).
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            url: String::new(),
            headers,
            body,
        }
    }

    /// `200 OK` carrying `value` as JSON.
    pub fn json_body(value: &serde_json::Value) -> Self {
        let headers = HashMap::from([("Content-Type".to_owned(), "application/json".to_owned())]);
        Self::new(200, headers, value.to_string().into_bytes())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn class(&self) -> u16 {
        self.status / 100
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        self.class() == 2
    }

    /// 4xx.
    pub fn is_client_error(&self) -> bool {
        self.class() == 4
    }

    /// 5xx.
    pub fn is_server_error(&self) -> bool {
        self.class() == 5
    }

    /// The body decoded as UTF-8.
    pub fn text(&self) -> Result<String, FetchError> {
        match std::str::from_utf8(&self.body) {
            Ok(text) => Ok(text.to_owned()),
            Err(e) => Err(FetchError::ParseError(format!("body is not UTF-8: {}", e))),
        }
    }

    /// The body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::ParseError(e.to_string()))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Look up a header, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Turn a non-2xx response into [`FetchError::HttpError`] carrying the body.
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self.text().unwrap_or_else(|_| "<binary body>".to_string());
        Err(FetchError::HttpError {
            status: self.status,
            url: self.url,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(status: u16, body: &[u8]) -> Response {
        Response::new(status, HashMap::new(), body.to_vec())
    }

    // === Status Check Tests ===

    #[test]
    fn test_response_status_classes() {
        assert!(make_response(200, b"").is_success());
        assert!(!make_response(300, b"").is_success());
        assert!(make_response(404, b"").is_client_error());
        assert!(!make_response(500, b"").is_client_error());
        assert!(make_response(503, b"").is_server_error());
        assert!(!make_response(600, b"").is_server_error());
    }

    // === Body Tests ===

    #[test]
    fn test_response_text_invalid_utf8() {
        let resp = make_response(200, &[0xff, 0xfe]);
        assert!(matches!(resp.text(), Err(FetchError::ParseError(_))));
    }

    #[test]
    fn test_response_json_body() {
        let resp = Response::json_body(&serde_json::json!({"value": 42}));
        let data: serde_json::Value = resp.json().unwrap();

        assert_eq!(data["value"], 42);
        assert_eq!(resp.content_type(), Some("application/json"));
    }

    #[test]
    fn test_response_header_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "text/html".to_string());
        let resp = Response::new(200, headers, Vec::new());

        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("X-Missing"), None);
    }

    // === error_for_status Tests ===

    #[test]
    fn test_error_for_status_carries_url() {
        let resp = make_response(404, b"Not Found").with_url("https://api.test/items/9");

        assert_eq!(
            resp.error_for_status().unwrap_err(),
            FetchError::HttpError {
                status: 404,
                url: "https://api.test/items/9".to_string(),
                message: "Not Found".to_string(),
            }
        );
    }

    #[test]
    fn test_error_for_status_success() {
        assert!(make_response(204, b"").error_for_status().is_ok());
    }
}
