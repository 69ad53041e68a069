//! In-memory transport for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{FetchError, Request, Response, Transport};

/// A transport that records requests and replies with canned responses.
///
/// Requests for URLs with no canned response get an empty `200 OK`.
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<String, Result<Response, FetchError>>>,
    requests: Mutex<Vec<Request>>,
}

impl StubTransport {
    /// Create an empty stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `url` with `response`.
    pub fn respond(&self, url: impl Into<String>, response: Response) {
        self.responses.lock().insert(url.into(), Ok(response));
    }

    /// Fail requests to `url` with `error`.
    pub fn fail(&self, url: impl Into<String>, error: FetchError) {
        self.responses.lock().insert(url.into(), Err(error));
    }

    /// Requests sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: Request) -> Result<Response, FetchError> {
        let reply = self
            .responses
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Ok(Response::new(200, HashMap::new(), Vec::new())));
        self.requests.lock().push(request);
        reply
    }
}
