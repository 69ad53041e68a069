//! Error types for TurboCore.

use std::time::Duration;

use thiserror::Error;
use turbo_data::FetchError;
use turbo_payload::SerializationError;
use turbo_router::RouteError;

use crate::DispatchState;

/// The route match handed to the context builder is malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    /// A required field is missing or invalid.
    #[error("malformed route match: {0}")]
    MalformedRoute(#[from] RouteError),
}

/// Failure of a load routine.
///
/// Load routines return these; the invoker also synthesizes
/// [`LoadError::Panicked`] and [`LoadError::TimedOut`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// A routine-defined failure.
    #[error("{0}")]
    Message(String),

    /// A request made through the request facade failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The routine panicked.
    #[error("load routine panicked: {0}")]
    Panicked(String),

    /// The routine did not settle in time.
    #[error("load routine timed out after {0:?}")]
    TimedOut(Duration),
}

impl LoadError {
    /// Create a routine-defined failure.
    pub fn msg(message: impl Into<String>) -> Self {
        LoadError::Message(message.into())
    }

    /// Status of the error page this failure renders as.
    pub fn status(&self) -> u16 {
        match self {
            LoadError::TimedOut(_) => 504,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Message(e.to_string())
    }
}

/// A redirect chain that would never terminate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedirectLoopError {
    /// A page redirected to the path that triggered it.
    #[error("redirect loop: {path} redirects to itself")]
    SelfRedirect { path: String },

    /// The chain exceeded the configured number of redirects.
    #[error("too many redirects (limit {limit}): {}", chain.join(" -> "))]
    TooManyRedirects { limit: u32, chain: Vec<String> },
}

/// Errors from the outcome dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The navigation already left the pending state.
    #[error("navigation already dispatched (state: {state:?})")]
    AlreadyDispatched { state: DispatchState },

    /// A redirect would loop.
    #[error(transparent)]
    RedirectLoop(#[from] RedirectLoopError),
}

/// Invalid configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors that can occur in TurboCore.
#[derive(Error, Debug)]
pub enum TurboError {
    /// Route registration or resolution failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Context construction failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A load routine failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A redirect chain looped.
    #[error(transparent)]
    RedirectLoop(#[from] RedirectLoopError),

    /// Props could not be serialized.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// A request through the facade failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
