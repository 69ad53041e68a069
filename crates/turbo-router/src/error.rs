//! Routing error types.

use thiserror::Error;

/// Errors raised while assembling or resolving a route match.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The host component is missing.
    #[error("Route match is missing a host")]
    MissingHost,

    /// The path does not start with `/`.
    #[error("Route path must start with '/': {0:?}")]
    InvalidPath(String),

    /// A named parameter has an empty name.
    #[error("Route parameter with empty name for path {0}")]
    EmptyParamName(String),

    /// A pattern declares the same parameter twice.
    #[error("Duplicate parameter '{param}' in pattern {pattern}")]
    DuplicateParam { pattern: String, param: String },

    /// A rest-of-path parameter is followed by more segments.
    #[error("Wildcard '*{param}' must be the last segment of pattern {pattern}")]
    MisplacedWildcard { pattern: String, param: String },
}
