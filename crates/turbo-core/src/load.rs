//! Load routines and the invoker that runs them.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use turbo_payload::Value;

use crate::{normalize, LoadContext, LoadError, LoadOutcome, Props};

/// The raw value a load routine returns. `None` stands for "nothing".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReturn(Option<Value>);

impl LoadReturn {
    /// Return nothing. Renders the page with empty props.
    pub fn nothing() -> Self {
        Self(None)
    }

    /// Return a raw value, classified later.
    pub fn value(value: impl Into<Value>) -> Self {
        Self(Some(value.into()))
    }

    /// Return `{props}`.
    pub fn props(props: impl Into<Value>) -> Self {
        Self::value(Value::object([("props", props.into())]))
    }

    /// Return `{status, message}`.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::value(Value::object([
            ("status", Value::from(status)),
            ("message", Value::from(message.into())),
        ]))
    }

    /// Return `{redirect: {status, to}}`.
    pub fn redirect(status: u16, to: impl Into<String>) -> Self {
        Self::value(Value::object([(
            "redirect",
            Value::object([
                ("status", Value::from(status)),
                ("to", Value::from(to.into())),
            ]),
        )]))
    }

    /// The returned value.
    pub fn as_value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// Consume into the returned value.
    pub fn into_value(self) -> Option<Value> {
        self.0
    }
}

impl From<Value> for LoadReturn {
    fn from(value: Value) -> Self {
        Self::value(value)
    }
}

impl From<serde_json::Value> for LoadReturn {
    fn from(value: serde_json::Value) -> Self {
        Self::value(Value::from(value))
    }
}

/// A page's data-preparation routine.
///
/// The same routine runs on the server for the first render and in the
/// browser for later navigations, so it must only reach the network
/// through [`LoadContext::api`] and must not read anything that only
/// exists in one runtime.
#[async_trait]
pub trait LoadRoutine: Send + Sync {
    /// Produce the page's data.
    async fn load(&self, ctx: &LoadContext) -> Result<LoadReturn, LoadError>;
}

/// Routine built from an async closure. See [`load_fn`].
pub struct FnLoad<F>(F);

#[async_trait]
impl<F, Fut> LoadRoutine for FnLoad<F>
where
    F: Fn(LoadContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LoadReturn, LoadError>> + Send,
{
    async fn load(&self, ctx: &LoadContext) -> Result<LoadReturn, LoadError> {
        (self.0)(ctx.clone()).await
    }
}

/// Build a routine from an async closure taking an owned context.
pub fn load_fn<F, Fut>(f: F) -> FnLoad<F>
where
    F: Fn(LoadContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LoadReturn, LoadError>> + Send,
{
    FnLoad(f)
}

/// Routine built from a plain closure. See [`sync_load_fn`].
pub struct SyncFnLoad<F>(F);

#[async_trait]
impl<F> LoadRoutine for SyncFnLoad<F>
where
    F: Fn(&LoadContext) -> Result<LoadReturn, LoadError> + Send + Sync,
{
    async fn load(&self, ctx: &LoadContext) -> Result<LoadReturn, LoadError> {
        (self.0)(ctx)
    }
}

/// Build a routine from a synchronous closure. Ready on first poll.
pub fn sync_load_fn<F>(f: F) -> SyncFnLoad<F>
where
    F: Fn(&LoadContext) -> Result<LoadReturn, LoadError> + Send + Sync,
{
    SyncFnLoad(f)
}

/// What happened when a routine was invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// The page has no routine.
    Skipped,
    /// The routine returned a value.
    Returned(LoadReturn),
    /// The routine failed, panicked or timed out.
    Failed(LoadError),
}

impl Invocation {
    /// Normalize into the navigation's outcome.
    ///
    /// Failures become an error page carrying the failure message.
    pub fn into_outcome(self) -> LoadOutcome {
        match self {
            Invocation::Skipped => LoadOutcome::Props(Props::empty()),
            Invocation::Returned(ret) => normalize(ret),
            Invocation::Failed(err) => LoadOutcome::ErrorPage {
                status: err.status(),
                message: err.to_string(),
            },
        }
    }
}

/// Runs load routines exactly once per call.
///
/// Identical on server and client: the only suspension point is awaiting
/// the routine itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadInvoker {
    timeout: Option<Duration>,
}

impl LoadInvoker {
    /// Create an invoker with no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail routines that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Invoke `routine` with `ctx`. Never panics and never returns early
    /// without awaiting the routine.
    pub async fn invoke(&self, routine: Option<&dyn LoadRoutine>, ctx: &LoadContext) -> Invocation {
        let Some(routine) = routine else {
            return Invocation::Skipped;
        };

        let guarded = AssertUnwindSafe(routine.load(ctx)).catch_unwind();
        let settled = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(settled) => settled,
                Err(_) => return Invocation::Failed(LoadError::TimedOut(limit)),
            },
            None => guarded.await,
        };

        match settled {
            Ok(Ok(ret)) => Invocation::Returned(ret),
            Ok(Err(err)) => Invocation::Failed(err),
            Err(panic) => Invocation::Failed(LoadError::Panicked(panic_message(panic))),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(_) => "unknown panic".to_string(),
    }
}
