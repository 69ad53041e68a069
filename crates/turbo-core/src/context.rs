//! Invocation context handed to load routines.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use turbo_data::Api;
use turbo_router::{RouteError, RouteMatch};

use crate::ContextError;

/// Identifies one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationId(u64);

impl NavigationId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request data supplied by the hosting layer, such as the signed-in user.
///
/// Read-only. Clones share the same data, so a server can hand one session
/// to many concurrent navigations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session(Arc<JsonValue>);

impl Session {
    /// Wrap session data.
    pub fn new(data: JsonValue) -> Self {
        Self(Arc::new(data))
    }

    /// A session with no data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The whole session payload.
    pub fn data(&self) -> &JsonValue {
        &self.0
    }

    /// A top-level session field.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Whether the session carries no data.
    pub fn is_empty(&self) -> bool {
        match &*self.0 {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Whether two sessions share the same data.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The argument passed to a load routine.
///
/// Built fresh for every navigation and never reused.
#[derive(Debug, Clone)]
pub struct LoadContext {
    page: RouteMatch,
    session: Session,
    navigation: NavigationId,
    api: Option<Api>,
}

impl LoadContext {
    /// Assemble a context from a resolved route and the current session.
    ///
    /// Performs no I/O. Fails only if the route match is malformed.
    pub fn build(
        route: &RouteMatch,
        session: &Session,
        navigation: NavigationId,
    ) -> Result<Self, ContextError> {
        validate(route)?;
        Ok(Self {
            page: route.clone(),
            session: session.clone(),
            navigation,
            api: None,
        })
    }

    /// Attach the request facade for the current runtime.
    pub fn with_api(mut self, api: Api) -> Self {
        self.api = Some(api);
        self
    }

    /// The resolved route.
    pub fn page(&self) -> &RouteMatch {
        &self.page
    }

    /// The session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The navigation this context belongs to.
    pub fn navigation(&self) -> NavigationId {
        self.navigation
    }

    /// The request facade, if the runtime has a transport.
    pub fn api(&self) -> Option<&Api> {
        self.api.as_ref()
    }
}

fn validate(route: &RouteMatch) -> Result<(), RouteError> {
    if route.host().trim().is_empty() {
        return Err(RouteError::MissingHost);
    }
    if !route.path().starts_with('/') {
        return Err(RouteError::InvalidPath(route.path().to_string()));
    }
    if route.params().keys().any(|k| k.is_empty()) {
        return Err(RouteError::EmptyParamName(route.path().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turbo_router::QueryValue;

    fn route() -> RouteMatch {
        RouteMatch::builder("shop.test", "/blog/some-post")
            .param("slug", "some-post")
            .query_string("foo=bar&baz")
            .build()
            .unwrap()
    }

    // === Session Tests ===

    #[test]
    fn test_session_default_is_empty() {
        let session = Session::empty();
        assert!(session.is_empty());
        assert_eq!(session.get("user"), None);
    }

    #[test]
    fn test_session_clone_shares_data() {
        let session = Session::new(json!({"user": {"id": 1}}));
        let clone = session.clone();

        assert!(session.ptr_eq(&clone));
        assert_eq!(clone.get("user"), Some(&json!({"id": 1})));
    }

    // === Context Builder Tests ===

    #[test]
    fn test_build_context() {
        let session = Session::new(json!({"user": "ada"}));
        let ctx = LoadContext::build(&route(), &session, NavigationId::new(4)).unwrap();

        assert_eq!(ctx.page().param("slug"), Some("some-post"));
        assert_eq!(ctx.page().query_value("foo"), Some(&QueryValue::Text("bar".into())));
        assert_eq!(ctx.page().query_value("baz"), Some(&QueryValue::Flag));
        assert!(ctx.session().ptr_eq(&session));
        assert_eq!(ctx.navigation(), NavigationId::new(4));
        assert!(ctx.api().is_none());
    }

    #[test]
    fn test_contexts_are_independent_per_navigation() {
        let session = Session::empty();
        let first = LoadContext::build(&route(), &session, NavigationId::new(1)).unwrap();
        let second = LoadContext::build(&route(), &session, NavigationId::new(2)).unwrap();

        assert_ne!(first.navigation(), second.navigation());
        assert_eq!(first.page(), second.page());
    }

    #[test]
    fn test_navigation_id_display() {
        assert_eq!(NavigationId::new(12).to_string(), "12");
    }
}
