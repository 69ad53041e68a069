//! Page registry and error boundaries.

use std::collections::HashSet;

use crate::route::{split_url, RouteParams};
use crate::{RouteError, RouteMatch};

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text (`/about`).
    Static(String),
    /// Named parameter (`/:id`).
    Param(String),
    /// Rest-of-path parameter (`/*slug`), only valid last.
    Wildcard(String),
}

/// Parsed metadata for a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    /// Route pattern (e.g., "/products/:id").
    pub pattern: String,
    /// Parsed segments.
    pub segments: Vec<Segment>,
}

impl RouteMeta {
    /// Parse a route pattern.
    pub fn parse(pattern: impl Into<String>) -> Result<Self, RouteError> {
        let pattern = pattern.into();
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPath(pattern));
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for raw in pattern.split('/').filter(|s| !s.is_empty()) {
            if let Some(Segment::Wildcard(name)) = segments.last() {
                return Err(RouteError::MisplacedWildcard {
                    pattern: pattern.clone(),
                    param: name.clone(),
                });
            }
            let segment = if let Some(name) = raw.strip_prefix(':') {
                Segment::Param(name.to_string())
            } else if let Some(name) = raw.strip_prefix('*') {
                Segment::Wildcard(name.to_string())
            } else {
                Segment::Static(raw.to_string())
            };

            if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
                if name.is_empty() {
                    return Err(RouteError::EmptyParamName(pattern.clone()));
                }
                if !seen.insert(name.clone()) {
                    return Err(RouteError::DuplicateParam {
                        pattern: pattern.clone(),
                        param: name.clone(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self { pattern, segments })
    }

    /// Names of all parameters declared by this pattern.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// Match a path against this pattern, returning extracted parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = RouteParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(text) => {
                    if parts.get(i) != Some(&text.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), decode_segment(value));
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).unwrap_or_default();
                    if rest.is_empty() {
                        return None;
                    }
                    let value: Vec<String> = rest.iter().map(|p| decode_segment(p)).collect();
                    params.insert(name.clone(), value.join("/"));
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Specificity rank: static segments beat parameters beat wildcards.
    fn rank(&self) -> (usize, usize, bool) {
        let statics = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count();
        let wildcard = self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Wildcard(_)));
        (statics, self.segments.len(), !wildcard)
    }
}

fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// A registered route entry.
#[derive(Debug, Clone)]
pub struct RouteEntry<P> {
    /// Route metadata.
    pub meta: RouteMeta,
    /// The page registered for this route.
    pub page: P,
}

#[derive(Debug, Clone)]
struct Boundary<P> {
    prefix: String,
    page: P,
}

/// Registry of pages and error boundaries.
#[derive(Debug, Clone)]
pub struct RouteRegistry<P> {
    routes: Vec<RouteEntry<P>>,
    boundaries: Vec<Boundary<P>>,
}

impl<P> Default for RouteRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RouteRegistry<P> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            boundaries: Vec::new(),
        }
    }

    /// Register a page under a route pattern.
    pub fn register(&mut self, pattern: impl Into<String>, page: P) -> Result<(), RouteError> {
        let meta = RouteMeta::parse(pattern)?;
        self.routes.push(RouteEntry { meta, page });
        Ok(())
    }

    /// Register an error boundary for every path under `prefix`.
    pub fn error_boundary(&mut self, prefix: impl Into<String>, page: P) {
        let prefix = prefix.into();
        let prefix = match prefix.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        self.boundaries.push(Boundary { prefix, page });
    }

    /// All registered routes, in registration order.
    pub fn routes(&self) -> &[RouteEntry<P>] {
        &self.routes
    }

    /// Find the most specific route for a path.
    pub fn match_path(&self, path: &str) -> Option<(&RouteEntry<P>, RouteParams)> {
        let mut best: Option<(&RouteEntry<P>, RouteParams)> = None;
        for entry in &self.routes {
            let Some(params) = entry.meta.matches(path) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| entry.meta.rank() > current.meta.rank());
            if better {
                best = Some((entry, params));
            }
        }
        best
    }

    /// Resolve a request target into a page and its route match.
    ///
    /// Returns `Ok(None)` when no route matches.
    pub fn resolve(
        &self,
        host: &str,
        url: &str,
    ) -> Result<Option<(&RouteEntry<P>, RouteMatch)>, RouteError> {
        let (path, _) = split_url(url);
        let Some((entry, params)) = self.match_path(path) else {
            return Ok(None);
        };
        let route = RouteMatch::from_url(host, url, params)?;
        Ok(Some((entry, route)))
    }

    /// Find the error boundary with the longest prefix covering `path`.
    pub fn nearest_error_boundary(&self, path: &str) -> Option<&P> {
        self.boundaries
            .iter()
            .filter(|b| covers(&b.prefix, path))
            .max_by_key(|b| b.prefix.len())
            .map(|b| &b.page)
    }
}

fn covers(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RouteRegistry<&'static str> {
        let mut registry = RouteRegistry::new();
        registry.register("/", "Home").unwrap();
        registry.register("/blog/:slug", "BlogPost").unwrap();
        registry.register("/blog/archive", "Archive").unwrap();
        registry.register("/docs/*path", "Docs").unwrap();
        registry
    }

    // === Pattern Tests ===

    #[test]
    fn test_parse_pattern() {
        let meta = RouteMeta::parse("/product/:id/*rest").unwrap();
        assert_eq!(
            meta.segments,
            vec![
                Segment::Static("product".to_string()),
                Segment::Param("id".to_string()),
                Segment::Wildcard("rest".to_string()),
            ]
        );
        assert_eq!(meta.param_names().collect::<Vec<_>>(), vec!["id", "rest"]);
    }

    #[test]
    fn test_parse_pattern_rejects_duplicates() {
        let err = RouteMeta::parse("/:id/:id").unwrap_err();
        assert!(matches!(err, RouteError::DuplicateParam { .. }));
    }

    #[test]
    fn test_parse_pattern_rejects_wildcard_before_end() {
        let err = RouteMeta::parse("/docs/*path/edit").unwrap_err();
        assert_eq!(
            err,
            RouteError::MisplacedWildcard {
                pattern: "/docs/*path/edit".into(),
                param: "path".into(),
            }
        );
        assert!(RouteMeta::parse("/docs/*path/").is_ok());

        let mut registry = RouteRegistry::new();
        assert!(registry.register("/files/*rest/:id", "File").is_err());
    }

    #[test]
    fn test_parse_pattern_rejects_empty_name() {
        assert!(RouteMeta::parse("/a/:").is_err());
        assert!(RouteMeta::parse("relative").is_err());
    }

    // === Matching Tests ===

    #[test]
    fn test_match_root() {
        let registry = registry();
        let (entry, params) = registry.match_path("/").unwrap();
        assert_eq!(entry.page, "Home");
        assert!(params.is_empty());
    }

    #[test]
    fn test_match_param() {
        let registry = registry();
        let (entry, params) = registry.match_path("/blog/some-post").unwrap();
        assert_eq!(entry.page, "BlogPost");
        assert_eq!(params.get("slug").map(String::as_str), Some("some-post"));
    }

    #[test]
    fn test_static_beats_param() {
        let registry = registry();
        let (entry, _) = registry.match_path("/blog/archive").unwrap();
        assert_eq!(entry.page, "Archive");
    }

    #[test]
    fn test_wildcard_collects_rest() {
        let registry = registry();
        let (entry, params) = registry.match_path("/docs/guide/intro").unwrap();
        assert_eq!(entry.page, "Docs");
        assert_eq!(params.get("path").map(String::as_str), Some("guide/intro"));
        assert!(registry.match_path("/docs").is_none());
    }

    #[test]
    fn test_no_match() {
        let registry = registry();
        assert!(registry.match_path("/blog").is_none());
        assert!(registry.match_path("/blog/a/b").is_none());
    }

    #[test]
    fn test_resolve_builds_route_match() {
        let registry = registry();
        let (entry, route) = registry
            .resolve("localhost", "/blog/some-post?foo=bar&baz")
            .unwrap()
            .unwrap();

        assert_eq!(entry.page, "BlogPost");
        assert_eq!(route.param("slug"), Some("some-post"));
        assert_eq!(route.query_param("foo"), Some("bar"));
        assert!(route.query_flag("baz"));
    }

    #[test]
    fn test_params_are_exactly_pattern_names() {
        let registry = registry();
        let (entry, route) = registry
            .resolve("localhost", "/blog/hello%20world")
            .unwrap()
            .unwrap();

        let mut names: Vec<&str> = route.params().keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, entry.meta.param_names().collect::<Vec<_>>());
        assert_eq!(route.param("slug"), Some("hello world"));
    }

    // === Error Boundary Tests ===

    #[test]
    fn test_nearest_error_boundary() {
        let mut registry = registry();
        registry.error_boundary("/", "RootError");
        registry.error_boundary("/blog/", "BlogError");

        assert_eq!(registry.nearest_error_boundary("/blog/x"), Some(&"BlogError"));
        assert_eq!(registry.nearest_error_boundary("/blog"), Some(&"BlogError"));
        assert_eq!(registry.nearest_error_boundary("/blogroll"), Some(&"RootError"));
        assert_eq!(registry.nearest_error_boundary("/"), Some(&"RootError"));
    }

    #[test]
    fn test_no_error_boundary() {
        let registry = registry();
        assert!(registry.nearest_error_boundary("/anything").is_none());
    }
}
