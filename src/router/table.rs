//! Route table: storage and resolution of `(method, pattern) → handler chain`.
//!
//! Fully literal patterns live in a hash map keyed by their normalized path, so an
//! exact match is a single lookup and always beats a parameterized pattern.
//! Parameterized patterns are kept in first-registration order and scanned in that
//! order; the first pattern that both matches the path and has a handler for the
//! method wins. This keeps precedence deterministic and easy to reason about:
//!
//! 1. exact literal match
//! 2. parameterized patterns, earliest registration first
//!
//! A path that matches some pattern, but not for the requested method, resolves to
//! [`Resolution::MethodNotAllowed`] with the methods that *would* have matched.

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::pattern::Pattern;
use crate::dispatcher::BoxedHandler;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the route table (known at
/// startup) and cloning them is an atomic increment; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// The fixed verb set routes may be registered for, in `Allow` header order.
pub const SUPPORTED_METHODS: [Method; 8] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
];

/// A registered route with its fully composed handler chain.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: Arc<Pattern>,
    chain: Arc<[BoxedHandler]>,
}

impl Route {
    pub(crate) fn new(method: Method, pattern: Arc<Pattern>, chain: Vec<BoxedHandler>) -> Self {
        Self {
            method,
            pattern,
            chain: chain.into(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Group middleware (outermost first), then the route's own handlers.
    #[must_use]
    pub fn chain(&self) -> &[BoxedHandler] {
        &self.chain
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("handlers", &self.chain.len())
            .finish()
    }
}

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route
    pub route: Arc<Route>,
    /// Path parameters bound by placeholders (e.g., `:id` → `"123"`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics should a name ever be bound twice.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of [`RouteTable::resolve`].
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A route handles this method and path
    Matched(RouteMatch),
    /// The path is known but not for this method (HTTP 405)
    MethodNotAllowed {
        /// Methods registered for the path, in [`SUPPORTED_METHODS`] order
        allowed: Vec<Method>,
    },
    /// No pattern matches the path (HTTP 404)
    NotFound,
}

/// Per-pattern method → route map. Tiny, so a vector beats a hash map.
#[derive(Clone, Default)]
struct MethodTable {
    entries: Vec<Arc<Route>>,
}

impl MethodTable {
    fn insert(&mut self, route: Arc<Route>) -> Option<Arc<Route>> {
        if let Some(slot) = self.entries.iter_mut().find(|r| r.method == route.method) {
            return Some(std::mem::replace(slot, route));
        }
        self.entries.push(route);
        None
    }

    /// HEAD falls back to GET when no explicit HEAD route exists.
    fn lookup(&self, method: &Method) -> Option<&Arc<Route>> {
        let exact = self.entries.iter().find(|r| r.method == *method);
        if exact.is_none() && *method == Method::HEAD {
            return self.entries.iter().find(|r| r.method == Method::GET);
        }
        exact
    }

    fn collect_methods(&self, into: &mut Vec<Method>) {
        for route in &self.entries {
            if route.method == Method::GET {
                into.push(Method::HEAD);
            }
            into.push(route.method.clone());
        }
    }
}

/// Routing table built once during construction and only read afterwards.
#[derive(Clone, Default)]
pub struct RouteTable {
    static_routes: HashMap<String, MethodTable>,
    param_routes: Vec<(Arc<Pattern>, MethodTable)>,
    len: usize,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route. An existing route with the same method and a pattern of the
    /// same shape (placeholder names aside) is replaced and returned.
    pub fn insert(&mut self, route: Route) -> Option<Arc<Route>> {
        let route = Arc::new(route);
        let replaced = if route.pattern.is_static() {
            self.static_routes
                .entry(route.pattern.as_str().to_string())
                .or_default()
                .insert(route)
        } else {
            match self
                .param_routes
                .iter_mut()
                .find(|(p, _)| p.same_shape(&route.pattern))
            {
                Some((_, table)) => table.insert(route),
                None => {
                    let mut table = MethodTable::default();
                    let pattern = Arc::clone(&route.pattern);
                    table.insert(route);
                    self.param_routes.push((pattern, table));
                    None
                }
            }
        };
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Resolve a method and already-split path segments.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, method: &Method, segments: &[S]) -> Resolution {
        let mut allowed = Vec::new();

        // A decoded `%2F` inside one segment must not line up with two literal ones.
        let joinable = segments.iter().all(|s| !s.as_ref().contains('/'));
        if let Some(table) = joinable
            .then(|| self.static_routes.get(&static_key(segments)))
            .flatten()
        {
            if let Some(route) = table.lookup(method) {
                return Resolution::Matched(RouteMatch {
                    route: Arc::clone(route),
                    path_params: ParamVec::new(),
                });
            }
            table.collect_methods(&mut allowed);
        }

        for (shape, table) in &self.param_routes {
            if !shape.matches_segments(segments) {
                continue;
            }
            if let Some(route) = table.lookup(method) {
                // Placeholder names can differ between methods sharing one shape.
                let mut path_params = ParamVec::new();
                route.pattern.match_segments(segments, &mut path_params);
                return Resolution::Matched(RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                });
            }
            table.collect_methods(&mut allowed);
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            allowed.sort_by_key(method_rank);
            allowed.dedup();
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Number of distinct (method, pattern) routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every route: literal patterns sorted by path, then parameterized patterns in
    /// registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        let mut keys: Vec<&String> = self.static_routes.keys().collect();
        keys.sort();
        let mut out = Vec::with_capacity(self.len);
        for key in keys {
            if let Some(table) = self.static_routes.get(key) {
                out.extend(table.entries.iter().cloned());
            }
        }
        for (_, table) in &self.param_routes {
            out.extend(table.entries.iter().cloned());
        }
        out
    }
}

fn static_key<S: AsRef<str>>(segments: &[S]) -> String {
    let capacity = segments.iter().map(|s| s.as_ref().len() + 1).sum::<usize>() + 1;
    let mut key = String::with_capacity(capacity);
    if segments.is_empty() {
        key.push('/');
    }
    for segment in segments {
        key.push('/');
        key.push_str(segment.as_ref());
    }
    key
}

fn method_rank(method: &Method) -> usize {
    SUPPORTED_METHODS
        .iter()
        .position(|m| m == method)
        .unwrap_or(SUPPORTED_METHODS.len())
}
