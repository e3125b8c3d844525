use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use tracing::{debug, info, warn};

use super::pattern::{normalize_path, split_segments, Pattern};
use super::table::{Resolution, RouteMatch, Route, RouteTable, SUPPORTED_METHODS};
use crate::config::RouterConfig;
use crate::context::{Context, ResponseState};
use crate::dispatcher::{boxed, BoxedHandler, Dispatcher, ErrorHandler, Handler};
use crate::error::RouterError;

const ROOT_GROUP: usize = 0;

struct GroupNode {
    /// Full prefix, parents included
    prefix: String,
    parent: Option<usize>,
    middleware: Vec<BoxedHandler>,
}

struct Registration {
    method: Method,
    pattern: Arc<Pattern>,
    group: usize,
    handlers: Vec<BoxedHandler>,
}

/// Everything collected during the construction phase.
struct Registry {
    config: RouterConfig,
    groups: Vec<GroupNode>,
    routes: Vec<Registration>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Registry {
    fn new(config: RouterConfig) -> Self {
        Self {
            config,
            groups: vec![GroupNode {
                prefix: String::new(),
                parent: None,
                middleware: Vec::new(),
            }],
            routes: Vec::new(),
            error_handler: None,
        }
    }

    fn add_group(&mut self, parent: usize, prefix: &str) -> usize {
        let prefix = join_paths(&self.groups[parent].prefix, prefix);
        debug!(prefix = %prefix, "Route group created");
        self.groups.push(GroupNode {
            prefix,
            parent: Some(parent),
            middleware: Vec::new(),
        });
        self.groups.len() - 1
    }

    fn add(
        &mut self,
        group: usize,
        method: Method,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<(), RouterError> {
        let full = join_paths(&self.groups[group].prefix, pattern);
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(RouterError::UnsupportedMethod {
                method: method.to_string(),
                pattern: full,
            });
        }
        if handlers.is_empty() {
            return Err(RouterError::EmptyChain {
                method: method.to_string(),
                pattern: full,
            });
        }
        let pattern = Pattern::parse(&full, self.config.strict_routing)?;
        debug!(
            method = %method,
            pattern = %pattern,
            handlers = handlers.len(),
            "Route registered"
        );
        self.routes.push(Registration {
            method,
            pattern: Arc::new(pattern),
            group,
            handlers,
        });
        Ok(())
    }
}

/// Join a group prefix and a (possibly relative or empty) pattern.
fn join_paths(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        return prefix.to_string();
    }
    let prefix = prefix.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// Group middleware from the outermost group inwards, then the route's handlers.
fn compose(groups: &[GroupNode], group: usize, handlers: Vec<BoxedHandler>) -> Vec<BoxedHandler> {
    let mut lineage = Vec::new();
    let mut current = Some(group);
    while let Some(id) = current {
        lineage.push(id);
        current = groups[id].parent;
    }
    let mut chain = Vec::with_capacity(handlers.len());
    for id in lineage.into_iter().rev() {
        chain.extend(groups[id].middleware.iter().map(Arc::clone));
    }
    chain.extend(handlers);
    chain
}

macro_rules! verb_methods {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Register `handler` for `", stringify!($method), "` requests to `pattern`.")]
            ///
            /// # Errors
            ///
            /// See [`App::add`].
            pub fn $name<H: Handler>(&self, pattern: &str, handler: H) -> Result<(), RouterError> {
                self.add(Method::$method, pattern, vec![boxed(handler)])
            }
        )*

        /// Register `handler` for every supported method on `pattern`.
        ///
        /// # Errors
        ///
        /// See [`App::add`].
        pub fn all<H: Handler>(&self, pattern: &str, handler: H) -> Result<(), RouterError> {
            let handler = boxed(handler);
            for method in SUPPORTED_METHODS {
                self.add(method, pattern, vec![Arc::clone(&handler)])?;
            }
            Ok(())
        }
    };
}

/// Route registration for the construction phase.
///
/// Routes, groups, and middleware are collected here and turned into an immutable
/// [`Router`] by [`App::build`]. Handler chains are composed during `build`, so
/// middleware attached to a group applies to all of its routes no matter whether
/// it was attached before or after they were registered.
///
/// ```rust
/// use chainrouter::{App, Context};
///
/// let app = App::new();
/// app.get("/", |ctx: &mut Context| {
///     let name = ctx.query("name", "World").to_string();
///     ctx.send_string(format!("Hello {name}"))
/// })
/// .unwrap();
///
/// let router = app.build();
/// let res = router.handle(http::Request::get("/?name=Chun-Li").body("").unwrap());
/// assert_eq!(res.body().as_ref(), b"Hello Chun-Li");
/// ```
pub struct App {
    registry: RefCell<Registry>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("App")
            .field("config", &registry.config)
            .field("groups", &registry.groups.len())
            .field("routes", &registry.routes.len())
            .finish()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            registry: RefCell::new(Registry::new(config)),
        }
    }

    #[must_use]
    pub fn config(&self) -> RouterConfig {
        self.registry.borrow().config
    }

    /// The root group; routes registered on it have no prefix.
    #[must_use]
    pub fn root(&self) -> Group<'_> {
        Group {
            registry: &self.registry,
            id: ROOT_GROUP,
        }
    }

    /// Create a group whose routes share `prefix` and the group's middleware.
    #[must_use]
    pub fn group(&self, prefix: &str) -> Group<'_> {
        self.root().group(prefix)
    }

    /// Attach middleware that runs before every route's handlers.
    pub fn use_middleware<H: Handler>(&self, middleware: H) -> &Self {
        self.root().use_middleware(middleware);
        self
    }

    /// Replace the default error handler.
    pub fn error_handler<E: ErrorHandler>(&self, handler: E) -> &Self {
        self.registry.borrow_mut().error_handler = Some(Arc::new(handler));
        self
    }

    /// Register a handler chain for `method` and `pattern`.
    ///
    /// Registering the same method and pattern twice keeps the later chain.
    ///
    /// # Errors
    ///
    /// [`RouterError::InvalidPattern`] for a malformed pattern,
    /// [`RouterError::UnsupportedMethod`] outside the supported verb set, and
    /// [`RouterError::EmptyChain`] for an empty `handlers`.
    pub fn add(
        &self,
        method: Method,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<(), RouterError> {
        self.root().add(method, pattern, handlers)
    }

    verb_methods! {
        get => GET,
        head => HEAD,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
        options => OPTIONS,
        trace => TRACE,
    }

    /// Finish construction and produce the shareable router.
    #[must_use]
    pub fn build(self) -> Router {
        let Registry {
            config,
            groups,
            routes,
            error_handler,
        } = self.registry.into_inner();

        let mut table = RouteTable::new();
        for registration in routes {
            let Registration {
                method,
                pattern,
                group,
                handlers,
            } = registration;
            let chain = compose(&groups, group, handlers);
            let raw = Arc::clone(&pattern);
            if let Some(replaced) = table.insert(Route::new(method, pattern, chain)) {
                warn!(
                    method = %replaced.method(),
                    pattern = %raw,
                    replaced_pattern = %replaced.pattern(),
                    "Replaced existing route registration"
                );
            }
        }

        info!(
            routes_count = table.len(),
            groups_count = groups.len(),
            strict_routing = config.strict_routing,
            unescape_path = config.unescape_path,
            body_limit = config.body_limit,
            "Routing table built"
        );

        let dispatcher = error_handler.map_or_else(Dispatcher::new, Dispatcher::with_error_handler);
        Router {
            inner: Arc::new(RouterInner {
                table,
                dispatcher,
                config,
            }),
        }
    }
}

/// A set of routes sharing a path prefix and middleware.
///
/// Groups borrow the [`App`] they belong to, so none can outlive the construction
/// phase. Nested groups inherit their parent's prefix and middleware.
#[derive(Clone, Copy)]
pub struct Group<'a> {
    registry: &'a RefCell<Registry>,
    id: usize,
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix())
            .finish()
    }
}

impl<'a> Group<'a> {
    /// Full prefix of this group, parents included.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.registry.borrow().groups[self.id].prefix.clone()
    }

    /// Create a nested group below this one.
    #[must_use]
    pub fn group(&self, prefix: &str) -> Group<'a> {
        let id = self.registry.borrow_mut().add_group(self.id, prefix);
        Group {
            registry: self.registry,
            id,
        }
    }

    /// Attach middleware that runs before the handlers of every route in this group
    /// and its subgroups, after any middleware of enclosing groups.
    pub fn use_middleware<H: Handler>(&self, middleware: H) -> &Self {
        self.registry.borrow_mut().groups[self.id]
            .middleware
            .push(boxed(middleware));
        self
    }

    /// Register a handler chain for `method` and `pattern` below this group's prefix.
    ///
    /// # Errors
    ///
    /// See [`App::add`].
    pub fn add(
        &self,
        method: Method,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<(), RouterError> {
        self.registry
            .borrow_mut()
            .add(self.id, method, pattern, handlers)
    }

    verb_methods! {
        get => GET,
        head => HEAD,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
        options => OPTIONS,
        trace => TRACE,
    }
}

struct RouterInner {
    table: RouteTable,
    dispatcher: Dispatcher,
    config: RouterConfig,
}

/// Immutable routing table plus dispatcher, ready to serve.
///
/// Cloning is cheap and every clone serves from the same table, so a router can be
/// handed to as many threads as the listener uses.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.inner.table.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Router {
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Number of distinct (method, pattern) routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    /// All routes as `(method, pattern)` pairs.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.inner
            .table
            .routes()
            .iter()
            .map(|r| (r.method().clone(), r.pattern().as_str().to_string()))
            .collect()
    }

    /// Log every registered route at info level.
    pub fn dump_routes(&self) {
        for route in self.inner.table.routes() {
            info!(
                method = %route.method(),
                pattern = %route.pattern(),
                handlers = route.chain().len(),
                "Registered route"
            );
        }
    }

    /// Resolve a method and request path (query string ignored) against the table.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let path = path.split('?').next().unwrap_or_default();
        let normalized = normalize_path(path, self.inner.config.strict_routing);
        let unescape = self.inner.config.unescape_path;
        let segments: Vec<Cow<'_, str>> = split_segments(&normalized)
            .map(|segment| {
                if unescape {
                    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
                } else {
                    Cow::Borrowed(segment)
                }
            })
            .collect();

        debug!(method = %method, path = %path, "Route match attempt");
        self.inner.table.resolve(method, &segments)
    }

    /// Serve one request.
    ///
    /// Unmatched requests get the built-in answers without running any middleware:
    /// `404` with `Cannot <METHOD> <path>`, `405` with an `Allow` header, and `413`
    /// when the body exceeds the configured limit.
    pub fn handle<B: Into<Bytes>>(&self, req: Request<B>) -> Response<Bytes> {
        let start = Instant::now();
        let (parts, body) = req.into_parts();
        let body: Bytes = body.into();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let head_only = method == Method::HEAD;

        if body.len() > self.inner.config.body_limit {
            warn!(
                method = %method,
                path = %path,
                body_size = body.len(),
                body_limit = self.inner.config.body_limit,
                "Request body over limit"
            );
            return ResponseState::plain(StatusCode::PAYLOAD_TOO_LARGE, "Request Entity Too Large")
                .into_http(head_only);
        }

        match self.resolve(&method, &path) {
            Resolution::Matched(RouteMatch { route, path_params }) => {
                let mut ctx = Context::new(parts, body, path_params);
                let request_id = ctx.request_id();
                info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route_pattern = %route.pattern(),
                    path_params = ?ctx.params(),
                    "Route matched"
                );
                let outcome = self.inner.dispatcher.dispatch(route.chain(), &mut ctx);
                let response = ctx.into_response();
                info!(
                    request_id = %request_id,
                    status = response.status().as_u16(),
                    outcome = ?outcome,
                    duration_us = start.elapsed().as_micros() as u64,
                    "Request completed"
                );
                response
            }
            Resolution::MethodNotAllowed { allowed } => {
                warn!(
                    method = %method,
                    path = %path,
                    allowed = ?allowed,
                    "Method not allowed"
                );
                ResponseState::method_not_allowed(&allowed).into_http(head_only)
            }
            Resolution::NotFound => {
                warn!(
                    method = %method,
                    path = %path,
                    duration_us = start.elapsed().as_micros() as u64,
                    "No route matched"
                );
                ResponseState::plain(StatusCode::NOT_FOUND, format!("Cannot {method} {path}"))
                    .into_http(head_only)
            }
        }
    }
}
