use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::error::HttpError;

/// What a handler wants to happen after it returns successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next handler in the chain
    Next,
    /// Stop here; the response in the context is final
    Done,
}

/// Return type of every handler and middleware.
pub type HandlerResult = anyhow::Result<Flow>;

/// A unit of request processing: a route handler or a middleware.
///
/// Any `Fn(&mut Context) -> HandlerResult` closure or function is a handler, so
/// most code never implements this trait by hand. Stateful middleware such as
/// [`AuthMiddleware`](crate::middleware::AuthMiddleware) implements it directly.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &mut Context) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut Context) -> HandlerResult {
        self(ctx)
    }
}

/// Shared, type-erased handler as stored in composed chains.
pub type BoxedHandler = Arc<dyn Handler>;

/// Erase a handler's type so it can sit in a chain next to other handlers.
pub fn boxed<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

/// Build a `Vec<BoxedHandler>` from a list of handlers of possibly different types.
///
/// ```rust
/// use chainrouter::{chain, App, Context, HandlerResult};
///
/// fn log_it(ctx: &mut Context) -> HandlerResult {
///     ctx.next()
/// }
///
/// let app = App::new();
/// app.add(
///     http::Method::GET,
///     "/",
///     chain![log_it, |ctx: &mut Context| ctx.send_string("hi")],
/// )
/// .unwrap();
/// ```
#[macro_export]
macro_rules! chain {
    ($($handler:expr),+ $(,)?) => {
        vec![$($crate::dispatcher::boxed($handler)),+]
    };
}

/// Receives an error returned (or a panic raised) by a handler.
///
/// It runs at most once per request and must leave a response in the context.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context, err: anyhow::Error);
}

impl<F> ErrorHandler for F
where
    F: Fn(&mut Context, anyhow::Error) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context, err: anyhow::Error) {
        self(ctx, err)
    }
}

/// Answer with the error message as plain text.
///
/// The status is taken from an [`HttpError`] when the error is one, 500 otherwise.
pub fn default_error_handler(ctx: &mut Context, err: anyhow::Error) {
    let status = err
        .downcast_ref::<HttpError>()
        .map_or(StatusCode::INTERNAL_SERVER_ERROR, HttpError::status);
    ctx.status(status);
    ctx.set_header(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    ctx.set_body(err.to_string());
}

/// How a chain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every handler returned [`Flow::Next`]
    Exhausted,
    /// The handler at `index` returned [`Flow::Done`]
    Completed { index: usize },
    /// The handler at `index` failed; the error handler has run
    Failed { index: usize },
}

/// Runs composed handler chains against a request context.
#[derive(Clone)]
pub struct Dispatcher {
    error_handler: Arc<dyn ErrorHandler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher using [`default_error_handler`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            error_handler: Arc::new(default_error_handler),
        }
    }

    #[must_use]
    pub fn with_error_handler(error_handler: Arc<dyn ErrorHandler>) -> Self {
        Self { error_handler }
    }

    /// Run `chain` in order until a handler finishes, fails, or the chain runs out.
    ///
    /// Handler panics are caught and treated like returned errors. Either way the
    /// error handler runs and nothing after the failing handler does.
    pub fn dispatch(&self, chain: &[BoxedHandler], ctx: &mut Context) -> DispatchOutcome {
        let request_id = ctx.request_id();
        let start = Instant::now();

        for (index, handler) in chain.iter().enumerate() {
            let result = match catch_unwind(AssertUnwindSafe(|| handler.call(ctx))) {
                Ok(result) => result,
                Err(panic) => {
                    let panic_message = panic_message(panic.as_ref());
                    error!(
                        request_id = %request_id,
                        handler_index = index,
                        panic_message = %panic_message,
                        "Handler panicked"
                    );
                    Err(anyhow::anyhow!("handler panicked: {panic_message}"))
                }
            };

            match result {
                Ok(Flow::Next) => continue,
                Ok(Flow::Done) => {
                    debug!(
                        request_id = %request_id,
                        handler_index = index,
                        chain_len = chain.len(),
                        duration_us = start.elapsed().as_micros() as u64,
                        "Chain completed"
                    );
                    return DispatchOutcome::Completed { index };
                }
                Err(err) => {
                    warn!(
                        request_id = %request_id,
                        handler_index = index,
                        error = %err,
                        "Handler failed"
                    );
                    self.handle_error(ctx, err);
                    return DispatchOutcome::Failed { index };
                }
            }
        }

        info!(
            request_id = %request_id,
            chain_len = chain.len(),
            "Chain exhausted without a final handler"
        );
        DispatchOutcome::Exhausted
    }

    /// Invoke the error handler, once per request.
    pub fn handle_error(&self, ctx: &mut Context, err: anyhow::Error) {
        let already_handled = ctx.mark_error_handled();
        debug_assert!(!already_handled, "error handler invoked twice for one request");
        if already_handled {
            error!(
                request_id = %ctx.request_id(),
                error = %err,
                "Dropping second error for a request that already failed"
            );
            return;
        }

        let handler = Arc::clone(&self.error_handler);
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler.handle(ctx, err))) {
            error!(
                request_id = %ctx.request_id(),
                panic_message = %panic_message(panic.as_ref()),
                "Error handler panicked"
            );
            default_error_handler(ctx, anyhow::anyhow!("Internal Server Error"));
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
