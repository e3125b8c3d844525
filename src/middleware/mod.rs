//! Reusable middleware.
//!
//! Middleware are ordinary [`Handler`](crate::dispatcher::Handler)s attached to an
//! app or group with `use_middleware`; they return `ctx.next()` to continue the
//! chain or finish the response themselves to short-circuit it.

mod auth;
mod request_id;

pub use auth::AuthMiddleware;
pub use request_id::RequestIdMiddleware;
