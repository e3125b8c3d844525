//! # Dispatcher Module
//!
//! Runs the handler chain of a matched route against one request [`Context`].
//!
//! ## Overview
//!
//! A chain is the route's group middleware (outermost group first) followed by the
//! handlers given at registration. The dispatcher walks it front to back:
//!
//! - a handler returning `Ok(Flow::Next)` passes control to the next one
//! - `Ok(Flow::Done)` ends the chain; the context's response is final
//! - `Err(_)` ends the chain and hands the error to the [`ErrorHandler`]
//!
//! Handler panics are caught and converted into errors, so one faulty handler
//! cannot take down the thread serving it. The error handler runs at most once per
//! request.
//!
//! ## Writing Handlers
//!
//! ```rust
//! use chainrouter::{Context, HandlerResult};
//!
//! fn hello(ctx: &mut Context) -> HandlerResult {
//!     let name = ctx.query("name", "World").to_string();
//!     ctx.send_string(format!("Hello {name}"))
//! }
//!
//! fn audit(ctx: &mut Context) -> HandlerResult {
//!     tracing::info!(path = %ctx.path(), "audited");
//!     ctx.next()
//! }
//! ```
//!
//! [`Context`]: crate::context::Context

mod core;

pub use core::{
    boxed, default_error_handler, BoxedHandler, DispatchOutcome, Dispatcher, ErrorHandler, Flow,
    Handler, HandlerResult,
};
