//! # chainrouter
//!
//! **chainrouter** is an embeddable HTTP request router: it maps a method and path
//! to an ordered chain of handlers, gives every handler a request [`Context`] with
//! decoded query, header, cookie, path, form, and body data, and turns the result
//! into an `http::Response`.
//!
//! ## Overview
//!
//! Applications register routes on an [`App`], optionally inside prefixed
//! [`Group`]s that carry middleware, then call [`App::build`] to get an immutable,
//! cheaply clonable [`Router`]. The router serves `http::Request`s from any number
//! of threads; the optional `minihttp` feature provides a ready listener.
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern parsing, route table, registration (`App`, `Group`)
//! - **[`dispatcher`]** - Handler trait, chain execution, error handling
//! - **[`context`]** - Per-request accessors, form and multipart decoding, response builders
//! - **[`middleware`]** - Bearer-token authentication and request-id echo
//! - **[`config`]** - Routing options from code, environment, or YAML
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`error`]** - Registration and decoding errors
//! - **`server`** - `may_minihttp` adapter (feature `minihttp`)
//!
//! ## Quick Start
//!
//! ```rust
//! use chainrouter::middleware::AuthMiddleware;
//! use chainrouter::{App, Context, HandlerResult};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Login {
//!     username: String,
//!     password: String,
//! }
//!
//! fn login(ctx: &mut Context) -> HandlerResult {
//!     let login: Login = ctx.body_parser()?;
//!     if login.password != "kungfu" {
//!         return ctx.status(http::StatusCode::UNAUTHORIZED).send_string("nope");
//!     }
//!     ctx.send_string(format!("Successfully logged in. Welcome, {}", login.username))
//! }
//!
//! let app = App::new();
//! let auth = app.group("/auth");
//! auth.use_middleware(AuthMiddleware::new("Bearer secret"));
//! auth.post("/login", login).unwrap();
//!
//! let router = app.build();
//! let res = router.handle(
//!     http::Request::post("/auth/login")
//!         .header("authorization", "Bearer secret")
//!         .header("content-type", "application/json")
//!         .body(r#"{"username":"Chun-Li","password":"kungfu"}"#)
//!         .unwrap(),
//! );
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body().as_ref(), b"Successfully logged in. Welcome, Chun-Li");
//! ```
//!
//! ## Handler Chains
//!
//! A route's chain is its groups' middleware, outermost group first, followed by
//! the handlers given at registration. Each handler returns
//! `Ok(Flow::Next)` to continue, `Ok(Flow::Done)` to finish, or an error. Errors
//! and panics stop the chain and go to the app's error handler, which by default
//! answers `500` with the error message as plain text.
//!
//! ## Configuration
//!
//! [`RouterConfig`] controls strict routing (trailing slashes significant),
//! percent-decoding of path segments, and the request body limit. It can be built
//! in code, read from `CHAINR_*` environment variables, or parsed from YAML.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
#[cfg(feature = "minihttp")]
pub mod server;

pub use config::RouterConfig;
pub use context::{Context, Form, FormFile};
pub use dispatcher::{
    boxed, BoxedHandler, DispatchOutcome, Dispatcher, ErrorHandler, Flow, Handler, HandlerResult,
};
pub use error::{DecodeError, HttpError, RouterError};
pub use ids::RequestId;
pub use router::{App, Group, Resolution, Router};
