//! # Router Module
//!
//! Route registration, pattern matching, and request resolution.
//!
//! ## Overview
//!
//! The router works in two phases:
//!
//! 1. **Construction**: routes, groups, and middleware are registered on an
//!    [`App`]. Patterns are validated as they are added; handler chains are
//!    composed when [`App::build`] runs.
//!
//! 2. **Serving**: the resulting [`Router`] is immutable. It is `Clone + Send +
//!    Sync`, and concurrent requests read the same table without locking.
//!
//! ## Patterns
//!
//! Segments written `:name` or `{name}` bind the matching path segment; all other
//! segments match literally. Names are `[A-Za-z0-9_-]+` and unique within a
//! pattern. Unless strict routing is enabled, `/users/` and `/users` are the same
//! route.
//!
//! ## Precedence
//!
//! For a given method and path:
//!
//! 1. a fully literal pattern equal to the path wins
//! 2. otherwise parameterized patterns are tried in registration order
//!
//! A path that matches only for other methods gets `405 Method Not Allowed` with an
//! `Allow` header; a path nothing matches gets `404`. `HEAD` is served by the `GET`
//! route when no explicit `HEAD` route exists.
//!
//! ## Example
//!
//! ```rust
//! use chainrouter::{App, Context};
//!
//! let app = App::new();
//! app.get("/param/:id/weleh", |ctx: &mut Context| {
//!     let id = ctx.param("id", "").to_string();
//!     ctx.send_string(format!("Ini dia: {id}"))
//! })
//! .unwrap();
//!
//! let router = app.build();
//! let res = router.handle(http::Request::get("/param/chunli/weleh").body("").unwrap());
//! assert_eq!(res.body().as_ref(), b"Ini dia: chunli");
//! ```

mod core;
mod pattern;
mod table;

pub use core::{App, Group, Router};
pub use pattern::{Pattern, Segment};
pub use table::{
    ParamVec, Resolution, Route, RouteMatch, RouteTable, MAX_INLINE_PARAMS, SUPPORTED_METHODS,
};
