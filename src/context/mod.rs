//! # Context Module
//!
//! [`Context`] is the single value a handler works with: it exposes the decoded
//! request (query, headers, cookies, path parameters, body, form) and collects the
//! response the handler chain builds.
//!
//! ## Request Accessors
//!
//! Lookups take a default that is returned when the value is absent, so handlers
//! can read optional input without branching:
//!
//! ```rust
//! use chainrouter::Context;
//!
//! let req = http::Request::get("/?name=Chun-Li").body("").unwrap();
//! let ctx = Context::from_request(req);
//! assert_eq!(ctx.query("name", "World"), "Chun-Li");
//! assert_eq!(ctx.header("x-missing", "lah kocak"), "lah kocak");
//! ```
//!
//! - `query`: first value; `+` and percent escapes decoded
//! - `header`: case-insensitive name
//! - `cookie`: exact name
//! - `param`: path parameter bound by the matched pattern
//! - `form_value` / `form_file`: urlencoded and multipart bodies, decoded eagerly
//!
//! ## Response Builders
//!
//! `status`, `set`, and `set_cookie` shape the response; `send`, `send_string`,
//! `send_status`, and `json` set the body and return `Ok(Flow::Done)` so a handler
//! can end with them directly. `next()` returns `Ok(Flow::Next)`.

mod core;
mod form;
mod request;
mod response;

pub use core::Context;
pub use form::{parse_multipart, parse_urlencoded, Form, FormFile};
pub use request::{parse_cookies, parse_query};

pub(crate) use response::ResponseState;
