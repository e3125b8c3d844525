//! Listener adapter for `may_minihttp` (feature `minihttp`).
//!
//! The router itself never touches sockets; this module converts
//! `may_minihttp` requests into `http::Request`s, calls [`Router::handle`], and
//! writes the `http::Response` back.
//!
//! [`Router::handle`]: crate::router::Router::handle

mod http_server;
mod service;

pub use http_server::{serve, HttpServer, ServerHandle};
pub use service::AppService;
