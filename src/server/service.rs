use std::io::{self, Read};

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::StatusCode;
use may_minihttp::{HttpService, Request, Response};
use tracing::{debug, warn};

use crate::router::Router;

/// Header lines shared by most responses, handed out without allocating.
const STATIC_HEADER_LINES: &[&str] = &[
    "content-type: text/plain; charset=utf-8",
    "content-type: application/json",
    "content-type: text/plain",
    "content-type: text/html; charset=utf-8",
    "content-type: application/octet-stream",
    "allow: GET, HEAD",
];

/// Owned storage for the header lines of the response currently being written.
///
/// `may_minihttp` only accepts `&'static str` header lines. It encodes the response
/// right after `HttpService::call` returns and before the next request on the same
/// connection is dispatched, so lines only have to outlive one call.
#[derive(Debug, Default)]
struct HeaderLines {
    lines: Vec<Box<str>>,
}

impl Clone for HeaderLines {
    // Each connection gets its own clone of the service, and its own empty buffer.
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl HeaderLines {
    /// Release the previous response's lines.
    fn reset(&mut self) {
        self.lines.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lines.len()
    }

    #[allow(unsafe_code)]
    fn line(&mut self, line: String) -> &'static str {
        if let Some(known) = STATIC_HEADER_LINES.iter().find(|known| **known == line) {
            return *known;
        }
        let line = line.into_boxed_str();
        let ptr: *const str = &*line;
        self.lines.push(line);
        // SAFETY: the boxed allocation never moves while the vector grows and is only
        // freed by `reset` (start of the next call on this connection) or by dropping
        // the service when the connection closes, both after the response was encoded.
        unsafe { &*ptr }
    }
}

/// `may_minihttp` service that hands every request to a [`Router`].
#[derive(Clone, Debug)]
pub struct AppService {
    router: Router,
    header_lines: HeaderLines,
}

impl AppService {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            header_lines: HeaderLines::default(),
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Copy a `may_minihttp` request into an owned `http::Request`.
fn to_http_request(req: Request) -> io::Result<http::Request<Vec<u8>>> {
    let method = req.method().to_string();
    let path = req.path().to_string();
    let headers: Vec<(String, Vec<u8>)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_string(), h.value.to_vec()))
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        body_size = body.len(),
        "HTTP request parsed"
    );

    let mut builder = http::Request::builder()
        .method(method.as_str())
        .uri(path.as_str());
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder
        .body(body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_response(res: &mut Response, lines: &mut HeaderLines, response: http::Response<Bytes>) {
    let status = response.status();
    res.status_code(
        usize::from(status.as_u16()),
        status.canonical_reason().unwrap_or("Unknown"),
    );
    for (name, value) in response.headers() {
        // may_minihttp writes Content-Length itself
        if name == CONTENT_LENGTH {
            continue;
        }
        let line = format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
        res.header(lines.line(line));
    }
    res.body_vec(response.into_body().to_vec());
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        self.header_lines.reset();
        match to_http_request(req) {
            Ok(request) => {
                let response = self.router.handle(request);
                write_response(res, &mut self.header_lines, response);
            }
            Err(err) => {
                warn!(error = %err, "Rejected unparseable request");
                let status = StatusCode::BAD_REQUEST;
                res.status_code(usize::from(status.as_u16()), "Bad Request");
                res.header("Content-Type: text/plain; charset=utf-8");
                res.body_vec(b"Bad Request".to_vec());
            }
        }
        Ok(())
    }
}
