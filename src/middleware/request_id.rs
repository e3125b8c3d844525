use http::HeaderValue;

use crate::context::Context;
use crate::dispatcher::{Handler, HandlerResult};
use crate::ids::REQUEST_ID_HEADER;

/// Echoes the request id in the `X-Request-Id` response header.
///
/// The id is the caller's own when it sent a valid ULID, otherwise a fresh one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

impl Handler for RequestIdMiddleware {
    fn call(&self, ctx: &mut Context) -> HandlerResult {
        let id = ctx.request_id().to_string();
        let value = HeaderValue::from_str(&id)?;
        ctx.set_header(http::header::HeaderName::from_static(REQUEST_ID_HEADER), value);
        ctx.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;

    #[test]
    fn test_echoes_incoming_id() {
        let id = RequestId::new();
        let req = http::Request::get("/")
            .header(REQUEST_ID_HEADER, id.to_string())
            .body("")
            .unwrap();
        let mut ctx = Context::from_request(req);
        RequestIdMiddleware.call(&mut ctx).unwrap();
        assert_eq!(ctx.response_headers()[REQUEST_ID_HEADER], id.to_string().as_str());
    }

    #[test]
    fn test_mints_id_when_absent() {
        let mut ctx = Context::from_request(http::Request::get("/").body("").unwrap());
        RequestIdMiddleware.call(&mut ctx).unwrap();
        let header = ctx.response_headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(header.parse::<RequestId>().is_ok());
    }
}
