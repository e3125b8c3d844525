use http::header::AUTHORIZATION;
use http::StatusCode;
use tracing::warn;

use crate::context::Context;
use crate::dispatcher::{Handler, HandlerResult};

/// Rejects requests whose `Authorization` header is not exactly the configured
/// token, answering `401` with `{"error":"Unauthorized"}`.
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    token: String,
}

impl AuthMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Handler for AuthMiddleware {
    fn call(&self, ctx: &mut Context) -> HandlerResult {
        match ctx.headers().get(AUTHORIZATION) {
            Some(h) if h.as_bytes() == self.token.as_bytes() => ctx.next(),
            _ => {
                warn!(
                    request_id = %ctx.request_id(),
                    path = %ctx.path(),
                    "Rejected unauthorized request"
                );
                ctx.status(StatusCode::UNAUTHORIZED);
                ctx.json(&serde_json::json!({ "error": "Unauthorized" }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Flow;

    fn ctx(auth: Option<&str>) -> Context {
        let mut req = http::Request::get("/auth/login");
        if let Some(auth) = auth {
            req = req.header(AUTHORIZATION, auth);
        }
        Context::from_request(req.body("").unwrap())
    }

    #[test]
    fn test_accepts_matching_token() {
        let mw = AuthMiddleware::new("Bearer secret");
        let mut ctx = ctx(Some("Bearer secret"));
        assert_eq!(mw.call(&mut ctx).unwrap(), Flow::Next);
        assert_eq!(ctx.response_status(), StatusCode::OK);
    }

    #[test]
    fn test_rejects_missing_or_wrong_token() {
        let mw = AuthMiddleware::new("Bearer secret");
        for auth in [None, Some("Bearer nope")] {
            let mut ctx = ctx(auth);
            assert_eq!(mw.call(&mut ctx).unwrap(), Flow::Done);
            assert_eq!(ctx.response_status(), StatusCode::UNAUTHORIZED);
            assert_eq!(ctx.response_body(), br#"{"error":"Unauthorized"}"#);
        }
    }
}
