use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Response under construction, owned by the request context.
#[derive(Debug, Clone)]
pub(crate) struct ResponseState {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl ResponseState {
    /// Plain-text response used for answers the router gives on its own.
    pub(crate) fn plain(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub(crate) fn method_not_allowed(allowed: &[Method]) -> Self {
        let mut state = Self::plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            state.headers.insert(ALLOW, value);
        }
        state
    }

    /// Set `Content-Type` unless a handler already chose one.
    pub(crate) fn default_content_type(&mut self, value: &'static str) {
        self.headers
            .entry(CONTENT_TYPE)
            .or_insert_with(|| HeaderValue::from_static(value));
    }

    /// Finish into an `http::Response`. `head_only` drops the body (HEAD requests).
    pub(crate) fn into_http(self, head_only: bool) -> Response<Bytes> {
        let body = if head_only { Bytes::new() } else { self.body };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_header() {
        let res = ResponseState::method_not_allowed(&[Method::GET, Method::HEAD, Method::POST])
            .into_http(false);
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, HEAD, POST");
        assert_eq!(res.body().as_ref(), b"Method Not Allowed");
    }

    #[test]
    fn test_head_drops_body() {
        let res = ResponseState::plain(StatusCode::OK, "hello").into_http(true);
        assert!(res.body().is_empty());
        assert_eq!(res.headers()[CONTENT_TYPE], TEXT_PLAIN);
    }
}
