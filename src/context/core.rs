use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE, SET_COOKIE};
use http::request::Parts;
use http::{Extensions, HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::form::{parse_multipart, parse_urlencoded, Form, FormFile};
use super::request::{parse_cookies, parse_query};
use super::response::{ResponseState, APPLICATION_JSON, TEXT_PLAIN};
use crate::dispatcher::{Flow, HandlerResult};
use crate::error::DecodeError;
use crate::ids::RequestId;
use crate::router::ParamVec;

/// Per-request state handed to every handler in the chain.
///
/// The request side is decoded once when the context is created: query pairs,
/// cookies, and (for urlencoded or multipart bodies) the form. The response side
/// starts as an empty `200 OK` and is shaped by handlers through the builder
/// methods. A context belongs to exactly one request and is never shared between
/// threads.
pub struct Context {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    query: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    params: ParamVec,
    body: Bytes,
    form: Form,
    form_error: Option<DecodeError>,
    response: ResponseState,
    error_handled: bool,
    received_at: Instant,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("params", &self.params)
            .field("status", &self.response.status)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Build a context for a request with no path parameters bound.
    ///
    /// The router creates contexts itself; this is for driving handlers directly,
    /// for example in tests.
    pub fn from_request<B: Into<Bytes>>(req: Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body.into(), ParamVec::new())
    }

    pub(crate) fn new(parts: Parts, body: Bytes, params: ParamVec) -> Self {
        let Parts {
            method,
            uri,
            headers,
            extensions,
            ..
        } = parts;

        let request_id = RequestId::from_headers(&headers);
        let query = uri.query().map(parse_query).unwrap_or_default();
        let cookies = parse_cookies(&headers);
        let (form, form_error) = match decode_form(&headers, &body) {
            Ok(form) => (form, None),
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "Form body could not be decoded");
                (Form::default(), Some(err))
            }
        };

        debug!(
            request_id = %request_id,
            query_count = query.len(),
            cookie_count = cookies.len(),
            form_fields = form.fields.len(),
            form_files = form.files.len(),
            body_size = body.len(),
            "Request context created"
        );

        Self {
            request_id,
            method,
            uri,
            headers,
            extensions,
            query,
            cookies,
            params,
            body,
            form,
            form_error,
            response: ResponseState::default(),
            error_handled: false,
            received_at: Instant::now(),
        }
    }

    // ----- request side ---------------------------------------------------

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path as received, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Time the context was created.
    #[must_use]
    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// First value of the query parameter `key`, or `default`.
    #[must_use]
    pub fn query<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map_or(default, |(_, v)| v.as_str())
    }

    /// Every value of the query parameter `key`, in order.
    #[must_use]
    pub fn query_all(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Header value by case-insensitive name, or `default`.
    ///
    /// Values that are not visible ASCII read as `default`.
    #[must_use]
    pub fn header<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(default)
    }

    /// Cookie value by exact name, or `default`.
    #[must_use]
    pub fn cookie<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map_or(default, |(_, v)| v.as_str())
    }

    /// Path parameter bound by the matched route, or `default`.
    #[must_use]
    pub fn param<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map_or(default, |(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parsed `Content-Type` of the request, if present and well formed.
    #[must_use]
    pub fn content_type(&self) -> Option<mime::Mime> {
        content_type(&self.headers)
    }

    /// Decoded form body (empty for non-form requests).
    #[must_use]
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Form value `key`, or `default`.
    ///
    /// The query string is consulted first, then urlencoded body fields, then
    /// multipart text parts.
    #[must_use]
    pub fn form_value<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.lookup_form_value(key).unwrap_or(default)
    }

    /// Form value `key`, looked up like [`Context::form_value`].
    ///
    /// # Errors
    ///
    /// [`DecodeError::MissingField`] when the field is absent.
    pub fn require_form_value(&self, key: &str) -> Result<&str, DecodeError> {
        self.lookup_form_value(key)
            .ok_or_else(|| DecodeError::MissingField(key.to_string()))
    }

    fn lookup_form_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .or_else(|| self.form.value(key))
    }

    /// First uploaded file sent under `field`.
    ///
    /// # Errors
    ///
    /// The multipart decoding error if the body could not be parsed, otherwise
    /// [`DecodeError::MissingPart`] when no file part has that name.
    pub fn form_file(&self, field: &str) -> Result<&FormFile, DecodeError> {
        if let Some(err) = &self.form_error {
            return Err(replay(err));
        }
        self.form
            .file(field)
            .ok_or_else(|| DecodeError::MissingPart(field.to_string()))
    }

    /// Write an uploaded file to `path`.
    ///
    /// # Errors
    ///
    /// Any I/O error from the filesystem.
    pub fn save_file(&self, file: &FormFile, path: impl AsRef<Path>) -> std::io::Result<()> {
        file.save_to(path)
    }

    /// Decode the body as JSON, whatever the declared content type.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Json`] when the body is not valid JSON for `T`.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the body into `T` according to its content type.
    ///
    /// JSON bodies are deserialized directly. Urlencoded and multipart bodies are
    /// viewed as a flat object of their text fields (first value per name).
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnsupportedContentType`] for any other content type, or the
    /// decoding error of the body.
    pub fn body_parser<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let mime = self
            .content_type()
            .ok_or_else(|| DecodeError::UnsupportedContentType(String::new()))?;
        if mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON) {
            return self.body_json();
        }
        if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
            || mime.essence_str() == mime::MULTIPART_FORM_DATA.essence_str()
        {
            if let Some(err) = &self.form_error {
                return Err(replay(err));
            }
            let mut object = serde_json::Map::new();
            for (key, value) in &self.form.fields {
                object
                    .entry(key.clone())
                    .or_insert_with(|| serde_json::Value::String(value.clone()));
            }
            return Ok(serde_json::from_value(serde_json::Value::Object(object))?);
        }
        Err(DecodeError::UnsupportedContentType(
            mime.essence_str().to_string(),
        ))
    }

    /// Typed values shared between handlers of one request.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    // ----- response side --------------------------------------------------

    /// Set the response status.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.response.status = status;
        self
    }

    #[must_use]
    pub fn response_status(&self) -> StatusCode {
        self.response.status
    }

    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        &self.response.body
    }

    /// Set a response header, replacing earlier values.
    ///
    /// # Errors
    ///
    /// Fails when `name` or `value` is not a legal header name or value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<&mut Self, http::Error> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.response.headers.insert(name, value);
        Ok(self)
    }

    /// Typed variant of [`set`](Self::set).
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.response.headers.insert(name, value);
        self
    }

    /// Add a `Set-Cookie: name=value; Path=/` header.
    ///
    /// # Errors
    ///
    /// Fails when the pair is not a legal header value.
    pub fn set_cookie(&mut self, name: &str, value: &str) -> Result<&mut Self, http::Error> {
        let cookie = HeaderValue::from_str(&format!("{name}={value}; Path=/"))?;
        self.response.headers.append(SET_COOKIE, cookie);
        Ok(self)
    }

    /// Replace the response body without touching headers or status.
    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.response.body = body.into();
        self
    }

    /// Send raw bytes and end the chain.
    pub fn send(&mut self, body: impl Into<Bytes>) -> HandlerResult {
        self.set_body(body);
        Ok(Flow::Done)
    }

    /// Send text (`text/plain` unless a content type was set) and end the chain.
    pub fn send_string(&mut self, body: impl Into<String>) -> HandlerResult {
        self.response.default_content_type(TEXT_PLAIN);
        self.send(body.into())
    }

    /// Send `status` with its reason phrase as the body and end the chain.
    pub fn send_status(&mut self, status: StatusCode) -> HandlerResult {
        self.status(status);
        self.send_string(status.canonical_reason().unwrap_or_default())
    }

    /// Serialize `value` as the JSON response body and end the chain.
    ///
    /// # Errors
    ///
    /// A serialization failure is returned as the handler's error.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.send(body)
    }

    /// Pass control to the next handler in the chain.
    pub fn next(&self) -> HandlerResult {
        Ok(Flow::Next)
    }

    /// Returns whether the error handler already ran, and marks it as run.
    pub(crate) fn mark_error_handled(&mut self) -> bool {
        std::mem::replace(&mut self.error_handled, true)
    }

    pub(crate) fn into_response(self) -> Response<Bytes> {
        let head_only = self.method == Method::HEAD;
        self.response.into_http(head_only)
    }
}

fn content_type(headers: &HeaderMap) -> Option<mime::Mime> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn decode_form(headers: &HeaderMap, body: &Bytes) -> Result<Form, DecodeError> {
    let Some(mime) = content_type(headers) else {
        return Ok(Form::default());
    };
    if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        return Ok(parse_urlencoded(body));
    }
    if mime.essence_str() == mime::MULTIPART_FORM_DATA.essence_str() {
        let boundary = mime
            .get_param(mime::BOUNDARY)
            .map(|b| b.as_str())
            .filter(|b| !b.is_empty())
            .ok_or(DecodeError::MissingBoundary)?;
        return parse_multipart(body, boundary);
    }
    Ok(Form::default())
}

/// Rebuild a stored form decoding error for another caller.
fn replay(err: &DecodeError) -> DecodeError {
    match err {
        DecodeError::MissingBoundary => DecodeError::MissingBoundary,
        DecodeError::MalformedMultipart(msg) => DecodeError::MalformedMultipart(msg.clone()),
        other => DecodeError::MalformedMultipart(other.to_string()),
    }
}
