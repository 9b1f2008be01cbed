//! HTTP request boundary.
//!
//! [`RecallBoundary`] wraps a request handler with a recording sink. When the
//! handler answers with a failing status (>= 400 by default) the buffered
//! debug records are replayed, followed by one line describing the request:
//! method, url, headers, a size-capped payload snapshot and the status.
//!
//! The adapter is framework agnostic: it works on `http::Request<B>` where
//! `B: Read`, and the handler returns an `http::Response`.
//!
//! # Example
//! ```rust,ignore
//! let boundary = RecallBoundary::new()
//!     .with_request_body_capture(1024)
//!     .with_header_filter(redact_sensitive_headers);
//!
//! let response = boundary.serve(request, |ctx, req| handle(ctx, req));
//! ```

use crate::constants::{
    DEFAULT_BODY_CAPTURE_LIMIT, DEFAULT_REDACTION_REPLACEMENT, DEFAULT_SENSITIVE_HEADERS,
};
use crate::context::{Context, default_sink};
use crate::error::ConfigError;
use crate::format::MessageFormat;
use crate::logger::Logger;
use crate::recovery::guard;
use crate::sink::{Attr, BufferingSink, SinkRef, attr};
use http::header::HeaderValue;
use http::{HeaderMap, Request, Response, StatusCode};
use serde_json::{Map, Value};
use std::io::{self, Read};
use std::sync::{Arc, Mutex, PoisonError};

/// Transforms request headers before they are logged.
pub type HeaderFilter = Arc<dyn Fn(&HeaderMap) -> HeaderMap + Send + Sync>;

/// Decides whether a failing status code produces a recall.
pub type StatusFilter = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    total: usize,
}

/// Snapshot handle onto the bytes a [`CapturedBody`] has seen.
#[derive(Debug, Clone)]
pub struct BodySnapshot {
    limit: usize,
    captured: Arc<Mutex<Captured>>,
}

impl BodySnapshot {
    /// Renders the captured payload.
    ///
    /// A truncated payload is suffixed with `..(limit of total)`, so a four
    /// byte body `test` captured with limit 2 renders as `te..(2 of 4)`.
    pub fn recorded(&self) -> String {
        let captured = self.captured.lock().unwrap_or_else(PoisonError::into_inner);
        let text = String::from_utf8_lossy(&captured.bytes);
        if captured.bytes.len() < captured.total {
            format!("{}..({} of {})", text, self.limit, captured.total)
        } else {
            text.into_owned()
        }
    }

    /// Total number of bytes read through the body so far.
    pub fn bytes_read(&self) -> usize {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }
}

/// Request body reader that keeps a copy of the first `limit` bytes.
#[derive(Debug)]
pub struct CapturedBody<B> {
    inner: B,
    snapshot: BodySnapshot,
}

impl<B: Read> CapturedBody<B> {
    /// Wraps `inner`, capturing at most `limit` bytes.
    pub fn new(inner: B, limit: usize) -> Self {
        Self {
            inner,
            snapshot: BodySnapshot {
                limit,
                captured: Arc::new(Mutex::new(Captured::default())),
            },
        }
    }

    /// Returns a handle that outlives the reader.
    pub fn snapshot(&self) -> BodySnapshot {
        self.snapshot.clone()
    }

    /// Shorthand for `self.snapshot().recorded()`.
    pub fn recorded(&self) -> String {
        self.snapshot.recorded()
    }
}

impl<B: Read> Read for CapturedBody<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let mut captured = self
            .snapshot
            .captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let room = self.snapshot.limit.saturating_sub(captured.bytes.len());
        let keep = n.min(room);
        captured.bytes.extend_from_slice(&buf[..keep]);
        captured.total += n;
        Ok(n)
    }
}

/// Masks headers whose names contain a sensitive word.
///
/// Suitable as a [`RecallBoundary::with_header_filter`] argument.
pub fn redact_sensitive_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for (name, value) in out.iter_mut() {
        let lower = name.as_str().to_ascii_lowercase();
        if DEFAULT_SENSITIVE_HEADERS.iter().any(|s| lower.contains(s)) {
            *value = HeaderValue::from_static(DEFAULT_REDACTION_REPLACEMENT);
        }
    }
    out
}

fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        map.insert(name.as_str().to_string(), Value::Array(values));
    }
    Value::Object(map)
}

/// Request-boundary adapter using the recording strategy.
#[derive(Clone)]
pub struct RecallBoundary {
    format: MessageFormat,
    panic_recovery: bool,
    body_capture_limit: usize,
    header_filter: Option<HeaderFilter>,
    status_filter: Option<StatusFilter>,
    sink: Option<SinkRef>,
}

impl Default for RecallBoundary {
    fn default() -> Self {
        Self {
            format: MessageFormat::default(),
            panic_recovery: true,
            body_capture_limit: DEFAULT_BODY_CAPTURE_LIMIT,
            header_filter: None,
            status_filter: None,
            sink: None,
        }
    }
}

impl RecallBoundary {
    /// Creates a boundary with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the format applied to recalled messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMessageFormat`] unless the format holds
    /// exactly one `%s`.
    pub fn with_message_format(mut self, format: &str) -> Result<Self, ConfigError> {
        self.format = MessageFormat::new(format)?;
        Ok(self)
    }

    /// Enables or disables panic recovery. Default is enabled.
    ///
    /// A recovered panic flushes the buffer, logs an Error line and answers 500.
    pub fn with_panic_recovery(mut self, enabled: bool) -> Self {
        self.panic_recovery = enabled;
        self
    }

    /// Limits how many request-body bytes are kept for the failure log.
    pub fn with_request_body_capture(mut self, max_bytes: usize) -> Self {
        self.body_capture_limit = max_bytes;
        self
    }

    /// Sets a transformation applied to headers before they are logged.
    pub fn with_header_filter(
        mut self,
        filter: impl Fn(&HeaderMap) -> HeaderMap + Send + Sync + 'static,
    ) -> Self {
        self.header_filter = Some(Arc::new(filter));
        self
    }

    /// Restricts which failing status codes produce a recall.
    pub fn with_status_code_filter(
        mut self,
        filter: impl Fn(StatusCode) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.status_filter = Some(Arc::new(filter));
        self
    }

    /// Sets the sink to write to instead of the process default.
    pub fn with_sink(mut self, sink: SinkRef) -> Self {
        self.sink = Some(sink);
        self
    }

    fn filtered_headers(&self, headers: &HeaderMap) -> HeaderMap {
        match &self.header_filter {
            Some(filter) => filter(headers),
            None => headers.clone(),
        }
    }

    fn is_failure(&self, status: StatusCode) -> bool {
        let failed = status.as_u16() >= StatusCode::BAD_REQUEST.as_u16();
        failed && self.status_filter.as_ref().is_none_or(|filter| filter(status))
    }

    /// Serves `request` through `handler`.
    ///
    /// The handler receives a [`Context`] carrying a fresh recording sink and
    /// the request with its body wrapped in a [`CapturedBody`].
    pub fn serve<B, R, F>(&self, request: Request<B>, handler: F) -> Response<R>
    where
        B: Read,
        R: Default,
        F: FnOnce(Context, Request<CapturedBody<B>>) -> Response<R>,
    {
        let sink = self.sink.clone().unwrap_or_else(default_sink);
        let buffer = BufferingSink::new(Arc::clone(&sink), self.format.clone());
        let ctx = Context::background().with_sink(Arc::new(buffer.clone()));

        let (parts, body) = request.into_parts();
        let body = CapturedBody::new(body, self.body_capture_limit);
        let snapshot = body.snapshot();
        let summary = vec![
            attr("method", parts.method.as_str()),
            attr("url", parts.uri.to_string()),
            attr("headers", headers_to_value(&self.filtered_headers(&parts.headers))),
        ];
        let request = Request::from_parts(parts, body);

        let response = match guard(self.panic_recovery, || handler(ctx, request)) {
            Ok(response) => response,
            Err(panic) => {
                buffer.flush();
                let mut attrs = summary;
                attrs.extend([
                    attr("payload", snapshot.recorded()),
                    attr("status", StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
                    attr("err", panic.message),
                    attr("stack", panic.backtrace),
                ]);
                Logger::new(sink).error(self.format.apply("recovered from panic"), attrs);
                let mut response = Response::new(R::default());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return response;
            }
        };

        let status = response.status();
        if self.is_failure(status) {
            buffer.flush();
            let mut attrs: Vec<Attr> = summary;
            attrs.extend([
                attr("payload", snapshot.recorded()),
                attr("status", status.as_u16()),
            ]);
            Logger::new(sink).info(self.format.apply("HTTP request handling failed"), attrs);
        } else {
            buffer.discard();
        }
        response
    }
}

impl std::fmt::Debug for RecallBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecallBoundary")
            .field("format", &self.format)
            .field("panic_recovery", &self.panic_recovery)
            .field("body_capture_limit", &self.body_capture_limit)
            .finish_non_exhaustive()
    }
}
