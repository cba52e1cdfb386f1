//! Captured requests and responses, and the records that carry them through
//! a log channel.

use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{request, response, HeaderMap, Method, Request, Response, StatusCode, Uri, Version},
};
use chrono::{DateTime, Utc};
use tracing::Level;

pub const REQUEST_CHANNEL: &str = "request";
pub const RESPONSE_CHANNEL: &str = "response";

/// Reason phrase reported for status codes without a registered one.
pub const UNKNOWN_REASON: &str = "Unknown Status Code";

/// An incoming request as handed to the request channel.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: CapturedBody,
}

impl CapturedRequest {
    pub fn from_parts(parts: &request::Parts, body: Bytes) -> Self {
        Self::with_body(parts, CapturedBody::Buffered(body))
    }

    /// A request whose body was passed on without being read. `size` is the
    /// declared length, if any.
    pub fn unbuffered(parts: &request::Parts, size: Option<u64>) -> Self {
        Self::with_body(parts, CapturedBody::unbuffered(size))
    }

    fn with_body(parts: &request::Parts, body: CapturedBody) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: parts.headers.clone(),
            body,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }
}

impl<B: Into<Bytes>> From<Request<B>> for CapturedRequest {
    fn from(request: Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(&parts, body.into())
    }
}

#[derive(Debug, Clone)]
pub enum CapturedBody {
    Buffered(Bytes),
    /// A one-shot stream the logger must not consume.
    Streaming,
    /// Declared length above the buffering cap; left unread.
    Oversized(u64),
}

impl CapturedBody {
    pub fn unbuffered(size: Option<u64>) -> Self {
        size.map_or(CapturedBody::Streaming, CapturedBody::Oversized)
    }

    pub fn buffered(&self) -> Option<&Bytes> {
        match self {
            CapturedBody::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// An outgoing response as handed to the response channel.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: CapturedBody,
    /// Method of the request this response answers, when known.
    pub method: Option<Method>,
}

impl CapturedResponse {
    pub fn from_parts(parts: &response::Parts, body: Bytes, method: Option<Method>) -> Self {
        Self::with_body(parts, CapturedBody::Buffered(body), method)
    }

    pub fn streaming(parts: &response::Parts, method: Option<Method>) -> Self {
        Self::with_body(parts, CapturedBody::Streaming, method)
    }

    /// A response whose body was passed on without being read.
    pub fn unbuffered(parts: &response::Parts, size: Option<u64>, method: Option<Method>) -> Self {
        Self::with_body(parts, CapturedBody::unbuffered(size), method)
    }

    pub fn from_response<B: Into<Bytes>>(response: Response<B>, method: Option<Method>) -> Self {
        let (parts, body) = response.into_parts();
        Self::from_parts(&parts, body.into(), method)
    }

    fn with_body(parts: &response::Parts, body: CapturedBody, method: Option<Method>) -> Self {
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers.clone(),
            body,
            method,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn reason_phrase(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or(UNKNOWN_REASON)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, CapturedBody::Streaming)
    }
}

/// Payload of a log record.
#[derive(Debug, Clone)]
pub enum Message {
    Request(Arc<CapturedRequest>),
    Response(Arc<CapturedResponse>),
}

impl Message {
    /// Looks up a named attribute of the logged object, as filters see it.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match self {
            Message::Request(request) => match name {
                "method" => Some(request.method.to_string()),
                "path" => Some(request.path().to_owned()),
                "query_string" => request.query().map(str::to_owned),
                _ => None,
            },
            Message::Response(response) => match name {
                "status_code" => Some(response.status_code().to_string()),
                "reason_phrase" => Some(response.reason_phrase().to_owned()),
                "method" => response.method.as_ref().map(Method::to_string),
                _ => None,
            },
        }
    }
}

impl From<CapturedRequest> for Message {
    fn from(request: CapturedRequest) -> Self {
        Message::Request(Arc::new(request))
    }
}

impl From<CapturedResponse> for Message {
    fn from(response: CapturedResponse) -> Self {
        Message::Response(Arc::new(response))
    }
}

#[derive(Debug, Clone)]
pub struct LogRecord {
    pub channel: &'static str,
    pub level: Level,
    pub created: DateTime<Utc>,
    pub message: Message,
}

impl LogRecord {
    pub fn new(channel: &'static str, level: Level, message: impl Into<Message>) -> Self {
        Self {
            channel,
            level,
            created: Utc::now(),
            message: message.into(),
        }
    }
}
