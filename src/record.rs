//! Read-through views over a captured request or response.
//!
//! A record is built for one formatting call and dropped afterwards. Fields
//! are computed the first time a template asks for them and then cached, so
//! a template that never mentions `entry.body` never decodes the body.

use std::sync::Arc;

use minijinja::value::{Enumerator, Object, Value};
use once_cell::sync::OnceCell;

use crate::{
    body,
    headers::{self, HeaderSet, CONTENT_TYPE},
    message::{CapturedBody, CapturedRequest, CapturedResponse},
};

/// Shown instead of the content of a streaming response.
pub const STREAMING_PLACEHOLDER: &str = "<streaming response>";

/// Shown instead of a body too large to buffer.
pub fn oversized_placeholder(size: u64) -> String {
    format!("<body too large to log: {size} bytes>")
}

fn render_captured(captured: &CapturedBody, content_type: &str, options: BodyOptions) -> String {
    match captured {
        CapturedBody::Streaming => STREAMING_PLACEHOLDER.to_owned(),
        CapturedBody::Oversized(size) => oversized_placeholder(*size),
        CapturedBody::Buffered(bytes) => {
            body::render_body(bytes, content_type, options.pretty, options.limit)
        }
    }
}

/// The formatter options that shape how a body is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyOptions {
    pub pretty: bool,
    pub limit: Option<usize>,
}

#[derive(Debug)]
pub struct RequestRecord {
    request: Arc<CapturedRequest>,
    options: BodyOptions,
    headers: OnceCell<HeaderSet>,
    query_params: OnceCell<Vec<(String, String)>>,
    query_string: OnceCell<String>,
    body: OnceCell<String>,
}

impl RequestRecord {
    const FIELDS: &'static [&'static str] = &[
        "method",
        "path",
        "query_string",
        "query_params",
        "headers",
        "content_type",
        "body",
    ];

    pub fn new(request: Arc<CapturedRequest>, options: BodyOptions) -> Self {
        Self {
            request,
            options,
            headers: OnceCell::new(),
            query_params: OnceCell::new(),
            query_string: OnceCell::new(),
            body: OnceCell::new(),
        }
    }

    pub fn method(&self) -> &str {
        self.request.method.as_str()
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn query_params(&self) -> &[(String, String)] {
        self.query_params.get_or_init(|| {
            self.request
                .query()
                .and_then(|query| serde_urlencoded::from_str(query).ok())
                .unwrap_or_default()
        })
    }

    /// Empty when there are no parameters, otherwise `?` and the re-encoded
    /// parameters.
    pub fn query_string(&self) -> &str {
        self.query_string.get_or_init(|| {
            let params = self.query_params();
            if params.is_empty() {
                return String::new();
            }
            match serde_urlencoded::to_string(params) {
                Ok(encoded) => format!("?{encoded}"),
                Err(_) => format!("?{}", self.request.query().unwrap_or_default()),
            }
        })
    }

    pub fn headers(&self) -> &HeaderSet {
        self.headers
            .get_or_init(|| headers::collect_request_headers(&self.request.headers))
    }

    pub fn content_type(&self) -> &str {
        self.headers()
            .get(CONTENT_TYPE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn body(&self) -> &str {
        self.body.get_or_init(|| {
            render_captured(&self.request.body, self.content_type(), self.options)
        })
    }
}

impl Object for RequestRecord {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let value = match key.as_str()? {
            "method" => Value::from(self.method()),
            "path" => Value::from(self.path()),
            "query_string" => Value::from(self.query_string()),
            "query_params" => Value::from_serialize(self.query_params()),
            "headers" => Value::from_serialize(self.headers()),
            "content_type" => Value::from(self.content_type()),
            "body" => Value::from(self.body()),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(Self::FIELDS)
    }
}

#[derive(Debug)]
pub struct ResponseRecord {
    response: Arc<CapturedResponse>,
    options: BodyOptions,
    headers: OnceCell<HeaderSet>,
    content: OnceCell<String>,
}

impl ResponseRecord {
    const FIELDS: &'static [&'static str] = &[
        "status_code",
        "reason_phrase",
        "method",
        "headers",
        "content_type",
        "content",
    ];

    pub fn new(response: Arc<CapturedResponse>, options: BodyOptions) -> Self {
        Self {
            response,
            options,
            headers: OnceCell::new(),
            content: OnceCell::new(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.response.status_code()
    }

    pub fn reason_phrase(&self) -> &str {
        self.response.reason_phrase()
    }

    pub fn method(&self) -> Option<&str> {
        self.response.method.as_ref().map(|method| method.as_str())
    }

    pub fn headers(&self) -> &HeaderSet {
        self.headers
            .get_or_init(|| headers::collect_response_headers(&self.response.headers))
    }

    pub fn content_type(&self) -> &str {
        self.headers()
            .get(CONTENT_TYPE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        self.content.get_or_init(|| {
            render_captured(&self.response.body, self.content_type(), self.options)
        })
    }
}

impl Object for ResponseRecord {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let value = match key.as_str()? {
            "status_code" => Value::from(self.status_code()),
            "reason_phrase" => Value::from(self.reason_phrase()),
            "method" => self.method().map_or(Value::from(()), Value::from),
            "headers" => Value::from_serialize(self.headers()),
            "content_type" => Value::from(self.content_type()),
            "content" => Value::from(self.content()),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(Self::FIELDS)
    }
}
