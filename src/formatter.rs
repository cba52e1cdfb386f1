//! Renders log records through minijinja templates.

use std::{io::IsTerminal, sync::Arc};

use axum::http::HeaderMap;
use minijinja::{context, value::Value, AutoEscape, Environment, State};
use once_cell::sync::OnceCell;
use tracing::warn;

use crate::{
    error::{Error, Result},
    message::{CapturedRequest, CapturedResponse, LogRecord, Message},
    record::{BodyOptions, RequestRecord, ResponseRecord},
    templates::{BuiltinTemplates, TemplateStore},
};

/// Output of a template that could not be loaded or rendered.
pub const RENDER_FAILED: &str = "<template failed to render>";

const TEMPLATE_KEY: &str = "record";

#[derive(Debug, Clone)]
pub struct FormatterOptions {
    /// Inline template source.
    pub template: Option<String>,
    /// Name of a template in the formatter's store.
    pub template_name: Option<String>,
    pub pretty: bool,
    pub limit_body: Option<usize>,
    pub colors: bool,
    /// Use colors even when stderr is not a terminal.
    pub force_colors: bool,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            template: None,
            template_name: None,
            pretty: false,
            limit_body: None,
            colors: true,
            force_colors: false,
        }
    }
}

impl FormatterOptions {
    pub fn inline(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn named(template_name: impl Into<String>) -> Self {
        Self {
            template_name: Some(template_name.into()),
            ..Self::default()
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn limit_body(mut self, limit: Option<usize>) -> Self {
        self.limit_body = limit;
        self
    }

    pub fn colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    pub fn force_colors(mut self, force: bool) -> Self {
        self.force_colors = force;
        self
    }
}

/// Turns a [`LogRecord`] into a log line.
///
/// A named template is looked up on first use rather than at construction,
/// so a formatter can be built before its template store is populated. The
/// looked-up source and the compiled template are cached for the
/// formatter's lifetime.
#[derive(Debug, Clone)]
pub struct Formatter {
    template: Option<String>,
    template_name: Option<String>,
    store: Arc<dyn TemplateStore>,
    resolved: OnceCell<String>,
    environment: OnceCell<Environment<'static>>,
    pretty: bool,
    limit_body: Option<usize>,
    colors: bool,
}

impl Formatter {
    pub fn new(options: FormatterOptions, store: Arc<dyn TemplateStore>) -> Result<Self> {
        match (&options.template, &options.template_name) {
            (None, None) => return Err(Error::MissingTemplate),
            (Some(_), Some(_)) => return Err(Error::ConflictingTemplate),
            _ => {}
        }

        Ok(Self {
            template: options.template,
            template_name: options.template_name,
            store,
            resolved: OnceCell::new(),
            environment: OnceCell::new(),
            pretty: options.pretty,
            limit_body: options.limit_body,
            colors: options.colors && (options.force_colors || supports_color()),
        })
    }

    /// Formatter for an inline template, with the built-in template store.
    pub fn inline(template: impl Into<String>) -> Result<Self> {
        Self::new(FormatterOptions::inline(template), Arc::new(BuiltinTemplates))
    }

    pub fn pretty(&self) -> bool {
        self.pretty
    }

    pub fn limit_body(&self) -> Option<usize> {
        self.limit_body
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    /// The template source, loading a named template on first call.
    pub fn template_source(&self) -> Result<&str> {
        if let Some(template) = &self.template {
            return Ok(template);
        }
        let name = self.template_name.as_deref().ok_or(Error::MissingTemplate)?;
        self.resolved
            .get_or_try_init(|| {
                self.store
                    .load(name)?
                    .ok_or_else(|| Error::TemplateNotFound(name.to_owned()))
            })
            .map(String::as_str)
    }

    /// Renders the record. Never fails: a broken template produces
    /// [`RENDER_FAILED`] instead of taking the logging pipeline down.
    pub fn format(&self, record: &LogRecord) -> String {
        match self.render(record) {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    channel = record.channel,
                    template = self.template_name.as_deref().unwrap_or("<inline>"),
                    error = %err,
                    "template failed to render"
                );
                RENDER_FAILED.to_owned()
            }
        }
    }

    fn environment(&self) -> Result<&Environment<'static>> {
        self.environment.get_or_try_init(|| {
            let source = self.template_source()?.to_owned();
            let mut env = Environment::new();
            env.set_trim_blocks(true);
            env.set_auto_escape_callback(|_| AutoEscape::None);
            env.add_filter("colorize", colorize);
            env.add_template_owned(TEMPLATE_KEY, source)?;
            Ok(env)
        })
    }

    fn render(&self, record: &LogRecord) -> Result<String> {
        let template = self.environment()?.get_template(TEMPLATE_KEY)?;

        let options = BodyOptions {
            pretty: self.pretty,
            limit: self.limit_body,
        };
        let meta = record_value(record);
        let formatter = context! {
            pretty => self.pretty,
            colors => self.colors,
            limit_body => self.limit_body,
        };

        let ctx = match &record.message {
            Message::Request(request) => context! {
                entry => Value::from_object(RequestRecord::new(request.clone(), options)),
                request => raw_request(request),
                record => meta,
                formatter => formatter,
            },
            Message::Response(response) => context! {
                entry => Value::from_object(ResponseRecord::new(response.clone(), options)),
                response => raw_response(response),
                record => meta,
                formatter => formatter,
            },
        };
        Ok(template.render(ctx)?)
    }
}

fn record_value(record: &LogRecord) -> Value {
    context! {
        channel => record.channel,
        level => record.level.as_str(),
        created => record.created.to_rfc3339(),
        asctime => record.created.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

fn raw_request(request: &CapturedRequest) -> Value {
    context! {
        method => request.method.as_str(),
        uri => request.uri.to_string(),
        path => request.path(),
        query => request.query(),
        version => format!("{:?}", request.version),
        headers => raw_headers(&request.headers),
        body_length => request.body.buffered().map(|body| body.len()),
    }
}

fn raw_response(response: &CapturedResponse) -> Value {
    context! {
        status => response.status_code(),
        version => format!("{:?}", response.version),
        headers => raw_headers(&response.headers),
        streaming => response.is_streaming(),
    }
}

fn raw_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// `{{ value|colorize("red") }}`. A no-op unless the rendering formatter has
/// colors enabled.
fn colorize(state: &State, value: &Value, fg: &str) -> String {
    let enabled = state
        .lookup("formatter")
        .and_then(|formatter| formatter.get_attr("colors").ok())
        .is_some_and(|colors| colors.is_true());
    paint(&value.to_string(), fg, enabled)
}

fn paint(text: &str, fg: &str, enabled: bool) -> String {
    let code = match fg {
        "black" => 30,
        "red" => 31,
        "green" => 32,
        "yellow" => 33,
        "blue" => 34,
        "magenta" => 35,
        "cyan" => 36,
        "white" => 37,
        _ => return text.to_owned(),
    };
    if enabled {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_owned()
    }
}

fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    std::io::stderr().is_terminal()
}
