//! Wires settings into the two log channels the middleware writes to.

use std::sync::Arc;

use tracing::{info, Level};

use crate::{
    channel::{Channel, Handler, StreamHandler, TracingHandler},
    config::{ChannelKind, DebugLogSettings, FilterSettings, HandlerKind, DEFAULT_MAX_BUFFERED_BODY},
    error::Result,
    filters::{AttributeFilter, Filter, PathFilter, StatusCodeFilter},
    formatter::Formatter,
    templates::{BuiltinTemplates, DirectoryTemplates, TemplateStore},
};

/// The request and response channels, shared read-only by the middleware.
#[derive(Debug)]
pub struct DebugLogger {
    pub request: Channel,
    pub response: Channel,
    /// Bodies larger than this are logged as a placeholder instead of read.
    pub max_buffered_body: usize,
}

impl DebugLogger {
    pub fn new(request: Channel, response: Channel) -> Self {
        Self {
            request,
            response,
            max_buffered_body: DEFAULT_MAX_BUFFERED_BODY,
        }
    }

    pub fn with_max_buffered_body(mut self, max: usize) -> Self {
        self.max_buffered_body = max;
        self
    }

    pub fn from_settings(settings: &DebugLogSettings) -> Result<Self> {
        settings.validate()?;
        let level = settings.level()?;

        let store: Arc<dyn TemplateStore> = match &settings.template_dir {
            Some(dir) => Arc::new(DirectoryTemplates::new(dir)),
            None => Arc::new(BuiltinTemplates),
        };

        let request_formatter =
            Formatter::new(settings.formatter_options(ChannelKind::Request), store.clone())?;
        let response_formatter =
            Formatter::new(settings.formatter_options(ChannelKind::Response), store)?;

        let mut request = Channel::request()
            .with_level(level)
            .enabled(settings.enable_requests)
            .with_handler(build_handler(settings.request_handler, request_formatter, level));
        let mut response = Channel::response()
            .with_level(level)
            .enabled(settings.enable_responses)
            .with_handler(build_handler(settings.response_handler, response_formatter, level));

        for filter_settings in &settings.filters {
            let filter = build_filter(filter_settings)?;
            match filter_settings.channel() {
                ChannelKind::Request => request = request.with_filter(filter),
                ChannelKind::Response => response = response.with_filter(filter),
            }
        }

        info!(
            requests = settings.enable_requests,
            responses = settings.enable_responses,
            level = %level,
            pretty = settings.pretty_print,
            filters = settings.filters.len(),
            max_buffered_body = settings.max_buffered_body,
            "Debug request/response logging configured"
        );

        Ok(Self::new(request, response).with_max_buffered_body(settings.max_buffered_body))
    }
}

fn build_handler(kind: HandlerKind, formatter: Formatter, level: Level) -> Arc<dyn Handler> {
    match kind {
        HandlerKind::Tracing => Arc::new(TracingHandler::new(formatter).with_level(level)),
        HandlerKind::Stderr => Arc::new(StreamHandler::stderr(formatter).with_level(level)),
        HandlerKind::Stdout => Arc::new(StreamHandler::stdout(formatter).with_level(level)),
    }
}

fn build_filter(settings: &FilterSettings) -> Result<Arc<dyn Filter>> {
    let filter: Arc<dyn Filter> = match settings {
        FilterSettings::StatusCode { status_codes, .. } => {
            Arc::new(StatusCodeFilter::parse(status_codes)?)
        }
        FilterSettings::Path { regex, exclude, .. } => {
            Arc::new(PathFilter::new(regex.clone()).exclude(*exclude))
        }
        FilterSettings::Attribute {
            field,
            regex,
            exclude,
            ..
        } => Arc::new(AttributeFilter::new(field.clone(), regex.clone()).exclude(*exclude)),
    };
    Ok(filter)
}
