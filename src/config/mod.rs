use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::{
    error::{Error, Result},
    filters::StatusCodeFilter,
    formatter::FormatterOptions,
    templates::{DEFAULT_REQUEST_TEMPLATE, DEFAULT_RESPONSE_TEMPLATE},
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";
pub const ENV_PREFIX: &str = "TRAFFICLOG";
/// Largest body, in bytes, the middleware reads into memory to log it.
pub const DEFAULT_MAX_BUFFERED_BODY: usize = 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub debug_log: DebugLogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    #[default]
    Tracing,
    Stderr,
    Stdout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Request,
    Response,
}

impl ChannelKind {
    fn response() -> Self {
        ChannelKind::Response
    }

    fn request() -> Self {
        ChannelKind::Request
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSettings {
    /// Drop responses with these comma-separated status codes.
    StatusCode {
        #[serde(default = "ChannelKind::response")]
        channel: ChannelKind,
        status_codes: String,
    },
    Path {
        #[serde(default = "ChannelKind::request")]
        channel: ChannelKind,
        regex: String,
        #[serde(default)]
        exclude: bool,
    },
    Attribute {
        channel: ChannelKind,
        field: String,
        regex: String,
        #[serde(default)]
        exclude: bool,
    },
}

impl FilterSettings {
    pub fn channel(&self) -> ChannelKind {
        match self {
            FilterSettings::StatusCode { channel, .. }
            | FilterSettings::Path { channel, .. }
            | FilterSettings::Attribute { channel, .. } => *channel,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            FilterSettings::StatusCode { status_codes, .. } => {
                StatusCodeFilter::parse(status_codes)?;
            }
            FilterSettings::Path { regex, .. } | FilterSettings::Attribute { regex, .. } => {
                Regex::new(regex).map_err(|err| Error::InvalidFilter(err.to_string()))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugLogSettings {
    pub enable_requests: bool,
    pub enable_responses: bool,
    pub level: String,
    pub pretty_print: bool,
    pub request_template: Option<String>,
    pub request_template_name: Option<String>,
    pub response_template: Option<String>,
    pub response_template_name: Option<String>,
    /// Directory searched for named templates before the built-in ones.
    pub template_dir: Option<String>,
    pub request_handler: HandlerKind,
    pub response_handler: HandlerKind,
    pub colors: bool,
    pub limit_body: Option<usize>,
    /// Bodies declaring a larger size, or no size at all, are passed on
    /// unread and logged as a placeholder.
    pub max_buffered_body: usize,
    /// Turns off the framework's own per-request access log.
    pub disable_downstream_access_log: bool,
    pub filters: Vec<FilterSettings>,
}

impl Default for DebugLogSettings {
    fn default() -> Self {
        Self {
            enable_requests: true,
            enable_responses: true,
            level: "DEBUG".to_string(),
            pretty_print: false,
            request_template: None,
            request_template_name: None,
            response_template: None,
            response_template_name: None,
            template_dir: None,
            request_handler: HandlerKind::Tracing,
            response_handler: HandlerKind::Tracing,
            colors: true,
            limit_body: None,
            max_buffered_body: DEFAULT_MAX_BUFFERED_BODY,
            disable_downstream_access_log: false,
            filters: Vec::new(),
        }
    }
}

impl DebugLogSettings {
    /// The channel level. Python-style `WARNING` and `CRITICAL` are accepted
    /// next to tracing's own names.
    pub fn level(&self) -> Result<Level> {
        let name = self.level.trim().to_ascii_uppercase();
        let name = match name.as_str() {
            "WARNING" => "WARN",
            "CRITICAL" | "FATAL" => "ERROR",
            other => other,
        };
        Level::from_str(name).map_err(|_| Error::InvalidLevel(self.level.clone()))
    }

    pub fn validate(&self) -> Result<()> {
        self.level()?;
        if self.request_template.is_some() && self.request_template_name.is_some() {
            return Err(Error::ConflictingTemplate);
        }
        if self.response_template.is_some() && self.response_template_name.is_some() {
            return Err(Error::ConflictingTemplate);
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        Ok(())
    }

    /// Formatter options for one channel. Without an inline template the
    /// named one is used, defaulting to the built-in template.
    pub fn formatter_options(&self, channel: ChannelKind) -> FormatterOptions {
        let (template, template_name, default_name) = match channel {
            ChannelKind::Request => (
                &self.request_template,
                &self.request_template_name,
                DEFAULT_REQUEST_TEMPLATE,
            ),
            ChannelKind::Response => (
                &self.response_template,
                &self.response_template_name,
                DEFAULT_RESPONSE_TEMPLATE,
            ),
        };

        let options = match template {
            Some(template) => FormatterOptions::inline(template.clone()),
            None => FormatterOptions::named(
                template_name.clone().unwrap_or_else(|| default_name.to_string()),
            ),
        };
        options
            .pretty(self.pretty_print)
            .limit_body(self.limit_body)
            .colors(self.colors)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CONFIG_PATH")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.debug_log.validate()?;
        Ok(config)
    }
}
