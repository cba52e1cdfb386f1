//! Record filters. A filter returns `true` to keep a record.

use std::fmt;

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

use crate::{
    error::{Error, Result},
    message::{LogRecord, Message},
};

pub trait Filter: fmt::Debug + Send + Sync {
    fn filter(&self, record: &LogRecord) -> bool;
}

/// Matches a regular expression against one attribute of the logged object.
///
/// Records whose object lacks the attribute are kept. Otherwise a record is
/// kept when the expression matches at the start of the value, or when it
/// does not match and `exclude` is set.
#[derive(Debug)]
pub struct AttributeFilter {
    field: String,
    pattern: String,
    exclude: bool,
    compiled: OnceCell<Option<Regex>>,
}

impl AttributeFilter {
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pattern: pattern.into(),
            exclude: false,
            compiled: OnceCell::new(),
        }
    }

    pub fn exclude(mut self, exclude: bool) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| match Regex::new(&self.pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(field = %self.field, pattern = %self.pattern, error = %err, "invalid filter regex, keeping all records");
                    None
                }
            })
            .as_ref()
    }

    fn matches(&self, value: &str) -> Option<bool> {
        let regex = self.regex()?;
        Some(regex.find(value).is_some_and(|found| found.start() == 0))
    }
}

impl Filter for AttributeFilter {
    fn filter(&self, record: &LogRecord) -> bool {
        let Some(value) = record.message.attribute(&self.field) else {
            return true;
        };
        match self.matches(&value) {
            Some(matched) => matched != self.exclude,
            None => true,
        }
    }
}

/// [`AttributeFilter`] on the request path.
#[derive(Debug)]
pub struct PathFilter(AttributeFilter);

impl PathFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(AttributeFilter::new("path", pattern))
    }

    pub fn exclude(self, exclude: bool) -> Self {
        Self(self.0.exclude(exclude))
    }
}

impl Filter for PathFilter {
    fn filter(&self, record: &LogRecord) -> bool {
        self.0.filter(record)
    }
}

/// Drops responses whose status code is in a disallowed set.
#[derive(Debug, Clone, Default)]
pub struct StatusCodeFilter {
    status_codes: Vec<u16>,
}

impl StatusCodeFilter {
    pub fn new(status_codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            status_codes: status_codes.into_iter().collect(),
        }
    }

    /// Parses a comma-separated list such as `"401,404"`. An empty string
    /// disallows nothing.
    pub fn parse(status_codes: &str) -> Result<Self> {
        if status_codes.trim().is_empty() {
            return Ok(Self::default());
        }
        let codes = status_codes
            .split(',')
            .map(|code| code.trim().parse::<u16>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidStatusCodes(status_codes.to_owned()))?;
        Ok(Self::new(codes))
    }

    pub fn status_codes(&self) -> &[u16] {
        &self.status_codes
    }
}

impl Filter for StatusCodeFilter {
    fn filter(&self, record: &LogRecord) -> bool {
        match &record.message {
            Message::Response(response) => !self.status_codes.contains(&response.status_code()),
            Message::Request(_) => true,
        }
    }
}
