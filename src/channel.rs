//! Log channels and their handlers.
//!
//! Two channels exist, `request` and `response`. Each has a level, optional
//! filters and a list of handlers; every handler owns the [`Formatter`] that
//! turns a record into text.

use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex},
};

use tracing::Level;

use crate::{
    filters::Filter,
    formatter::Formatter,
    message::{LogRecord, Message, REQUEST_CHANNEL, RESPONSE_CHANNEL},
};

pub trait Handler: fmt::Debug + Send + Sync {
    /// Most verbose level this handler accepts.
    fn level(&self) -> Level {
        Level::TRACE
    }

    fn handle(&self, record: &LogRecord);
}

pub struct Channel {
    name: &'static str,
    level: Level,
    enabled: bool,
    filters: Vec<Arc<dyn Filter>>,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Channel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            level: Level::DEBUG,
            enabled: true,
            filters: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn request() -> Self {
        Self::new(REQUEST_CHANNEL)
    }

    pub fn response() -> Self {
        Self::new(RESPONSE_CHANNEL)
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Whether a record at `level` would reach any handler, filters aside.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        self.enabled
            && level <= self.level
            && self.handlers.iter().any(|handler| level <= handler.level())
    }

    pub fn log(&self, level: Level, message: impl Into<Message>) {
        if !self.is_enabled_for(level) {
            return;
        }
        let record = LogRecord::new(self.name, level, message);
        if !self.filters.iter().all(|filter| filter.filter(&record)) {
            return;
        }
        for handler in &self.handlers {
            if level <= handler.level() {
                handler.handle(&record);
            }
        }
    }

    pub fn debug(&self, message: impl Into<Message>) {
        self.log(Level::DEBUG, message);
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("enabled", &self.enabled)
            .field("filters", &self.filters.len())
            .field("handlers", &self.handlers)
            .finish()
    }
}

// Formatted lines end in whatever the template leaves; sinks add their own.
fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Forwards formatted records to `tracing`, under the targets
/// `trafficlog::request` and `trafficlog::response`.
#[derive(Debug)]
pub struct TracingHandler {
    formatter: Formatter,
    level: Level,
}

impl TracingHandler {
    pub fn new(formatter: Formatter) -> Self {
        Self {
            formatter,
            level: Level::TRACE,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

macro_rules! emit {
    ($target:literal, $level:expr, $line:expr) => {
        match $level {
            Level::ERROR => tracing::error!(target: $target, "{}", $line),
            Level::WARN => tracing::warn!(target: $target, "{}", $line),
            Level::INFO => tracing::info!(target: $target, "{}", $line),
            Level::DEBUG => tracing::debug!(target: $target, "{}", $line),
            _ => tracing::trace!(target: $target, "{}", $line),
        }
    };
}

impl Handler for TracingHandler {
    fn level(&self) -> Level {
        self.level
    }

    fn handle(&self, record: &LogRecord) {
        let line = self.formatter.format(record);
        let line = trim_line(&line);
        match record.channel {
            REQUEST_CHANNEL => emit!("trafficlog::request", record.level, line),
            _ => emit!("trafficlog::response", record.level, line),
        }
    }
}

/// Writes formatted records, one per line, to a stream.
pub struct StreamHandler {
    formatter: Formatter,
    level: Level,
    stream: Mutex<Box<dyn Write + Send>>,
}

impl StreamHandler {
    pub fn new(formatter: Formatter, stream: Box<dyn Write + Send>) -> Self {
        Self {
            formatter,
            level: Level::TRACE,
            stream: Mutex::new(stream),
        }
    }

    pub fn stderr(formatter: Formatter) -> Self {
        Self::new(formatter, Box::new(io::stderr()))
    }

    pub fn stdout(formatter: Formatter) -> Self {
        Self::new(formatter, Box::new(io::stdout()))
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandler")
            .field("formatter", &self.formatter)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Handler for StreamHandler {
    fn level(&self) -> Level {
        self.level
    }

    fn handle(&self, record: &LogRecord) {
        let line = self.formatter.format(record);
        if let Ok(mut stream) = self.stream.lock() {
            let written = writeln!(stream, "{}", trim_line(&line)).and_then(|_| stream.flush());
            if let Err(err) = written {
                tracing::error!(channel = record.channel, error = %err, "failed to write log record");
            }
        }
    }
}

/// Keeps every record it receives, with its formatted text.
///
/// Clones share the same buffer, so a test can hand one clone to a channel
/// and inspect another.
#[derive(Debug, Clone)]
pub struct MemoryHandler {
    formatter: Arc<Formatter>,
    entries: Arc<Mutex<Vec<(LogRecord, String)>>>,
}

impl MemoryHandler {
    pub fn new(formatter: Formatter) -> Self {
        Self {
            formatter: Arc::new(formatter),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.entries
            .lock()
            .map(|entries| entries.iter().map(|(record, _)| record.clone()).collect())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.iter().map(|(_, line)| line.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Handler for MemoryHandler {
    fn handle(&self, record: &LogRecord) {
        let line = self.formatter.format(record);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((record.clone(), line));
        }
    }
}
