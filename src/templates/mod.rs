//! Named-template storage.

use std::{
    collections::HashMap,
    fmt,
    io,
    path::{Component, Path, PathBuf},
};

use crate::error::{Error, Result};

pub const DEFAULT_REQUEST_TEMPLATE: &str = "default-request.txt";
pub const DEFAULT_RESPONSE_TEMPLATE: &str = "default-response.txt";

/// Looks up template sources by name. `Ok(None)` means the name is unknown.
pub trait TemplateStore: fmt::Debug + Send + Sync {
    fn load(&self, name: &str) -> Result<Option<String>>;
}

/// The templates shipped with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateStore for BuiltinTemplates {
    fn load(&self, name: &str) -> Result<Option<String>> {
        let source = match name {
            DEFAULT_REQUEST_TEMPLATE => include_str!("default-request.txt"),
            DEFAULT_RESPONSE_TEMPLATE => include_str!("default-response.txt"),
            _ => return Ok(None),
        };
        Ok(Some(source.to_owned()))
    }
}

/// Templates read from a directory, falling back to the built-in ones.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateStore for DirectoryTemplates {
    fn load(&self, name: &str) -> Result<Option<String>> {
        // names stay inside the root
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Ok(None);
        }

        match std::fs::read_to_string(self.root.join(relative)) {
            Ok(source) => Ok(Some(source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => BuiltinTemplates.load(name),
            Err(source) => Err(Error::TemplateIo {
                name: name.to_owned(),
                source,
            }),
        }
    }
}

/// In-memory templates, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: HashMap<String, String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }
}

impl TemplateStore for MemoryTemplates {
    fn load(&self, name: &str) -> Result<Option<String>> {
        Ok(self.templates.get(name).cloned())
    }
}
