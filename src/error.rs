use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("formatter requires a template or template_name setting")]
    MissingTemplate,

    #[error("template and template_name are mutually exclusive")]
    ConflictingTemplate,

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("failed to read template {name}: {source}")]
    TemplateIo {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("invalid status code list: {0:?}")]
    InvalidStatusCodes(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
