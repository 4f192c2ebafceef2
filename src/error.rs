// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// The text-extraction collaborator could not produce text at all.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read document text: {0}")]
    Source(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed rule configuration. Raised while a rule table is being built,
/// before any document is processed.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    #[error("unknown field name: {0}")]
    UnknownField(String),
    #[error("field '{field}': invalid pattern: {message}")]
    InvalidPattern { field: String, message: String },
    #[error("field '{field}': pattern has {found} capture group(s), expected {expected}")]
    CaptureGroups {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("role '{role}': field '{field}' declared more than once")]
    DuplicateField { role: String, field: String },
    #[error("field '{0}' must be declared through the line_items entry")]
    LineItemsAsScalar(String),
    #[error("compare field '{field}' is not declared for role '{role}'")]
    UndeclaredCompareField { role: String, field: String },
    #[error("field '{0}' declares different compare modes per role")]
    ConflictingCompareMode(String),
    #[error("rule table parse error: {0}")]
    Parse(String),
    #[error("cannot read rule table {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Failure of a downstream artifact (rendering or delivery). Recorded in the
/// outcome; never changes the verdict.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("overlay '{name}' unavailable at {path}: {source}")]
    Overlay {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("render task failed: {0}")]
    Task(String),
    #[error("notification failed: {0}")]
    Notify(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config edit error: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("config validation error: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
