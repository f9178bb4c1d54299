//! Custom error types for the FIFA21 ETL pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Field-level
//! parse failures are collected per batch and surfaced together through
//! [`EtlError::ParseFailures`], so one run reports every offending cell.
//!
//! Errors are serializable so the CLI can emit them in its JSON output.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::cleaner::FieldError;

/// A single cell that could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldParseError {
    /// Zero-based row index in the source frame.
    pub row: usize,
    /// Source column name.
    pub column: String,
    /// Raw cell content.
    pub value: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl FieldParseError {
    pub fn new(row: usize, column: &str, value: &str, err: &FieldError) -> Self {
        Self {
            row,
            column: column.to_string(),
            value: value.to_string(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} column '{}' value {:?}: {}",
            self.row, self.column, self.value, self.reason
        )
    }
}

fn summarize(failures: &[FieldParseError]) -> String {
    match failures {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// The main error type for the ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// The input file does not exist.
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// One or more cells failed to parse; the batch is rejected.
    #[error("{} field(s) failed to parse: {}", .0.len(), summarize(.0))]
    ParseFailures(Vec<FieldParseError>),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A destination could not be written.
    #[error("Failed to write to {sink}: {reason}")]
    Sink { sink: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Database driver error wrapper.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EtlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::ParseFailures(_) => "PARSE_FAILURE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Sink { .. } => "SINK_FAILURE",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The parse failures carried by this error, looking through context wrappers.
    pub fn parse_failures(&self) -> Option<&[FieldParseError]> {
        match self {
            Self::ParseFailures(failures) => Some(failures),
            Self::WithContext { source, .. } => source.parse_failures(),
            _ => None,
        }
    }

    /// Wrap any displayable error as a sink failure.
    pub fn sink(sink: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }
}

impl Serialize for EtlError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EtlError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Polars(e).with_context(context))
    }
}
