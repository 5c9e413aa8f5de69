//! CSV output

use serde_json::Value;
use std::borrow::Cow;
use std::path::PathBuf;

use crate::ExportRow;

pub mod csv;

/// CSV generation errors
#[derive(Debug, thiserror::Error)]
pub enum CsvGenerationError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Written file is missing or too small to hold a complete export
    #[error("integrity check failed for {}: {size} bytes, expected more than {min_size}", .path.display())]
    IntegrityError {
        /// Output path
        path: PathBuf,
        /// Observed size (0 if the file is missing)
        size: u64,
        /// Size the file must exceed
        min_size: u64,
    },
}

/// Result type for CSV output operations
pub type CsvResult<T> = Result<T, CsvGenerationError>;

/// One output column: header text and the row field it is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Header cell
    pub header: &'static str,
    /// Field key passed to [`CsvRow::field`]
    pub field: &'static str,
}

impl Column {
    /// Create a column
    pub const fn new(header: &'static str, field: &'static str) -> Self {
        Self { header, field }
    }
}

/// Ordered column list defining CSV layout
pub type ColumnSchema = [Column];

/// A row whose fields can be looked up by key
pub trait CsvRow {
    /// Cell text for `key`; `None` renders as an empty cell
    fn field(&self, key: &str) -> Option<Cow<'_, str>>;
}

impl CsvRow for ExportRow {
    fn field(&self, key: &str) -> Option<Cow<'_, str>> {
        let value = match key {
            "candidate_id" => Some(&self.candidate_id),
            "first_name" => self.first_name.as_ref(),
            "last_name" => self.last_name.as_ref(),
            "email" => self.email.as_ref(),
            "job_application_id" => Some(&self.job_application_id),
            "job_application_created_at" => Some(&self.job_application_created_at),
            _ => None,
        };
        value.map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl CsvRow for serde_json::Map<String, Value> {
    fn field(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}
