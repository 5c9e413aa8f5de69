//! CLI error types and conversions

use crate::exporter::ExportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Report serialization error
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Writing the report to stdout failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
