//! Export orchestration
//!
//! Runs the pipeline: collect all pages (through the cache), join applications
//! with candidates, render CSV.
//!
//! # Error Handling
//!
//! Fetch and transform failures are passed through with their original kind so
//! callers can tell "the source system failed" apart from "the artifact could
//! not be produced". Only CSV failures are translated, into
//! [`ExportError::ExportFailed`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::cache::DatasetCache;
use crate::config::{ApiConfig, CACHE_KEY, CACHE_TTL};
use crate::fetcher::pagination::PaginatedCollector;
use crate::fetcher::{FetcherError, FetcherResult, PageFetcher};
use crate::output::csv::{render, render_to_path};
use crate::output::{Column, CsvGenerationError};
use crate::transform::{self, TransformError};
use crate::AggregatedDataset;

/// Columns of the candidates export, in output order
pub const EXPORT_SCHEMA: [Column; 6] = [
    Column::new("Candidate ID", "candidate_id"),
    Column::new("First Name", "first_name"),
    Column::new("Last Name", "last_name"),
    Column::new("Email", "email"),
    Column::new("Job Application ID", "job_application_id"),
    Column::new("Job Application Created At", "job_application_created_at"),
];

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Upstream fetch failure, unchanged
    #[error(transparent)]
    Fetch(#[from] FetcherError),

    /// Join failure, unchanged
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The CSV artifact could not be produced
    #[error("{0}")]
    ExportFailed(String),
}

impl From<CsvGenerationError> for ExportError {
    fn from(err: CsvGenerationError) -> Self {
        ExportError::ExportFailed(format!("Failed to export data to CSV: {err}"))
    }
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Where the rendered CSV goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportMode {
    /// Return the CSV bytes
    InMemory,
    /// Write a timestamped file into `output_dir` and return its path
    File {
        /// Scratch directory for export files
        output_dir: PathBuf,
    },
}

/// Produced export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    /// CSV bytes
    Bytes(Vec<u8>),
    /// Path of the written CSV file
    File(PathBuf),
}

/// Export response body: file name and base64-encoded CSV content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPayload {
    /// Suggested download file name
    pub filename: String,
    /// Base64 (standard alphabet) of the CSV bytes
    pub content: String,
}

impl ExportPayload {
    /// Build a payload for `csv` generated at `now`
    pub fn new<Tz: TimeZone>(csv: &[u8], now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            filename: export_filename(now),
            content: STANDARD.encode(csv),
        }
    }

    /// Decode the CSV content
    pub fn decode_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.content)
    }
}

/// `candidates_export_<yyyy-mm-dd-HH-MM-SS-ZZZZ>.csv`, offset digits without sign
pub fn export_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let offset = now.format("%z").to_string();
    format!(
        "candidates_export_{}-{}.csv",
        now.format("%Y-%m-%d-%H-%M-%S"),
        offset.trim_start_matches(['+', '-'])
    )
}

/// Runs exports of job applications joined with candidates
pub struct Exporter {
    config: ApiConfig,
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<DatasetCache>,
    mode: ExportMode,
    cache_ttl: Duration,
    max_pages: Option<usize>,
}

impl Exporter {
    /// Create an exporter
    ///
    /// # Arguments
    /// * `config` - API settings (headers, start path)
    /// * `fetcher` - Page fetcher, usually an [`ApiHttpClient`](crate::fetcher::http::ApiHttpClient)
    /// * `cache` - Dataset cache shared between exports
    /// * `mode` - In-memory or file-backed output
    pub fn new(config: ApiConfig, fetcher: Arc<dyn PageFetcher>, cache: Arc<DatasetCache>, mode: ExportMode) -> Self {
        Self {
            config,
            fetcher,
            cache,
            mode,
            cache_ttl: CACHE_TTL,
            max_pages: None,
        }
    }

    /// Override the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Bound the number of pages fetched per export
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Output mode of this exporter
    pub fn mode(&self) -> &ExportMode {
        &self.mode
    }

    /// All applications and included candidates, served from the cache while fresh
    pub async fn fetch_dataset(&self) -> FetcherResult<AggregatedDataset> {
        let headers = self.config.request_headers();
        let start_path = self.config.start_path();
        let (headers, start_path) = (headers.as_slice(), start_path.as_str());
        let fetcher = self.fetcher.as_ref();
        let max_pages = self.max_pages;

        self.cache
            .fetch_or_compute(CACHE_KEY, self.cache_ttl, || async move {
                PaginatedCollector::new(fetcher)
                    .with_max_pages(max_pages)
                    .collect_all(start_path, headers)
                    .await
            })
            .await
    }

    /// Run the export and return the artifact for the configured mode
    pub async fn run_export(&self) -> ExportResult<ExportArtifact> {
        info!("Starting candidate export");

        let dataset = self.fetch_dataset().await?;
        let rows = transform::join(&dataset)?;

        let artifact = match &self.mode {
            ExportMode::InMemory => render(&rows, &EXPORT_SCHEMA).map(ExportArtifact::Bytes),
            ExportMode::File { output_dir } => {
                let path = output_dir.join(export_filename(&chrono::Local::now()));
                render_to_path(&rows, &EXPORT_SCHEMA, path).map(ExportArtifact::File)
            }
        }
        .map_err(|e| {
            error!("CSV export failed: {}", e);
            ExportError::from(e)
        })?;

        info!(rows = rows.len(), "Candidate export finished");
        Ok(artifact)
    }
}
