//! Export command implementation

use crate::cache::DatasetCache;
use crate::config::{ApiConfig, DEFAULT_PAGE_SIZE};
use crate::exporter::{ExportArtifact, ExportMode, ExportPayload, Exporter};
use crate::fetcher::http::ApiHttpClient;
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::CliError;

/// Public API endpoint used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://api.teamtailor.com/v1/";

/// Largest page the API serves
const MAX_PAGE_SIZE: u32 = 30;

/// Parse and validate the page bound
fn parse_max_pages(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("max-pages must be at least 1".to_string());
    }
    Ok(value)
}

/// Recruiting export CLI
#[derive(Parser, Debug)]
#[command(name = "recruiting-export")]
#[command(about = "Export job applications joined with their candidates to CSV", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// API base URL
    #[arg(long, global = true, env = "TEAMTAILOR_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// API token
    #[arg(long, global = true, env = "TEAMTAILOR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl Cli {
    /// Build the API configuration from the global flags
    pub fn api_config(&self, page_size: u32) -> Result<ApiConfig, CliError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::ConfigurationError(
                    "API key is required (--api-key or TEAMTAILOR_API_KEY)".to_string(),
                )
            })?;

        Url::parse(&self.base_url).map_err(|e| {
            CliError::ConfigurationError(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;

        Ok(ApiConfig::new(self.base_url.as_str(), api_key).with_page_size(page_size))
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export job applications with their candidates as CSV
    Export(ExportArgs),
}

/// Export command arguments
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Write the CSV into this directory instead of returning it inline
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Fail instead of following more than this many pages
    #[arg(long, value_parser = parse_max_pages)]
    pub max_pages: Option<usize>,

    /// Records requested per page (1-30)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64))]
    pub page_size: u32,
}

impl ExportArgs {
    /// Export mode selected by the arguments
    pub fn mode(&self) -> ExportMode {
        match &self.output_dir {
            Some(output_dir) => ExportMode::File {
                output_dir: output_dir.clone(),
            },
            None => ExportMode::InMemory,
        }
    }

    /// Execute the export command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let config = cli.api_config(self.page_size)?;
        info!("Exporting from {}", config.base_url);

        let fetcher = Arc::new(ApiHttpClient::from_config(&config));
        let cache = Arc::new(DatasetCache::new());
        let exporter = Exporter::new(config, fetcher, cache, self.mode()).with_max_pages(self.max_pages);

        let artifact = exporter.run_export().await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&artifact),
            OutputFormat::Human => output_human(&artifact),
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// JSON report: the download payload for inline exports, the path otherwise
fn json_report(artifact: &ExportArtifact) -> Result<String, CliError> {
    let report = match artifact {
        ExportArtifact::Bytes(bytes) => {
            serde_json::to_value(ExportPayload::new(bytes, &chrono::Local::now()))?
        }
        ExportArtifact::File(path) => serde_json::json!({
            "success": true,
            "output_path": path.display().to_string(),
        }),
    };
    Ok(serde_json::to_string(&report)?)
}

fn output_json(artifact: &ExportArtifact) -> Result<(), CliError> {
    println!("{}", json_report(artifact)?);
    Ok(())
}

fn output_human(artifact: &ExportArtifact) -> Result<(), CliError> {
    match artifact {
        ExportArtifact::Bytes(bytes) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        ExportArtifact::File(path) => {
            println!("\nExport completed successfully!");
            println!("Output: {}", path.display());
        }
    }
    Ok(())
}
