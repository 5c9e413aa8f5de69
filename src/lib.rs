//! # Recruiting Export Library
//!
//! Exports job applications and their candidates from a JSON:API recruiting
//! backend into a flat CSV file.
//!
//! ## Pipeline
//!
//! - [`fetcher`] - Retrying HTTP fetcher and the paginated collector that walks `links.next`
//! - [`cache`] - Time-bounded memoization of the aggregated dataset
//! - [`transform`] - Joins job applications to their included candidates
//! - [`output`] - CSV rendering (in memory or to disk) with an integrity check
//! - [`exporter`] - Sequences the stages and maps failures to one export-level error
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use recruiting_export::cache::DatasetCache;
//! use recruiting_export::config::ApiConfig;
//! use recruiting_export::exporter::{ExportMode, Exporter};
//! use recruiting_export::fetcher::http::ApiHttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::new("https://api.teamtailor.com/v1/", "secret");
//! let client = Arc::new(ApiHttpClient::from_config(&config));
//! let exporter = Exporter::new(config, client, Arc::new(DatasetCache::new()), ExportMode::InMemory);
//!
//! let artifact = exporter.run_export().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Response cache
pub mod cache;

/// CLI command implementations
pub mod cli;

/// API configuration and constants
pub mod config;

/// Export orchestration
pub mod exporter;

/// HTTP fetching and pagination
pub mod fetcher;

/// CSV output
pub mod output;

/// Relational join of applications and candidates
pub mod transform;

/// Attribute map of a JSON:API resource, keys normalized to snake_case.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A single JSON:API resource object (primary or included)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Resource id
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Resource type (e.g. "job-applications", "candidates")
    #[serde(rename = "type", default)]
    pub record_type: String,
    /// Resource attributes
    #[serde(default, deserialize_with = "underscored_keys")]
    pub attributes: Attributes,
    /// Named links to other resources
    #[serde(default, deserialize_with = "underscored_keys")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Record {
    /// Id of the to-one resource linked under `relation`, if any.
    ///
    /// Returns `None` when the relationship is absent, its data is `null`,
    /// or it is a to-many link.
    pub fn related_id(&self, relation: &str) -> Option<&str> {
        match self.relationships.get(relation)?.data.as_ref()? {
            RelationshipData::One(reference) => reference.id.as_deref(),
            RelationshipData::Many(_) => None,
        }
    }

    /// String value of an attribute, if present and a string.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Relationship object of a JSON:API resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Resource linkage; `None` means no linked entity
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

/// Resource linkage: to-one or to-many
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// Multiple linked resources
    Many(Vec<RelationshipRef>),
    /// Single linked resource
    One(RelationshipRef),
}

/// Identifier of a linked resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRef {
    /// Linked resource id
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    /// Linked resource type
    #[serde(rename = "type", default)]
    pub ref_type: Option<String>,
}

/// One fetched page of the JSON:API collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    /// Top-level `data` records
    pub primary_records: Vec<Record>,
    /// Side-loaded `included` records
    pub included_records: Vec<Record>,
    /// Continuation link (`links.next`), `None` once exhausted
    pub next_page_ref: Option<String>,
}

/// Union of all fetched pages, in fetch order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDataset {
    /// Primary records across all pages
    pub primary_records: Vec<Record>,
    /// Included records across all pages
    pub included_records: Vec<Record>,
}

impl AggregatedDataset {
    /// Append a page's records after the ones already collected
    pub fn append_page(&mut self, page: PageResponse) {
        self.primary_records.extend(page.primary_records);
        self.included_records.extend(page.included_records);
    }
}

/// One flattened export row (a job application joined with its candidate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    /// Candidate id
    pub candidate_id: String,
    /// Candidate first name
    pub first_name: Option<String>,
    /// Candidate last name
    pub last_name: Option<String>,
    /// Candidate email
    pub email: Option<String>,
    /// Job application id
    pub job_application_id: String,
    /// Job application creation time, formatted `dd.mm.yyyy HH:MM:SS`
    pub job_application_created_at: String,
}

/// Convert a JSON:API member name (`first-name`) to snake_case (`first_name`)
pub fn underscore(key: &str) -> String {
    key.replace('-', "_")
}

fn underscored_keys<'de, D, M, V>(deserializer: D) -> Result<M, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
    M: FromIterator<(String, V)>,
{
    let raw: Option<BTreeMap<String, V>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (underscore(&key), value))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}
