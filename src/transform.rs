//! Relational join of job applications with their candidates
//!
//! Each primary record (a job application) is matched to the included
//! candidate named by its `candidate` relationship. Applications whose
//! candidate cannot be resolved are skipped, never reported as errors:
//! - the relationship is missing or `null` ([`SkipReason::MissingRelationship`])
//! - the linked candidate was not side-loaded ([`SkipReason::UnresolvedRelationship`])
//!
//! A malformed creation timestamp on a surviving application fails the whole join.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::{AggregatedDataset, Attributes, ExportRow, Record};

/// Relationship on a job application that points at its candidate
pub const CANDIDATE_RELATION: &str = "candidate";

/// Resource type of included candidate records
pub const CANDIDATE_TYPE: &str = "candidates";

/// Attribute holding the job application creation time
pub const CREATED_AT_ATTRIBUTE: &str = "created_at";

/// Output format of export timestamps
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Transform errors
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Creation timestamp missing or not ISO-8601
    #[error("parse error: invalid created_at {value:?} on job application {record_id}")]
    InvalidTimestamp {
        /// Job application id
        record_id: String,
        /// Raw attribute value, if present
        value: Option<String>,
    },
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Why an application produced no export row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No candidate linked
    MissingRelationship,
    /// Linked candidate absent from the included records
    UnresolvedRelationship,
}

/// Index of included candidates by id
pub struct CandidateIndex<'a> {
    candidates: HashMap<&'a str, &'a Attributes>,
}

impl<'a> CandidateIndex<'a> {
    /// Index included records of type `candidates`; other types are ignored.
    /// A repeated id keeps the last occurrence.
    pub fn build(included: &'a [Record]) -> Self {
        let candidates = included
            .iter()
            .filter(|record| record.record_type == CANDIDATE_TYPE)
            .map(|record| (record.id.as_str(), &record.attributes))
            .collect();

        Self { candidates }
    }

    /// Number of indexed candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no candidates were indexed
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Resolve the candidate linked from `application`
    pub fn resolve(&self, application: &'a Record) -> Result<(&'a str, &'a Attributes), SkipReason> {
        let candidate_id = application
            .related_id(CANDIDATE_RELATION)
            .ok_or(SkipReason::MissingRelationship)?;

        self.candidates
            .get(candidate_id)
            .map(|attributes| (candidate_id, *attributes))
            .ok_or(SkipReason::UnresolvedRelationship)
    }
}

/// Flatten the dataset into export rows, one per application with a resolvable
/// candidate, in primary-record order.
pub fn join(dataset: &AggregatedDataset) -> TransformResult<Vec<ExportRow>> {
    let index = CandidateIndex::build(&dataset.included_records);
    let mut rows = Vec::with_capacity(dataset.primary_records.len());
    let mut skipped = 0usize;

    for application in &dataset.primary_records {
        let (candidate_id, candidate) = match index.resolve(application) {
            Ok(resolved) => resolved,
            Err(reason) => {
                debug!(application_id = %application.id, ?reason, "Skipping application");
                skipped += 1;
                continue;
            }
        };

        let created_at = application.attribute_str(CREATED_AT_ATTRIBUTE);
        let formatted = created_at
            .and_then(format_timestamp)
            .ok_or_else(|| TransformError::InvalidTimestamp {
                record_id: application.id.clone(),
                value: created_at.map(str::to_string),
            })?;

        rows.push(ExportRow {
            candidate_id: candidate_id.to_string(),
            first_name: attribute_text(candidate, "first_name"),
            last_name: attribute_text(candidate, "last_name"),
            email: attribute_text(candidate, "email"),
            job_application_id: application.id.clone(),
            job_application_created_at: formatted,
        });
    }

    info!(
        rows = rows.len(),
        skipped,
        candidates = index.len(),
        "Joined applications with candidates"
    );

    Ok(rows)
}

/// Offset forms beyond RFC 3339: `+0100`, `+01`, and a space instead of `T`
const OFFSET_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Re-render an ISO-8601 timestamp as `dd.mm.yyyy HH:MM:SS` in its own offset.
///
/// The offset may be extended (`+01:00`), basic (`+0100`) or hours only (`+01`).
/// A timestamp without offset is taken as UTC.
pub fn format_timestamp(value: &str) -> Option<String> {
    let value = value.trim();

    let with_offset = DateTime::<FixedOffset>::parse_from_rfc3339(value).ok().or_else(|| {
        OFFSET_TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
    });
    if let Some(parsed) = with_offset {
        return Some(parsed.format(EXPORT_TIMESTAMP_FORMAT).to_string());
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc().format(EXPORT_TIMESTAMP_FORMAT).to_string())
}

fn attribute_text(attributes: &Attributes, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
