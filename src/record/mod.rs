//! Typed records at the storage boundary.
//!
//! Persistence itself lives in an external storage layer; what crosses the
//! boundary here is typed. Rows arrive as loose JSON and decode into
//! records up front, so a shape mismatch is an immediate
//! [`RecordError::Decode`] naming the entity, not a missing field
//! surfacing somewhere downstream. The same applies on the way in: seed
//! manifests are validated entry by entry before any record is minted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Storage-boundary failures.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A row's shape did not match the expected record.
    #[error("failed to decode {entity} row: {source}")]
    Decode {
        /// Record type being decoded.
        entity: &'static str,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// A seed manifest could not be parsed.
    #[error("failed to parse seed manifest: {source}")]
    Manifest {
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A seed entry failed validation.
    #[error("invalid seed entry '{slug}': {source}")]
    InvalidSeed {
        /// Slug of the offending entry.
        slug: String,
        /// Field-level validation failures.
        source: validator::ValidationErrors,
    },
}

// ── Sources ─────────────────────────────────────────────────────────────────

/// Content family a source publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    /// Uncategorized documentation.
    #[default]
    General,
    /// Tooling and integration documentation.
    Tools,
    /// Datasets and data documentation.
    Data,
}

/// Fetch health of a tracked source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Fetched on schedule.
    Active,
    /// Excluded from fetching by an operator.
    Paused,
    /// Consecutive fetch failures crossed the backoff limit.
    Unreachable,
}

/// A tracked upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Source {
    /// Stable identity.
    pub id: Uuid,
    /// Human-readable name.
    #[validate(length(min = 1))]
    pub name: String,
    /// URL-safe identifier, unique per deployment.
    #[validate(length(min = 1))]
    pub slug: String,
    /// Host the source lives on.
    pub domain: String,
    /// Where the document is fetched from.
    #[validate(url)]
    pub source_url: String,
    /// Content family.
    pub category: SourceCategory,
    /// Fetch health.
    pub status: SourceStatus,
    /// Failures since the last successful fetch.
    pub consecutive_failures: u32,
    /// Message from the most recent failure, if any.
    pub last_error: Option<String>,
    /// When the source was registered.
    pub created_at: DateTime<Utc>,
    /// When the source last changed.
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Decode a storage row.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Decode`] when the row shape does not match.
    pub fn from_row(row: Value) -> Result<Self, RecordError> {
        serde_json::from_value(row).map_err(|source| RecordError::Decode {
            entity: "source",
            source,
        })
    }
}

// ── Snapshots ───────────────────────────────────────────────────────────────

/// One immutable fetched capture of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stable identity.
    pub id: Uuid,
    /// Source this capture belongs to.
    pub source_id: Uuid,
    /// Raw fetched body.
    pub content: String,
    /// SHA-256 hex digest of the body.
    pub content_hash: String,
    /// Body size in bytes.
    pub byte_size: u64,
    /// Number of lines in the body.
    pub line_count: u32,
    /// Count of http(s) link occurrences.
    pub link_count: u32,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Status code of the fetch.
    pub http_status: u16,
    /// Fetch latency.
    pub response_time_ms: u32,
    /// Score the scan verdict assigned to this capture.
    pub security_score: u32,
}

impl Snapshot {
    /// Decode a storage row.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Decode`] when the row shape does not match.
    pub fn from_row(row: Value) -> Result<Self, RecordError> {
        serde_json::from_value(row).map_err(|source| RecordError::Decode {
            entity: "snapshot",
            source,
        })
    }

    /// Assemble a fresh snapshot from a fetch outcome and its scan score.
    #[must_use]
    pub fn assemble(
        source_id: Uuid,
        content: String,
        http_status: u16,
        response_time_ms: u32,
        security_score: u32,
    ) -> Self {
        let meta = SnapshotMeta::measure(&content);
        Self {
            id: Uuid::new_v4(),
            source_id,
            content_hash: meta.content_hash,
            byte_size: meta.byte_size,
            line_count: meta.line_count,
            link_count: meta.link_count,
            fetched_at: Utc::now(),
            http_status,
            response_time_ms,
            security_score,
            content,
        }
    }
}

/// Derived measurements over a snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// SHA-256 hex digest of the body.
    pub content_hash: String,
    /// Body size in bytes.
    pub byte_size: u64,
    /// Number of lines.
    pub line_count: u32,
    /// Count of http(s) link occurrences.
    pub link_count: u32,
}

impl SnapshotMeta {
    /// Measure a snapshot body.
    #[must_use]
    pub fn measure(content: &str) -> Self {
        Self {
            content_hash: hex::encode(Sha256::digest(content.as_bytes())),
            byte_size: u64::try_from(content.len()).unwrap_or(u64::MAX),
            line_count: clamped(content.split('\n').count()),
            link_count: clamped(count_links(content)),
        }
    }
}

fn clamped(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn count_links(content: &str) -> usize {
    content.matches("http://").count() + content.matches("https://").count()
}

// ── Diffs ───────────────────────────────────────────────────────────────────

/// Line and link deltas between two consecutive snapshots of a source.
/// Computed by the external diffing layer; carried here only as a typed
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// Stable identity.
    pub id: Uuid,
    /// Source both snapshots belong to.
    pub source_id: Uuid,
    /// Older snapshot.
    pub previous_snapshot_id: Uuid,
    /// Newer snapshot.
    pub current_snapshot_id: Uuid,
    /// Lines present only in the newer snapshot.
    pub lines_added: u32,
    /// Lines present only in the older snapshot.
    pub lines_removed: u32,
    /// Links that appeared.
    pub links_added: Vec<String>,
    /// Links that disappeared.
    pub links_removed: Vec<String>,
    /// When the diff was computed.
    pub created_at: DateTime<Utc>,
}

impl Diff {
    /// Decode a storage row.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Decode`] when the row shape does not match.
    pub fn from_row(row: Value) -> Result<Self, RecordError> {
        serde_json::from_value(row).map_err(|source| RecordError::Decode {
            entity: "diff",
            source,
        })
    }
}

// ── Seeding ─────────────────────────────────────────────────────────────────

/// The TOML manifest an operator ships to first populate the source table.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedManifest {
    /// Sources to register.
    pub sources: Vec<SeedSource>,
}

/// One manifest entry. Becomes a full [`Source`] with fresh identity and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SeedSource {
    /// Human-readable name.
    #[validate(length(min = 1))]
    pub name: String,
    /// URL-safe identifier.
    #[validate(length(min = 1))]
    pub slug: String,
    /// Host the source lives on.
    pub domain: String,
    /// Where the document is fetched from.
    #[validate(url)]
    pub source_url: String,
    /// Content family, defaulting to general.
    #[serde(default)]
    pub category: SourceCategory,
}

impl SeedManifest {
    /// Parse a TOML manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Manifest`] on malformed TOML.
    pub fn parse(toml_text: &str) -> Result<Self, RecordError> {
        toml::from_str(toml_text).map_err(|source| RecordError::Manifest { source })
    }

    /// Validate every entry and mint full source records.
    ///
    /// Entries validate before anything is minted; the first invalid one
    /// rejects the whole manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidSeed`] naming the offending slug.
    pub fn into_sources(self) -> Result<Vec<Source>, RecordError> {
        let now = Utc::now();
        self.sources
            .into_iter()
            .map(|seed| {
                seed.validate().map_err(|source| RecordError::InvalidSeed {
                    slug: seed.slug.clone(),
                    source,
                })?;
                Ok(Source {
                    id: Uuid::new_v4(),
                    name: seed.name,
                    slug: seed.slug,
                    domain: seed.domain,
                    source_url: seed.source_url,
                    category: seed.category,
                    status: SourceStatus::Active,
                    consecutive_failures: 0,
                    last_error: None,
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect()
    }
}
