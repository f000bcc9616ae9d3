use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SCHEMA_VERSION: u32 = 1;

/// Number of commits shown per page unless overridden on the command line.
pub const PAGE_SIZE: usize = 50;

/// Metrics reported by one successful analysis of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub project_name: String,
    pub roots: u64,
    pub crates: u64,
    pub modules: u64,
    pub declarations: u64,
    pub functions: u64,
    pub expressions: u64,
    pub unknown_types: u64,
    pub partial_unknown_types: u64,
    pub type_mismatches: u64,
    #[serde(with = "millis")]
    pub database_loaded_time: Duration,
    #[serde(with = "millis")]
    pub item_collection_time: Duration,
    #[serde(with = "millis")]
    pub inference_time: Duration,
    #[serde(with = "millis")]
    pub total_time: Duration,
}

/// A project whose analysis failed upstream. This is data, not a fetch error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFailure {
    pub project_name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatEntry {
    Success(ProjectStats),
    Failure(ProjectFailure),
}

impl StatEntry {
    pub fn project_name(&self) -> &str {
        match self {
            StatEntry::Success(s) => &s.project_name,
            StatEntry::Failure(f) => &f.project_name,
        }
    }

    pub fn as_success(&self) -> Option<&ProjectStats> {
        match self {
            StatEntry::Success(s) => Some(s),
            StatEntry::Failure(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitTotals {
    pub total_expressions: u64,
    pub total_unknown: u64,
    pub total_partial: u64,
    /// Percentage of expressions with unknown or partially unknown types.
    pub error_rate: f64,
}

/// Rolled-up statistics for one commit. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAggregate {
    pub timestamp: i64,
    pub commit_sha: String,
    pub stats: Vec<StatEntry>,
    #[serde(flatten)]
    pub totals: CommitTotals,
}

impl CommitAggregate {
    pub fn new(
        commit_sha: String,
        timestamp: i64,
        stats: Vec<StatEntry>,
    ) -> crate::error::Result<Self> {
        let totals = crate::aggregate::aggregate(&stats)?;
        Ok(Self {
            timestamp,
            commit_sha,
            stats,
            totals,
        })
    }

    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    pub fn short_sha(&self) -> &str {
        short_sha(&self.commit_sha)
    }
}

/// A commit whose statistics could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCommit {
    pub commit_sha: String,
    pub message: String,
}

/// The commit index: every known commit with its unix timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitIndex {
    pub commits: Vec<(String, i64)>,
}

impl CommitIndex {
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Newest first; equal timestamps fall back to the SHA so the order is total.
    pub fn sort_newest_first(&mut self) {
        self.commits
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_commits: usize,
    pub commits: Vec<CommitAggregate>,
    pub failed: Vec<FailedCommit>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub commit_sha: String,
    pub timestamp: i64,
    pub total_expressions: u64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub page: usize,
    pub page_count: usize,
    pub points: Vec<TrendPoint>,
}

impl From<&CommitAggregate> for TrendPoint {
    fn from(c: &CommitAggregate) -> Self {
        Self {
            commit_sha: c.commit_sha.clone(),
            timestamp: c.timestamp,
            total_expressions: c.totals.total_expressions,
            error_rate: c.totals.error_rate,
        }
    }
}

pub fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

/// Last path component of a project path, ignoring a trailing separator.
pub fn short_project_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(name)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(serde::de::Error::custom)
    }
}
