use crate::error::{Result, StatsError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the commit index and per-commit stats files come from.
pub trait StatsSource {
    /// Raw bytes of the commit index (`commits.json`).
    fn fetch_index(&self) -> impl Future<Output = Result<Vec<u8>>>;

    /// Raw bytes of the stats file for one commit.
    fn fetch_stats(&self, sha: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Reads `commits.json` and `<sha>.json` from a data directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub const INDEX_FILE: &'static str = "commits.json";

    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, path: PathBuf) -> Result<Vec<u8>> {
        tokio::fs::read(&path)
            .await
            .map_err(|e| StatsError::fetch(path.display().to_string(), e))
    }
}

impl StatsSource for DirSource {
    async fn fetch_index(&self) -> Result<Vec<u8>> {
        self.read(self.root.join(Self::INDEX_FILE)).await
    }

    async fn fetch_stats(&self, sha: &str) -> Result<Vec<u8>> {
        if sha.is_empty() || !sha.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StatsError::fetch(
                format!("stats for commit '{sha}'"),
                io::Error::new(io::ErrorKind::InvalidInput, "invalid commit id"),
            ));
        }
        self.read(self.root.join(format!("{sha}.json"))).await
    }
}

struct MemoryCommit {
    timestamp: Value,
    stats: Option<Vec<u8>>,
    delay: Duration,
}

/// In-memory source with per-commit latency and missing files, for tests and benches.
#[derive(Default)]
pub struct MemorySource {
    commits: HashMap<String, MemoryCommit>,
    index_unavailable: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit whose stats file is `stats` (a JSON array of records).
    pub fn with_commit(mut self, sha: &str, timestamp: i64, stats: Value) -> Self {
        self.commits.insert(
            sha.to_string(),
            MemoryCommit {
                timestamp: json!(timestamp.to_string()),
                stats: Some(stats.to_string().into_bytes()),
                delay: Duration::ZERO,
            },
        );
        self
    }

    /// Add a commit that is listed in the index but whose stats file is missing.
    pub fn with_missing_stats(mut self, sha: &str, timestamp: i64) -> Self {
        self.commits.insert(
            sha.to_string(),
            MemoryCommit {
                timestamp: json!(timestamp),
                stats: None,
                delay: Duration::ZERO,
            },
        );
        self
    }

    /// Add a commit whose stats file holds arbitrary bytes.
    pub fn with_raw_stats(mut self, sha: &str, timestamp: i64, bytes: &[u8]) -> Self {
        self.commits.insert(
            sha.to_string(),
            MemoryCommit {
                timestamp: json!(timestamp),
                stats: Some(bytes.to_vec()),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn with_delay(mut self, sha: &str, delay: Duration) -> Self {
        if let Some(c) = self.commits.get_mut(sha) {
            c.delay = delay;
        }
        self
    }

    pub fn without_index(mut self) -> Self {
        self.index_unavailable = true;
        self
    }
}

impl StatsSource for MemorySource {
    async fn fetch_index(&self) -> Result<Vec<u8>> {
        if self.index_unavailable {
            return Err(StatsError::fetch(
                DirSource::INDEX_FILE,
                io::Error::new(io::ErrorKind::NotFound, "index unavailable"),
            ));
        }
        let commits: serde_json::Map<String, Value> = self
            .commits
            .iter()
            .map(|(sha, c)| (sha.clone(), c.timestamp.clone()))
            .collect();
        Ok(json!({ "commits": commits }).to_string().into_bytes())
    }

    async fn fetch_stats(&self, sha: &str) -> Result<Vec<u8>> {
        let commit = self.commits.get(sha).ok_or_else(|| {
            StatsError::fetch(
                sha,
                io::Error::new(io::ErrorKind::NotFound, "unknown commit"),
            )
        })?;
        if !commit.delay.is_zero() {
            tokio::time::sleep(commit.delay).await;
        }
        commit.stats.clone().ok_or_else(|| {
            StatsError::fetch(
                format!("{sha}.json"),
                io::Error::new(io::ErrorKind::NotFound, "stats file missing"),
            )
        })
    }
}
