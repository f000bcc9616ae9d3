use crate::error::{Result, StatsError};
use crate::model::{CommitIndex, ProjectFailure, ProjectStats, StatEntry};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Parse a duration as written by `analysis-stats`: `"<number>ms"` or `"<number>s"`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    let (number, scale) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1000.0)
    } else {
        return Err(StatsError::parse(format!("Unrecognized duration unit in '{input}'")));
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| StatsError::parse(format!("Invalid duration '{input}'")))?;

    Duration::try_from_secs_f64(value * scale / 1000.0)
        .map_err(|e| StatsError::parse(format!("Invalid duration '{input}': {e}")))
}

#[derive(Deserialize)]
struct RawFailure {
    project_name: String,
    error: Value,
}

#[derive(Deserialize)]
struct RawStats {
    project_name: String,
    roots: u64,
    crates: u64,
    modules: u64,
    declarations: u64,
    functions: u64,
    expressions: u64,
    unknown_types: u64,
    partial_unknown_types: u64,
    type_mismatches: u64,
    database_loaded_time: String,
    item_collection_time: String,
    #[serde(alias = "inference_time")]
    inferenece_time: String,
    total_time: String,
}

/// Turn one raw per-project record into a [`StatEntry`].
///
/// A record with a non-null `error` field is a failed analysis; anything else
/// must carry the full set of counts and durations.
pub fn parse_stat_entry(record: &Value) -> Result<StatEntry> {
    let has_error = record.get("error").is_some_and(|e| !e.is_null());

    if has_error {
        let raw = RawFailure::deserialize(record)
            .map_err(|e| StatsError::parse(format!("Invalid failure record: {e}")))?;
        let message = match raw.error {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Ok(StatEntry::Failure(ProjectFailure {
            project_name: raw.project_name,
            message,
        }));
    }

    let raw = RawStats::deserialize(record)
        .map_err(|e| StatsError::parse(format!("Invalid stats record: {e}")))?;

    Ok(StatEntry::Success(ProjectStats {
        database_loaded_time: parse_duration(&raw.database_loaded_time)?,
        item_collection_time: parse_duration(&raw.item_collection_time)?,
        inference_time: parse_duration(&raw.inferenece_time)?,
        total_time: parse_duration(&raw.total_time)?,
        project_name: raw.project_name,
        roots: raw.roots,
        crates: raw.crates,
        modules: raw.modules,
        declarations: raw.declarations,
        functions: raw.functions,
        expressions: raw.expressions,
        unknown_types: raw.unknown_types,
        partial_unknown_types: raw.partial_unknown_types,
        type_mismatches: raw.type_mismatches,
    }))
}

/// Parse a per-commit stats file. One bad record fails the whole commit.
pub fn parse_stats_file(bytes: &[u8]) -> Result<Vec<StatEntry>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let records = value
        .as_array()
        .ok_or_else(|| StatsError::parse("Stats file is not a JSON array"))?;
    records.iter().map(parse_stat_entry).collect()
}

/// Parse `{"commits": {"<sha>": <timestamp>}}`. Timestamps may be numbers or numeric strings.
pub fn parse_index(bytes: &[u8]) -> Result<CommitIndex> {
    let value: Value = serde_json::from_slice(bytes)?;
    let commits = value
        .get("commits")
        .and_then(Value::as_object)
        .ok_or_else(|| StatsError::parse("Commit index has no 'commits' object"))?;

    let mut index = CommitIndex::default();
    for (sha, ts) in commits {
        if sha.is_empty() {
            return Err(StatsError::parse("Commit index contains an empty SHA"));
        }
        index.commits.push((sha.clone(), parse_timestamp(sha, ts)?));
    }
    Ok(index)
}

/// Unix seconds. Fractional values are truncated toward zero.
fn parse_timestamp(sha: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_secs)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_secs))
        }
        _ => None,
    };
    parsed.ok_or_else(|| StatsError::parse(format!("Invalid timestamp {value} for commit {sha}")))
}

fn truncate_secs(secs: f64) -> Option<i64> {
    (secs.is_finite() && secs.abs() < i64::MAX as f64).then(|| secs.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1500ms").unwrap().as_millis(), 1500);
        assert_eq!(parse_duration("1.5s").unwrap().as_millis(), 1500);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("250.75ms").unwrap().as_micros(), 250_750);
    }

    #[test]
    fn bad_durations() {
        for input in ["1.5x", "15", "ms", "abcs", "-1s", ""] {
            assert!(
                matches!(parse_duration(input), Err(StatsError::Parse(_))),
                "{input} should not parse"
            );
        }
    }

    #[test]
    fn error_record_becomes_failure() {
        let entry = parse_stat_entry(&json!({
            "project_name": "/work/projects/tokio/",
            "error": "failed to load workspace"
        }))
        .unwrap();
        assert_eq!(
            entry,
            StatEntry::Failure(ProjectFailure {
                project_name: "/work/projects/tokio/".into(),
                message: "failed to load workspace".into(),
            })
        );
    }

    #[test]
    fn success_record_converts_durations() {
        let entry = parse_stat_entry(&json!({
            "project_name": "serde",
            "roots": 3, "crates": 12, "modules": 40,
            "declarations": 900, "functions": 300, "expressions": 12000,
            "unknown_types": 20, "partial_unknown_types": 35, "type_mismatches": 4,
            "database_loaded_time": "1.25s",
            "item_collection_time": "300ms",
            "inferenece_time": "2s",
            "total_time": "3550ms"
        }))
        .unwrap();
        let stats = entry.as_success().unwrap();
        assert_eq!(stats.expressions, 12000);
        assert_eq!(stats.database_loaded_time.as_millis(), 1250);
        assert_eq!(stats.inference_time.as_millis(), 2000);
        assert_eq!(stats.total_time.as_millis(), 3550);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let result = parse_stat_entry(&json!({
            "project_name": "serde",
            "roots": -1, "crates": 1, "modules": 1,
            "declarations": 1, "functions": 1, "expressions": 1,
            "unknown_types": 0, "partial_unknown_types": 0, "type_mismatches": 0,
            "database_loaded_time": "1s", "item_collection_time": "1s",
            "inferenece_time": "1s", "total_time": "1s"
        }));
        assert!(matches!(result, Err(StatsError::Parse(_))));
    }

    #[test]
    fn index_accepts_string_and_number_timestamps() {
        let bytes = br#"{"commits": {"aaa": "1590000000", "bbb": 1590000100}}"#;
        let index = parse_index(bytes).unwrap();
        let mut commits = index.commits;
        commits.sort();
        assert_eq!(
            commits,
            vec![
                ("aaa".to_string(), 1_590_000_000),
                ("bbb".to_string(), 1_590_000_100),
            ]
        );
    }

    #[test]
    fn index_truncates_fractional_timestamps() {
        let bytes = br#"{"commits": {"aaa": 1590000000.0, "bbb": "1590000100.5", "ccc": -1.5}}"#;
        let mut commits = parse_index(bytes).unwrap().commits;
        commits.sort();
        assert_eq!(
            commits,
            vec![
                ("aaa".to_string(), 1_590_000_000),
                ("bbb".to_string(), 1_590_000_100),
                ("ccc".to_string(), -1),
            ]
        );
    }

    #[test]
    fn index_rejects_garbage_timestamp() {
        assert!(parse_index(br#"{"commits": {"aaa": "NaN"}}"#).is_err());
        assert!(parse_index(br#"{"commits": {"aaa": 1e300}}"#).is_err());
        assert!(parse_index(br#"{"commits": {"aaa": "soon"}}"#).is_err());
        assert!(parse_index(br#"{"shas": []}"#).is_err());
    }
}
