use crate::error::{Result, StatsError};
use crate::model::{CommitTotals, StatEntry};

/// Reduce the per-project entries of one commit into commit-level totals.
///
/// Only successful analyses contribute; failure rows count as zero. The error
/// rate is `100 * (unknown + partial) / expressions`, and `0.0` whenever there
/// are no unknown or partial types. A non-zero error count over zero
/// expressions is an upstream data fault and also yields `0.0`.
///
/// Counts whose sum does not fit in a `u64` are rejected as a parse error.
pub fn aggregate(stats: &[StatEntry]) -> Result<CommitTotals> {
    let mut totals = CommitTotals::default();

    for s in stats.iter().filter_map(StatEntry::as_success) {
        totals.total_expressions = sum(totals.total_expressions, s.expressions, "expressions")?;
        totals.total_unknown = sum(totals.total_unknown, s.unknown_types, "unknown_types")?;
        totals.total_partial = sum(
            totals.total_partial,
            s.partial_unknown_types,
            "partial_unknown_types",
        )?;
    }

    let total_error = sum(
        totals.total_unknown,
        totals.total_partial,
        "unknown + partial",
    )?;
    totals.error_rate = if total_error == 0 || totals.total_expressions == 0 {
        0.0
    } else {
        total_error as f64 / totals.total_expressions as f64 * 100.0
    };

    Ok(totals)
}

fn sum(total: u64, n: u64, field: &str) -> Result<u64> {
    total
        .checked_add(n)
        .ok_or_else(|| StatsError::parse(format!("Sum of '{field}' overflows")))
}

/// Format `n` as a percentage of `base` with two decimals.
pub fn percent(n: u64, base: u64) -> String {
    if base == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", n as f64 / base as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectFailure, ProjectStats};
    use std::time::Duration;

    fn success(expressions: u64, unknown: u64, partial: u64) -> StatEntry {
        StatEntry::Success(ProjectStats {
            project_name: "p".into(),
            roots: 1,
            crates: 1,
            modules: 1,
            declarations: 0,
            functions: 0,
            expressions,
            unknown_types: unknown,
            partial_unknown_types: partial,
            type_mismatches: 0,
            database_loaded_time: Duration::ZERO,
            item_collection_time: Duration::ZERO,
            inference_time: Duration::ZERO,
            total_time: Duration::ZERO,
        })
    }

    fn failure() -> StatEntry {
        StatEntry::Failure(ProjectFailure {
            project_name: "broken".into(),
            message: "panicked".into(),
        })
    }

    #[test]
    fn empty_input_has_zero_rate() {
        let t = aggregate(&[]).unwrap();
        assert_eq!(t, CommitTotals::default());
    }

    #[test]
    fn error_rate_over_two_projects() {
        let t = aggregate(&[success(100, 10, 0), success(200, 0, 20)]).unwrap();
        assert_eq!(t.total_expressions, 300);
        assert_eq!(t.total_unknown, 10);
        assert_eq!(t.total_partial, 20);
        assert!((t.error_rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn failures_contribute_nothing() {
        let with = aggregate(&[success(50, 5, 5), failure(), failure()]).unwrap();
        let without = aggregate(&[success(50, 5, 5)]).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn zero_errors_means_zero_rate_regardless_of_expressions() {
        assert_eq!(aggregate(&[success(1000, 0, 0)]).unwrap().error_rate, 0.0);
        assert_eq!(aggregate(&[success(0, 0, 0)]).unwrap().error_rate, 0.0);
    }

    #[test]
    fn errors_without_expressions_do_not_produce_nan() {
        let t = aggregate(&[success(0, 3, 1)]).unwrap();
        assert_eq!(t.error_rate, 0.0);
        assert!(t.error_rate.is_finite());
    }

    #[test]
    fn repeated_calls_agree() {
        let stats = vec![success(7, 1, 2), failure(), success(13, 0, 1)];
        assert_eq!(aggregate(&stats).unwrap(), aggregate(&stats).unwrap());
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let err = aggregate(&[success(u64::MAX, 0, 0), success(1, 0, 0)]).unwrap_err();
        assert!(matches!(err, StatsError::Parse(_)));
        assert!(err.to_string().contains("expressions"));

        let err = aggregate(&[success(10, u64::MAX, 1)]).unwrap_err();
        assert!(err.to_string().contains("unknown + partial"));
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(percent(1, 0), "0%");
        assert_eq!(percent(1, 3), "33.33%");
        assert_eq!(percent(30, 300), "10.00%");
    }
}
