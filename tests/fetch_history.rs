use pretty_assertions::assert_eq;
use rastats::fetch::{page_count, page_offset};
use rastats::history::HistoryUpdate;
use rastats::{CommitFetcher, MemorySource};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::{spawn_local, LocalSet};

fn project(name: &str, expressions: u64, unknown: u64, partial: u64) -> Value {
    json!({
        "project_name": name,
        "roots": 4, "crates": 20, "modules": 80,
        "declarations": 1000, "functions": 400,
        "expressions": expressions,
        "unknown_types": unknown,
        "partial_unknown_types": partial,
        "type_mismatches": 2,
        "database_loaded_time": "1.5s",
        "item_collection_time": "250ms",
        "inferenece_time": "3s",
        "total_time": "4750ms"
    })
}

fn source_with(n: usize) -> MemorySource {
    (0..n).fold(MemorySource::new(), |src, i| {
        src.with_commit(
            &format!("c{i:03}"),
            1_600_000_000 + i as i64 * 60,
            json!([project("/work/hello/", 100 + i as u64, 1, 0)]),
        )
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Progress(usize, usize),
    Complete(Vec<String>),
}

fn record(fetcher: &CommitFetcher<MemorySource>) -> Rc<RefCell<Vec<Seen>>> {
    let seen: Rc<RefCell<Vec<Seen>>> = Rc::default();
    let sink = Rc::clone(&seen);
    fetcher.subscribe_history(move |update| {
        let event = match update {
            HistoryUpdate::Progress { received, expected } => Seen::Progress(received, expected),
            HistoryUpdate::Complete(snapshot) => Seen::Complete(
                snapshot
                    .commits
                    .iter()
                    .map(|c| c.commit_sha.clone())
                    .collect(),
            ),
        };
        sink.borrow_mut().push(event);
    });
    seen
}

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[tokio::test(flavor = "current_thread")]
async fn pagination_boundaries() {
    let mut fetcher = CommitFetcher::new(source_with(120));

    let first = fetcher.list_commits(0).await.unwrap();
    assert_eq!(first.total, 120);
    assert_eq!(first.commits.len(), 50);
    assert_eq!(first.commits[0].sha(), "c119");
    assert_eq!(first.page_count(), 3);

    let last = fetcher.list_commits(100).await.unwrap();
    assert_eq!(last.total, 120);
    assert_eq!(last.commits.len(), 20);
    assert_eq!(last.commits[19].sha(), "c000");
    assert_eq!(last.page_number(), 3);

    assert_eq!(page_count(120, 50), 3);
    assert_eq!(page_count(100, 50), 2);
}

#[test]
fn page_offset_saturates_for_huge_pages() {
    assert_eq!(page_offset(1, 50), 0);
    assert_eq!(page_offset(3, 50), 100);
    assert_eq!(page_offset(0, 50), 0);
    assert_eq!(page_offset(usize::MAX, 50), usize::MAX);
}

#[tokio::test(flavor = "current_thread")]
async fn offset_past_the_end_is_an_empty_page() {
    let mut fetcher = CommitFetcher::new(source_with(3));
    let offset = page_offset(usize::MAX, 50);
    let page = fetcher.list_commits(offset).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.commits.is_empty());
    assert_eq!(page.page_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn empty_index_is_one_empty_page() {
    let mut fetcher = CommitFetcher::new(MemorySource::new());
    let seen = record(&fetcher);

    let page = fetcher.list_commits(0).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.commits.is_empty());
    assert_eq!(page.page_count(), 1);
    assert_eq!(*seen.borrow(), vec![Seen::Complete(vec![])]);
}

#[tokio::test(flavor = "current_thread")]
async fn missing_index_rejects() {
    let mut fetcher = CommitFetcher::new(MemorySource::new().without_index());
    assert!(fetcher.list_commits(0).await.is_err());
}

#[tokio::test(flavor = "current_thread")]
async fn aggregates_are_computed_per_commit() {
    let source = MemorySource::new().with_commit(
        "abc",
        1_600_000_000,
        json!([
            project("/work/a/", 100, 10, 0),
            project("/work/b/", 200, 0, 20),
            {"project_name": "/work/c/", "error": "cargo metadata failed"}
        ]),
    );
    let mut fetcher = CommitFetcher::new(source);
    let mut page = fetcher.list_commits(0).await.unwrap();
    let aggregate = page.commits.remove(0).resolve().await.unwrap();

    assert_eq!(aggregate.stats.len(), 3);
    assert_eq!(aggregate.totals.total_expressions, 300);
    assert_eq!(aggregate.totals.total_unknown, 10);
    assert_eq!(aggregate.totals.total_partial, 20);
    assert!((aggregate.totals.error_rate - 10.0).abs() < 1e-9);
}

#[tokio::test(flavor = "current_thread")]
async fn progress_then_completion_once() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut fetcher = CommitFetcher::new(source_with(3));
            let seen = record(&fetcher);
            let page = fetcher.list_commits(0).await.unwrap();

            for commit in page.commits {
                commit.resolve().await.unwrap();
            }

            assert_eq!(
                *seen.borrow(),
                vec![
                    Seen::Progress(1, 3),
                    Seen::Progress(2, 3),
                    Seen::Complete(vec!["c002".into(), "c001".into(), "c000".into()]),
                ]
            );
            assert!(fetcher.with_history(|h| h.is_complete()));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn arrival_order_does_not_change_the_result() {
    let shas = ["c000", "c001", "c002", "c003"];
    let mut outcomes = Vec::new();

    for order in permutations(&[0, 1, 2, 3]) {
        let local = LocalSet::new();
        let outcome = local
            .run_until(async {
                let mut source = source_with(4);
                for (rank, &idx) in order.iter().enumerate() {
                    let delay = Duration::from_millis(10 * (rank as u64 + 1));
                    source = source.with_delay(shas[idx], delay);
                }
                let mut fetcher = CommitFetcher::new(source);
                let seen = record(&fetcher);
                let page = fetcher.list_commits(0).await.unwrap();

                let handles: Vec<_> = page
                    .commits
                    .into_iter()
                    .map(|c| spawn_local(c.resolve()))
                    .collect();
                for h in handles {
                    h.await.unwrap().unwrap();
                }

                let seen = seen.borrow().clone();
                let completions: Vec<_> = seen
                    .iter()
                    .filter(|s| matches!(s, Seen::Complete(_)))
                    .cloned()
                    .collect();
                assert_eq!(
                    completions.len(),
                    1,
                    "completion must fire once for {order:?}"
                );
                assert_eq!(seen.len(), 4);
                completions[0].clone()
            })
            .await;
        outcomes.push(outcome);
    }

    let expected = Seen::Complete(vec!["c003".into(), "c002".into(), "c001".into(), "c000".into()]);
    assert!(outcomes.iter().all(|o| *o == expected));
}

#[tokio::test(flavor = "current_thread")]
async fn equal_timestamps_still_sort_deterministically() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let source = MemorySource::new()
                .with_commit("bbb", 100, json!([]))
                .with_commit("aaa", 100, json!([]))
                .with_commit("ccc", 200, json!([]));
            let mut fetcher = CommitFetcher::new(source);
            let seen = record(&fetcher);
            let mut page = fetcher.list_commits(0).await.unwrap();

            // resolve in reverse page order
            while let Some(c) = page.commits.pop() {
                c.resolve().await.unwrap();
            }

            assert_eq!(
                seen.borrow().last(),
                Some(&Seen::Complete(vec!["ccc".into(), "aaa".into(), "bbb".into()]))
            );
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn failed_commit_rejects_but_page_still_settles() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let source = source_with(2)
                .with_missing_stats("gone", 1_700_000_000)
                .with_raw_stats("junk", 1_500_000_000, b"{not json");
            let mut fetcher = CommitFetcher::new(source);
            let seen = record(&fetcher);
            let page = fetcher.list_commits(0).await.unwrap();
            assert_eq!(page.commits.len(), 4);

            let mut errors = 0;
            for commit in page.commits {
                if commit.resolve().await.is_err() {
                    errors += 1;
                }
            }
            assert_eq!(errors, 2);

            assert_eq!(
                seen.borrow().last(),
                Some(&Seen::Complete(vec!["c001".into(), "c000".into()]))
            );
            let failed: Vec<String> =
                fetcher.with_history(|h| h.failed().iter().map(|f| f.commit_sha.clone()).collect());
            assert_eq!(failed, vec!["gone".to_string(), "junk".to_string()]);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn overflowing_counts_fail_the_commit() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let source = source_with(1).with_commit(
                "huge",
                1_700_000_000,
                json!([
                    project("/work/a/", u64::MAX, 0, 0),
                    project("/work/b/", 1, 0, 0),
                ]),
            );
            let mut fetcher = CommitFetcher::new(source);
            let seen = record(&fetcher);
            let page = fetcher.list_commits(0).await.unwrap();

            let mut outcomes = Vec::new();
            for commit in page.commits {
                let sha = commit.sha().to_string();
                outcomes.push((sha, commit.resolve().await.is_ok()));
            }
            assert_eq!(
                outcomes,
                vec![("huge".to_string(), false), ("c000".to_string(), true)]
            );

            assert_eq!(
                seen.borrow().last(),
                Some(&Seen::Complete(vec!["c000".into()]))
            );
            let failed = fetcher.with_history(|h| h.failed().to_vec());
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].commit_sha, "huge");
            assert!(failed[0].message.contains("overflows"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn switching_pages_detaches_old_results() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut source = source_with(4);
            for sha in ["c003", "c002"] {
                source = source.with_delay(sha, Duration::from_secs(5));
            }
            let mut fetcher = CommitFetcher::with_page_size(source, 2);
            let seen = record(&fetcher);

            let old_page = fetcher.list_commits(0).await.unwrap();
            let stale: Vec<_> = old_page
                .commits
                .into_iter()
                .map(|c| spawn_local(c.resolve()))
                .collect();

            let new_page = fetcher.list_commits(2).await.unwrap();
            for commit in new_page.commits {
                commit.resolve().await.unwrap();
            }

            // the old page still resolves for its caller
            for h in stale {
                assert!(h.await.unwrap().is_ok());
            }

            assert_eq!(
                *seen.borrow(),
                vec![
                    Seen::Progress(1, 2),
                    Seen::Complete(vec!["c001".into(), "c000".into()]),
                ]
            );
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn expiring_a_page_completes_it_with_partial_results() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let source = source_with(3).with_delay("c000", Duration::from_secs(60));
            let mut fetcher = CommitFetcher::new(source);
            let pending = Rc::new(RefCell::new(None));
            let sink = Rc::clone(&pending);
            fetcher.subscribe_history(move |update| {
                if let HistoryUpdate::Complete(s) = update {
                    *sink.borrow_mut() = Some((s.commits.len(), s.pending));
                }
            });

            let page = fetcher.list_commits(0).await.unwrap();
            let handles: Vec<_> = page
                .commits
                .into_iter()
                .map(|c| spawn_local(c.resolve()))
                .collect();

            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(fetcher.expire_page());
            assert_eq!(*pending.borrow(), Some((2, 1)));

            // the straggler arrives after expiry and is ignored
            for h in handles {
                h.await.unwrap().unwrap();
            }
            assert_eq!(fetcher.with_history(|h| h.received()), 2);
        })
        .await;
}
