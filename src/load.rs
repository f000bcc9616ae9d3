use crate::cli::CommonArgs;
use crate::error::Result;
use crate::fetch::{page_offset, CommitFetcher};
use crate::history::HistoryUpdate;
use crate::model::{CommitAggregate, FailedCommit};
use crate::source::{DirSource, StatsSource};
use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::future::Future;
use std::time::Instant;
use tokio::task::{spawn_local, JoinHandle, LocalSet};
use tracing::warn;

/// A settled page as seen by the non-interactive commands.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total: usize,
    /// Newest first.
    pub commits: Vec<CommitAggregate>,
    pub failed: Vec<FailedCommit>,
    /// Commits that had not arrived when the page timed out.
    pub pending: Vec<String>,
}

/// Drive `fut` to completion on a single-threaded runtime with a local task set.
pub fn run_local<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let local = LocalSet::new();
    Ok(local.block_on(&rt, fut))
}

fn progress_bar(show_progress: bool) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("Loading commits...");
    pb
}

/// Wait for every resolve task of the page.
///
/// Resolution errors are already in the history. A task that died before
/// reporting is recorded as failed here so the page can still settle.
async fn settle<S: StatsSource>(
    fetcher: &CommitFetcher<S>,
    tasks: Vec<(String, JoinHandle<Result<CommitAggregate>>)>,
) {
    for (sha, handle) in tasks {
        if let Err(e) = handle.await {
            warn!(commit = %sha, error = %e, "commit task ended without a result");
            fetcher.fail_commit(&sha, format!("Task ended without a result: {e}"));
        }
    }
}

/// Fetch one page and wait until every commit has arrived, failed, or the timeout hit.
///
/// Must run inside a [`LocalSet`].
pub async fn load_page(
    common: &CommonArgs,
    page: usize,
    show_progress: bool,
) -> anyhow::Result<LoadedPage> {
    let started = Instant::now();
    let mut fetcher = CommitFetcher::with_page_size(DirSource::new(&common.data), common.page_size);

    let pb = progress_bar(show_progress);
    {
        let pb = pb.clone();
        fetcher.subscribe_history(move |update| match update {
            HistoryUpdate::Progress { received, expected } => {
                pb.set_length(expected as u64);
                pb.set_position(received as u64);
            }
            HistoryUpdate::Complete(_) => pb.finish_and_clear(),
        });
    }

    let offset = page_offset(page, fetcher.page_size());
    let data = common.data.display();
    let commit_page = fetcher
        .list_commits(offset)
        .await
        .with_context(|| format!("Failed to load commit index from {data}"))?;

    let page_count = commit_page.page_count();
    if page > page_count {
        bail!("Page {page} is out of range ({page_count} page(s))");
    }

    let shas = commit_page.shas();
    pb.set_length(shas.len() as u64);

    let tasks: Vec<_> = commit_page
        .commits
        .into_iter()
        .map(|c| (c.sha().to_string(), spawn_local(c.resolve())))
        .collect();

    if tokio::time::timeout(common.timeout, settle(&fetcher, tasks))
        .await
        .is_err()
    {
        warn!(
            timeout = %humantime::format_duration(common.timeout),
            "page did not settle in time, showing partial results"
        );
        fetcher.expire_page();
    }
    pb.finish_and_clear();

    let (commits, failed) =
        fetcher.with_history(|h| (h.commits().to_vec(), h.failed().to_vec()));

    let settled: HashSet<&str> = commits
        .iter()
        .map(|c| c.commit_sha.as_str())
        .chain(failed.iter().map(|f| f.commit_sha.as_str()))
        .collect();
    let pending = shas
        .iter()
        .filter(|sha| !settled.contains(sha.as_str()))
        .cloned()
        .collect();

    tracing::info!(
        page,
        commits = commits.len(),
        failed = failed.len(),
        elapsed = %humantime::format_duration(started.elapsed()),
        "page loaded"
    );

    Ok(LoadedPage {
        page,
        page_count,
        page_size: commit_page.page_size,
        total: commit_page.total,
        commits,
        failed,
        pending,
    })
}
