use crate::error::Result;
use crate::history::{CommitHistory, HistoryUpdate, SharedHistory};
use crate::model::{CommitAggregate, PAGE_SIZE};
use crate::parse::{parse_index, parse_stats_file};
use crate::source::StatsSource;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

/// Number of pages needed for `total` commits. Never less than one.
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// Start offset of a 1-based page number. Saturates instead of overflowing.
pub fn page_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1).saturating_mul(page_size)
}

/// Resolves the commit index into pages and hands out one [`CommitResult`]
/// per commit of the current page.
pub struct CommitFetcher<S> {
    source: Rc<S>,
    page_size: usize,
    history: SharedHistory,
}

/// One page of the commit list, newest first.
pub struct CommitPage<S> {
    /// Commits across all pages.
    pub total: usize,
    pub offset: usize,
    pub page_size: usize,
    pub commits: Vec<CommitResult<S>>,
}

impl<S> CommitPage<S> {
    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }

    /// 1-based number of this page.
    pub fn page_number(&self) -> usize {
        self.offset / self.page_size.max(1) + 1
    }

    pub fn shas(&self) -> Vec<String> {
        self.commits.iter().map(|c| c.sha.clone()).collect()
    }
}

impl<S: StatsSource> CommitFetcher<S> {
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, PAGE_SIZE)
    }

    pub fn with_page_size(source: S, page_size: usize) -> Self {
        Self {
            source: Rc::new(source),
            page_size: page_size.max(1),
            history: CommitHistory::shared(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch the index and return the page starting at `offset`.
    ///
    /// A fresh history is installed for the page before this returns; the
    /// current subscriber moves over to it. Results of earlier pages keep
    /// pointing at their own history and no longer reach the subscriber.
    pub async fn list_commits(&mut self, offset: usize) -> Result<CommitPage<S>> {
        let bytes = self.source.fetch_index().await?;
        let mut index = parse_index(&bytes)?;
        index.sort_newest_first();

        let total = index.len();
        let page: Vec<(String, i64)> = index
            .commits
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();

        info!(total, offset, page_len = page.len(), "loaded commit index");

        let fresh = CommitHistory::shared();
        {
            let subscriber = self.history.borrow_mut().take_subscriber();
            let mut history = fresh.borrow_mut();
            if let Some(subscriber) = subscriber {
                history.subscribe(subscriber);
            }
            history.set_commit_count(page.len());
        }
        self.history = fresh;

        let commits = page
            .into_iter()
            .map(|(sha, timestamp)| CommitResult {
                sha,
                timestamp,
                source: Rc::clone(&self.source),
                history: Rc::downgrade(&self.history),
            })
            .collect();

        Ok(CommitPage {
            total,
            offset,
            page_size: self.page_size,
            commits,
        })
    }
}

impl<S> CommitFetcher<S> {
    /// Replace the history subscriber.
    ///
    /// The subscriber runs while the history is being updated and must not
    /// call back into this fetcher.
    pub fn subscribe_history<F>(&self, subscriber: F)
    where
        F: FnMut(HistoryUpdate<'_>) + 'static,
    {
        self.history.borrow_mut().subscribe(Box::new(subscriber));
    }

    /// Record a commit of the current page as failed when its resolution never
    /// reported back, e.g. because its task died.
    pub fn fail_commit(&self, sha: &str, message: impl Into<String>) -> bool {
        self.history.borrow_mut().fail(sha, message)
    }

    /// Complete the current page with whatever has arrived so far.
    pub fn expire_page(&self) -> bool {
        self.history.borrow_mut().expire()
    }

    pub fn with_history<R>(&self, f: impl FnOnce(&CommitHistory) -> R) -> R {
        f(&*self.history.borrow())
    }
}

/// A commit of the current page that has not been fetched yet.
///
/// Holds a non-owning reference to the history of the page it was created
/// for; once that page is replaced, resolving still works but reports nowhere.
pub struct CommitResult<S> {
    sha: String,
    timestamp: i64,
    source: Rc<S>,
    history: Weak<RefCell<CommitHistory>>,
}

impl<S: StatsSource> CommitResult<S> {
    pub fn sha(&self) -> &str {
        &self.sha
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Fetch, parse and aggregate this commit's stats, then report the outcome
    /// to the page history. Failures reject here and count as failed in the history.
    pub async fn resolve(self) -> Result<CommitAggregate> {
        debug!(commit = %self.sha, "fetching commit stats");
        match self.fetch().await {
            Ok(aggregate) => {
                self.report(|h| h.add(aggregate.clone()));
                debug!(
                    commit = %self.sha,
                    error_rate = aggregate.totals.error_rate,
                    "commit stats ready"
                );
                Ok(aggregate)
            }
            Err(e) => {
                warn!(commit = %self.sha, error = %e, "failed to load commit stats");
                self.report(|h| h.fail(&self.sha, e.to_string()));
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<CommitAggregate> {
        let bytes = self.source.fetch_stats(&self.sha).await?;
        let stats = parse_stats_file(&bytes)?;
        CommitAggregate::new(self.sha.clone(), self.timestamp, stats)
    }

    fn report(&self, update: impl FnOnce(&mut CommitHistory) -> bool) {
        let Some(history) = self.history.upgrade() else {
            debug!(commit = %self.sha, "page was replaced, dropping result");
            return;
        };
        match history.try_borrow_mut() {
            Ok(mut h) => {
                update(&mut *h);
            }
            Err(_) => warn!(commit = %self.sha, "history is busy, dropping result"),
        };
    }
}
