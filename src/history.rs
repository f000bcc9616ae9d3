//! Per-page accumulation of commit aggregates.
//!
//! Aggregates arrive in whatever order their fetches finish. The history keeps
//! them sorted newest first after every insertion and tells its single
//! subscriber about progress until the page is settled, then hands over the
//! finished collection exactly once.

use crate::model::{CommitAggregate, FailedCommit};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

pub type SharedHistory = Rc<RefCell<CommitHistory>>;

pub type Subscriber = Box<dyn FnMut(HistoryUpdate<'_>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Empty,
    Collecting { expected: usize },
    Complete,
}

/// What a subscriber is told after each change.
#[derive(Debug)]
pub enum HistoryUpdate<'a> {
    Progress { received: usize, expected: usize },
    Complete(HistorySnapshot<'a>),
}

/// The settled page: aggregates newest first, plus whatever never arrived.
#[derive(Debug, Clone, Copy)]
pub struct HistorySnapshot<'a> {
    pub commits: &'a [CommitAggregate],
    pub failed: &'a [FailedCommit],
    /// Commits still outstanding when the page was expired.
    pub pending: usize,
}

pub struct CommitHistory {
    state: HistoryState,
    expected: usize,
    commits: Vec<CommitAggregate>,
    failed: Vec<FailedCommit>,
    subscriber: Option<Subscriber>,
}

impl Default for CommitHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommitHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitHistory")
            .field("state", &self.state)
            .field("expected", &self.expected)
            .field("received", &self.commits.len())
            .field("failed", &self.failed.len())
            .field("subscribed", &self.subscriber.is_some())
            .finish()
    }
}

fn newest_first(a: &CommitAggregate, b: &CommitAggregate) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| a.commit_sha.cmp(&b.commit_sha))
}

impl CommitHistory {
    pub fn new() -> Self {
        Self {
            state: HistoryState::Empty,
            expected: 0,
            commits: Vec::new(),
            failed: Vec::new(),
            subscriber: None,
        }
    }

    pub fn shared() -> SharedHistory {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Start a page of `n` commits, dropping anything accumulated before.
    ///
    /// A page of zero commits is complete immediately.
    pub fn set_commit_count(&mut self, n: usize) {
        self.commits.clear();
        self.failed.clear();
        self.expected = n;
        self.state = HistoryState::Collecting { expected: n };
        self.commits.reserve(n);
        if n == 0 {
            self.notify();
        }
    }

    /// Insert an aggregate. Returns `false` if the page is not collecting or
    /// the commit was already settled.
    pub fn add(&mut self, aggregate: CommitAggregate) -> bool {
        if !self.accepts(&aggregate.commit_sha) {
            return false;
        }
        let pos = self
            .commits
            .partition_point(|c| newest_first(c, &aggregate) == Ordering::Less);
        self.commits.insert(pos, aggregate);
        self.notify();
        true
    }

    /// Record that a commit of this page will never arrive.
    pub fn fail(&mut self, commit_sha: &str, message: impl Into<String>) -> bool {
        if !self.accepts(commit_sha) {
            return false;
        }
        self.failed.push(FailedCommit {
            commit_sha: commit_sha.to_string(),
            message: message.into(),
        });
        self.notify();
        true
    }

    /// Complete the page with whatever has arrived. Returns `false` if it was
    /// not collecting.
    pub fn expire(&mut self) -> bool {
        if !matches!(self.state, HistoryState::Collecting { .. }) {
            return false;
        }
        debug!(
            received = self.commits.len(),
            expected = self.expected,
            "expiring commit history"
        );
        self.state = HistoryState::Complete;
        self.notify();
        true
    }

    /// Replace the subscriber. The previous one, if any, is dropped.
    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscriber = Some(subscriber);
    }

    pub fn take_subscriber(&mut self) -> Option<Subscriber> {
        self.subscriber.take()
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == HistoryState::Complete
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.commits.len()
    }

    pub fn commits(&self) -> &[CommitAggregate] {
        &self.commits
    }

    pub fn failed(&self) -> &[FailedCommit] {
        &self.failed
    }

    fn settled(&self) -> usize {
        self.commits.len() + self.failed.len()
    }

    fn accepts(&self, sha: &str) -> bool {
        if !matches!(self.state, HistoryState::Collecting { .. }) {
            warn!(
                commit = sha,
                state = ?self.state,
                "ignoring result for a page that is not collecting"
            );
            return false;
        }
        let known = self.commits.iter().any(|c| c.commit_sha == sha)
            || self.failed.iter().any(|f| f.commit_sha == sha);
        if known {
            warn!(commit = sha, "ignoring duplicate result");
            return false;
        }
        true
    }

    fn notify(&mut self) {
        let received = self.commits.len();
        let settled = self.settled();
        if settled >= self.expected {
            self.state = HistoryState::Complete;
        }

        let Some(subscriber) = self.subscriber.as_mut() else {
            return;
        };

        if self.state == HistoryState::Complete {
            subscriber(HistoryUpdate::Complete(HistorySnapshot {
                commits: &self.commits,
                failed: &self.failed,
                pending: self.expected.saturating_sub(settled),
            }));
        } else {
            subscriber(HistoryUpdate::Progress {
                received,
                expected: self.expected,
            });
        }
    }
}
