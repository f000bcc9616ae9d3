//! Browse rust-analyzer `analysis-stats` results across commits.
//!
//! The data layer reads a commit index and one stats file per commit, rolls
//! each commit up into totals and an error rate, and collects the commits of a
//! page into a [`history::CommitHistory`] as their fetches complete in any order.

pub mod aggregate;
pub mod cli;
pub mod commits;
pub mod error;
pub mod fetch;
pub mod history;
pub mod load;
pub mod logging;
pub mod model;
pub mod parse;
pub mod source;
pub mod trend;
pub mod tui;

pub use aggregate::aggregate;
pub use error::{Result, StatsError};
pub use fetch::{page_count, CommitFetcher, CommitPage, CommitResult};
pub use history::{CommitHistory, HistoryState, HistoryUpdate};
pub use model::{CommitAggregate, StatEntry, PAGE_SIZE};
pub use source::{DirSource, MemorySource, StatsSource};
