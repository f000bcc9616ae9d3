use crate::model::CommitAggregate;
use std::time::Instant;

#[derive(Clone, Debug)]
pub enum RowStatus {
    Pending,
    Ready(CommitAggregate),
    Failed(String),
}

/// One commit of the current page, in page order (newest first).
#[derive(Clone, Debug)]
pub struct CommitRow {
    pub sha: String,
    pub timestamp: i64,
    pub status: RowStatus,
}

/// What the chart area shows.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphState {
    Loading { received: usize, expected: usize },
    /// `(short sha, error rate)` oldest first.
    Ready {
        points: Vec<(String, f64)>,
        missing: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailTab {
    Syntax,
    Timings,
}

impl DetailTab {
    pub fn toggle(self) -> Self {
        match self {
            DetailTab::Syntax => DetailTab::Timings,
            DetailTab::Timings => DetailTab::Syntax,
        }
    }

    pub fn index(self) -> usize {
        match self {
            DetailTab::Syntax => 0,
            DetailTab::Timings => 1,
        }
    }
}

pub struct DashboardState {
    /// Bumped on every page load; stale fetch tasks compare against it.
    pub generation: u64,
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub rows: Vec<CommitRow>,
    pub selected: usize,
    pub tab: DetailTab,
    pub graph: GraphState,
    pub show_help: bool,
    pub deadline: Option<Instant>,
    pub status_message: Option<(String, Instant)>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            generation: 0,
            page: 1,
            page_count: 1,
            total: 0,
            rows: Vec::new(),
            selected: 0,
            tab: DetailTab::Syntax,
            graph: GraphState::Loading {
                received: 0,
                expected: 0,
            },
            show_help: false,
            deadline: None,
            status_message: None,
        }
    }
}

impl DashboardState {
    pub fn selected_row(&self) -> Option<&CommitRow> {
        self.rows.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    pub fn pending_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.status, RowStatus::Pending))
            .count()
    }
}
