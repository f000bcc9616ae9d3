use std::cell::RefCell;
use std::io::{self, Stdout};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{poll, read, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::CommonArgs;
use crate::fetch::{page_offset, CommitFetcher};
use crate::history::HistoryUpdate;
use crate::load::run_local;
use crate::model::short_sha;
use crate::source::DirSource;

use super::events::{handle_key_event, Action};
use super::state::{CommitRow, DashboardState, GraphState, RowStatus};
use super::views::{draw_chart, draw_commit_list, draw_help_overlay, draw_projects};

const FRAME: Duration = Duration::from_millis(50);
const STATUS_TTL: Duration = Duration::from_secs(3);

type Term = Terminal<CrosstermBackend<Stdout>>;

pub fn run(common: &CommonArgs, page: usize) -> anyhow::Result<()> {
    run_local(run_dashboard(common.clone(), page))?
}

/// Owns the fetcher and the in-flight resolve tasks of the current page.
struct PageLoader {
    fetcher: CommitFetcher<DirSource>,
    tasks: Vec<JoinHandle<()>>,
    state: Rc<RefCell<DashboardState>>,
    timeout: Duration,
}

impl PageLoader {
    fn new(common: &CommonArgs, state: Rc<RefCell<DashboardState>>) -> Self {
        let fetcher =
            CommitFetcher::with_page_size(DirSource::new(&common.data), common.page_size);

        let sink = Rc::clone(&state);
        fetcher.subscribe_history(move |update| {
            sink.borrow_mut().graph = match update {
                HistoryUpdate::Progress { received, expected } => {
                    GraphState::Loading { received, expected }
                }
                HistoryUpdate::Complete(snapshot) => GraphState::Ready {
                    points: snapshot
                        .commits
                        .iter()
                        .rev()
                        .map(|c| (short_sha(&c.commit_sha).to_string(), c.totals.error_rate))
                        .collect(),
                    missing: snapshot.failed.len() + snapshot.pending,
                },
            };
        });

        Self {
            fetcher,
            tasks: Vec::new(),
            state,
            timeout: common.timeout,
        }
    }

    async fn load(&mut self, page: usize) -> anyhow::Result<()> {
        for task in self.tasks.drain(..) {
            task.abort();
        }

        let offset = page_offset(page, self.fetcher.page_size());
        let commit_page = self
            .fetcher
            .list_commits(offset)
            .await
            .context("Failed to load commit index")?;

        let generation = {
            let mut s = self.state.borrow_mut();
            s.generation += 1;
            s.page = page;
            s.page_count = commit_page.page_count();
            s.total = commit_page.total;
            s.selected = 0;
            s.rows = commit_page
                .commits
                .iter()
                .map(|c| CommitRow {
                    sha: c.sha().to_string(),
                    timestamp: c.timestamp(),
                    status: RowStatus::Pending,
                })
                .collect();
            if !commit_page.commits.is_empty() {
                s.graph = GraphState::Loading {
                    received: 0,
                    expected: commit_page.commits.len(),
                };
                s.deadline = Some(Instant::now() + self.timeout);
            } else {
                s.deadline = None;
            }
            s.generation
        };

        debug!(
            page,
            generation,
            commits = commit_page.commits.len(),
            "page installed"
        );

        for (idx, commit) in commit_page.commits.into_iter().enumerate() {
            let state = Rc::clone(&self.state);
            self.tasks.push(tokio::task::spawn_local(async move {
                let result = commit.resolve().await;
                let mut s = state.borrow_mut();
                if s.generation != generation {
                    return;
                }
                if let Some(row) = s.rows.get_mut(idx) {
                    row.status = match result {
                        Ok(aggregate) => RowStatus::Ready(aggregate),
                        Err(e) => RowStatus::Failed(e.to_string()),
                    };
                }
            }));
        }

        Ok(())
    }

    fn check_deadline(&mut self) {
        let expired = {
            let mut s = self.state.borrow_mut();
            match s.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    s.deadline = None;
                    true
                }
                _ => false,
            }
        };

        if expired && self.fetcher.expire_page() {
            warn!("page timed out, showing partial chart");
            self.state
                .borrow_mut()
                .set_status("Timed out waiting for some commits");
        }
    }
}

async fn run_dashboard(common: CommonArgs, page: usize) -> anyhow::Result<()> {
    let state = Rc::new(RefCell::new(DashboardState::default()));
    let mut loader = PageLoader::new(&common, Rc::clone(&state));

    loader.load(page).await?;
    let page_count = state.borrow().page_count;
    if page > page_count {
        loader.load(page_count).await?;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut loader, &state, &common).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Term,
    loader: &mut PageLoader,
    state: &Rc<RefCell<DashboardState>>,
    common: &CommonArgs,
) -> anyhow::Result<()> {
    loop {
        {
            let s = state.borrow();
            terminal.draw(|f| draw(f, &s, &common.commit_url))?;
        }

        while poll(Duration::ZERO)? {
            let Event::Key(key_event) = read()? else {
                continue;
            };
            let action = handle_key_event(key_event, &mut state.borrow_mut());
            match action {
                Action::Quit => return Ok(()),
                Action::LoadPage(page) => {
                    if let Err(e) = loader.load(page).await {
                        warn!(page, error = %e, "failed to load page");
                        state
                            .borrow_mut()
                            .set_status(format!("Failed to load page {page}: {e:#}"));
                    }
                }
                Action::None => {}
            }
        }

        loader.check_deadline();
        {
            let mut s = state.borrow_mut();
            if matches!(&s.status_message, Some((_, at)) if at.elapsed() > STATUS_TTL) {
                s.status_message = None;
            }
        }

        tokio::time::sleep(FRAME).await;
    }
}

fn draw(f: &mut Frame, state: &DashboardState, commit_url: &str) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Percentage(40),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "RA Analyze Stats",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  page {} of {}  ({} commits)",
            state.page, state.page_count, state.total
        )),
    ]));
    f.render_widget(title, chunks[0]);

    draw_chart(f, chunks[1], state);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    draw_commit_list(f, bottom[0], state);
    draw_projects(f, bottom[1], state, commit_url);

    let status = match &state.status_message {
        Some((msg, _)) => Span::styled(msg.clone(), Style::default().fg(Color::Yellow)),
        None => Span::styled(
            "←/→ page  j/k commit  Tab columns  r reload  h help  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[3]);

    if state.show_help {
        draw_help_overlay(f, size);
    }
}
