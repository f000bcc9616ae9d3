use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs};
use ratatui::Frame;

use crate::aggregate::percent;
use crate::model::{short_project_name, CommitAggregate, StatEntry};

use super::super::state::{DashboardState, DetailTab, RowStatus};
use super::header_cell;
use crate::commits::format_commit_time;

/// Per-project table of the selected commit, with a Syntax / Time(ms) switch.
pub fn draw_projects(f: &mut Frame, area: Rect, state: &DashboardState, commit_url: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let Some(row) = state.selected_row() else {
        let placeholder = Paragraph::new("No commit selected")
            .block(Block::default().title("Projects").borders(Borders::ALL));
        f.render_widget(placeholder, area);
        return;
    };

    let commit = match &row.status {
        RowStatus::Ready(c) => c,
        RowStatus::Pending => {
            let loading = Paragraph::new(format!("Loading @{} ...", row.sha))
                .block(Block::default().title("Projects").borders(Borders::ALL));
            f.render_widget(loading, area);
            return;
        }
        RowStatus::Failed(msg) => {
            let failed = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("Failed to load @{}", row.sha),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(msg.clone()),
            ])
            .block(Block::default().title("Projects").borders(Borders::ALL));
            f.render_widget(failed, area);
            return;
        }
    };

    let unknown = commit.totals.total_unknown + commit.totals.total_partial;
    let summary = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!("@{}", commit.commit_sha),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {commit_url}{}", commit.commit_sha),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!("Commit Time: {}  ", format_commit_time(commit))),
            Span::raw(format!("Total Expression: {}  ", commit.totals.total_expressions)),
            Span::styled(
                format!(
                    "Total Unknown + Partial: {} ({})",
                    unknown,
                    percent(unknown, commit.totals.total_expressions)
                ),
                Style::default().fg(Color::Yellow),
            ),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(summary, chunks[0]);

    let tabs = Tabs::new(vec!["Syntax", "Time(ms)"])
        .block(Block::default().borders(Borders::ALL).title("Columns"))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .select(state.tab.index());
    f.render_widget(tabs, chunks[1]);

    f.render_widget(project_table(commit, state.tab), chunks[2]);
}

fn project_table(commit: &CommitAggregate, tab: DetailTab) -> Table<'static> {
    let columns: &[&str] = match tab {
        DetailTab::Syntax => &["Decl", "Func", "Expr", "Unknown", "Partial", "Mismatches"],
        DetailTab::Timings => &["Database Loaded", "Items", "Inference", "Total"],
    };

    let mut header = vec![
        header_cell("Project Name", Color::Yellow),
        header_cell("Roots", Color::Yellow),
        header_cell("Crates [Modules]", Color::Yellow),
    ];
    header.extend(columns.iter().map(|c| header_cell(c, Color::Yellow)));

    let rows: Vec<Row> = commit
        .stats
        .iter()
        .map(|entry| {
            let name = short_project_name(entry.project_name()).to_string();
            match entry {
                StatEntry::Success(s) => {
                    let mut cells = vec![
                        Cell::from(name),
                        Cell::from(s.roots.to_string()),
                        Cell::from(format!("{} [{}]", s.crates, s.modules)),
                    ];
                    match tab {
                        DetailTab::Syntax => cells.extend([
                            Cell::from(s.declarations.to_string()),
                            Cell::from(s.functions.to_string()),
                            Cell::from(s.expressions.to_string()),
                            Cell::from(format!(
                                "{} ({})",
                                s.unknown_types,
                                percent(s.unknown_types, s.expressions)
                            )),
                            Cell::from(format!(
                                "{} ({})",
                                s.partial_unknown_types,
                                percent(s.partial_unknown_types, s.expressions)
                            )),
                            Cell::from(s.type_mismatches.to_string()),
                        ]),
                        DetailTab::Timings => cells.extend([
                            Cell::from(s.database_loaded_time.as_millis().to_string()),
                            Cell::from(s.item_collection_time.as_millis().to_string()),
                            Cell::from(s.inference_time.as_millis().to_string()),
                            Cell::from(s.total_time.as_millis().to_string()),
                        ]),
                    }
                    Row::new(cells)
                }
                StatEntry::Failure(failure) => Row::new(vec![
                    Cell::from(name),
                    Cell::from(failure.message.clone())
                        .style(Style::default().fg(Color::Red)),
                ]),
            }
        })
        .collect();

    let mut widths = vec![
        Constraint::Min(18),
        Constraint::Length(6),
        Constraint::Length(17),
    ];
    widths.extend(columns.iter().map(|_| Constraint::Min(8)));

    Table::new(rows, widths)
        .header(Row::new(header))
        .block(
            Block::default()
                .title(format!("Projects ({})", commit.stats.len()))
                .borders(Borders::ALL),
        )
}
