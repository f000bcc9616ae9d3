use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use ratatui::Frame;

use crate::aggregate::percent;
use crate::model::short_sha;

use super::super::draw::{rate_style, status_label};
use super::super::layout::visible_range;
use super::super::state::{DashboardState, RowStatus};
use super::header_cell;

/// Render the commits of the current page with their totals.
pub fn draw_commit_list(f: &mut Frame, area: Rect, state: &DashboardState) {
    let max_rate = state
        .rows
        .iter()
        .filter_map(|r| match &r.status {
            RowStatus::Ready(c) => Some(c.totals.error_rate),
            _ => None,
        })
        .fold(0.0_f64, f64::max);

    let height = area.height.saturating_sub(3) as usize;
    let range = visible_range(state.rows.len(), state.selected, height);

    let rows: Vec<Row> = state.rows[range.clone()]
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let is_selected = range.start + i == state.selected;
            let sha_cell = if is_selected {
                Cell::from(format!("{} ◄", short_sha(&row.sha))).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Cell::from(short_sha(&row.sha).to_string())
                    .style(Style::default().fg(Color::Cyan))
            };

            let time = chrono::DateTime::from_timestamp(row.timestamp, 0)
                .map(|t| {
                    t.with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                })
                .unwrap_or_else(|| row.timestamp.to_string());

            let (label, label_style) = status_label(&row.status);
            let (exprs, unknown, rate) = match &row.status {
                RowStatus::Ready(c) => {
                    let unknown = c.totals.total_unknown + c.totals.total_partial;
                    (
                        Cell::from(c.totals.total_expressions.to_string()),
                        Cell::from(format!(
                            "{} ({})",
                            unknown,
                            percent(unknown, c.totals.total_expressions)
                        )),
                        Cell::from(format!("{:.2}%", c.totals.error_rate))
                            .style(rate_style(c.totals.error_rate, max_rate)),
                    )
                }
                _ => (
                    Cell::from("-"),
                    Cell::from("-"),
                    Cell::from(label).style(label_style),
                ),
            };

            Row::new(vec![sha_cell, Cell::from(time), exprs, unknown, rate])
        })
        .collect();

    let mut table_state = TableState::default();
    if !state.rows.is_empty() {
        table_state.select(Some(state.selected - range.start));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Length(17),
            Constraint::Length(10),
            Constraint::Min(16),
            Constraint::Length(9),
        ],
    )
    .header(Row::new([
        header_cell("Commit", Color::Yellow),
        header_cell("Time", Color::Yellow),
        header_cell("Expr", Color::Yellow),
        header_cell("Unknown+Partial", Color::Yellow),
        header_cell("Rate", Color::Yellow),
    ]))
    .block(
        Block::default()
            .title(format!(
                "Commits - page {}/{} ({} total, {} loading)",
                state.page,
                state.page_count,
                state.total,
                state.pending_count()
            ))
            .borders(Borders::ALL),
    );

    f.render_stateful_widget(table, area, &mut table_state);
}
