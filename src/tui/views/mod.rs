use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Cell;

mod chart;
mod commits;
mod help;
mod projects;

pub use chart::draw_chart;
pub use commits::draw_commit_list;
pub use help::draw_help_overlay;
pub use projects::draw_projects;

/// Convenience helper to build a styled table header cell.
pub(crate) fn header_cell(text: &str, color: Color) -> Cell<'static> {
    Cell::from(text.to_string())
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
}
