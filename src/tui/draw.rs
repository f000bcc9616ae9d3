use ratatui::style::{Color, Modifier, Style};

use super::state::RowStatus;

/// Colour an error rate relative to the worst rate on the page.
pub fn rate_style(rate: f64, max: f64) -> Style {
    if max <= 0.0 {
        return Style::default().fg(Color::White);
    }

    let ratio = rate / max;
    if ratio > 0.9 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if ratio > 0.7 {
        Style::default().fg(Color::Yellow)
    } else if ratio > 0.4 {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Green)
    }
}

pub fn status_label(status: &RowStatus) -> (&'static str, Style) {
    match status {
        RowStatus::Pending => ("loading", Style::default().fg(Color::DarkGray)),
        RowStatus::Ready(_) => ("ok", Style::default().fg(Color::Green)),
        RowStatus::Failed(_) => ("failed", Style::default().fg(Color::Red)),
    }
}
