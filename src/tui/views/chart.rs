use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use super::super::state::{DashboardState, GraphState};

/// Error-rate line chart for the page, or a progress line while it loads.
pub fn draw_chart(f: &mut Frame, area: Rect, state: &DashboardState) {
    let block = Block::default()
        .title("Unknown + Partial (%)")
        .borders(Borders::ALL);

    let (points, missing) = match &state.graph {
        GraphState::Loading { received, expected } => {
            let loading = Paragraph::new(format!("Loading graph ... {received} / {expected}"))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(loading, area);
            return;
        }
        GraphState::Ready { points, missing } => (points, *missing),
    };

    if points.is_empty() {
        let empty = Paragraph::new("No commits on this page")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, rate))| (i as f64, *rate))
        .collect();
    let max_rate = points.iter().map(|(_, r)| *r).fold(0.0_f64, f64::max);
    let y_max = if max_rate > 0.0 { max_rate * 1.1 } else { 1.0 };
    let x_max = points.len().saturating_sub(1).max(1) as f64;

    let label = |point: Option<&(String, f64)>| point.map(|(sha, _)| sha.clone());
    let first = label(points.first()).unwrap_or_default();
    let last = label(points.last()).unwrap_or_default();

    let dataset = Dataset::default()
        .name("error rate")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Blue))
        .data(&data);

    let title = if missing > 0 {
        format!("Unknown + Partial (%) - {missing} commit(s) missing")
    } else {
        "Unknown + Partial (%)".to_string()
    };

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::raw("0%"),
                    Span::raw(format!("{:.2}%", y_max / 2.0)),
                    Span::raw(format!("{y_max:.2}%")),
                ]),
        );

    f.render_widget(chart, area);
}
