use crate::cli::CommonArgs;
use crate::load::{load_page, run_local, LoadedPage};
use crate::model::{short_sha, TrendOutput, TrendPoint, SCHEMA_VERSION};
use chrono::Utc;
use console::{style, Term};

const LEVELS: [&str; 8] = ["▁", "▂", "▃", "▄", "▅", "▆", "▇", "█"];
const BAR_WIDTH: usize = 40;

pub fn exec(common: CommonArgs, page: usize, json: bool) -> anyhow::Result<()> {
    let show_progress = !json && Term::stderr().is_term();
    let loaded = run_local(load_page(&common, page, show_progress))??;
    let points = trend_points(&loaded);

    if json {
        output_json(&loaded, points)?;
    } else {
        output_trend(&loaded, &points)?;
    }
    Ok(())
}

/// Chart points oldest first, the reverse of the page order.
pub fn trend_points(loaded: &LoadedPage) -> Vec<TrendPoint> {
    loaded.commits.iter().rev().map(TrendPoint::from).collect()
}

fn output_json(loaded: &LoadedPage, points: Vec<TrendPoint>) -> anyhow::Result<()> {
    let output = TrendOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        page: loaded.page,
        page_count: loaded.page_count,
        points,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Horizontal bar of `rate` relative to `max`, `BAR_WIDTH` cells wide.
pub fn rate_bar(rate: f64, max: f64) -> String {
    if max <= 0.0 || rate <= 0.0 {
        return String::new();
    }
    let ratio = (rate / max).clamp(0.0, 1.0);
    let full = (ratio * BAR_WIDTH as f64).floor() as usize;
    let frac = ratio * BAR_WIDTH as f64 - full as f64;
    let mut bar = "█".repeat(full);
    if full < BAR_WIDTH && frac > 0.0 {
        let top = LEVELS.len() - 1;
        let idx = ((frac * top as f64).round() as usize).min(top);
        bar.push_str(LEVELS[idx]);
    }
    bar
}

fn output_trend(loaded: &LoadedPage, points: &[TrendPoint]) -> anyhow::Result<()> {
    if points.is_empty() {
        println!("No data to display");
        return Ok(());
    }

    let max_rate = points.iter().map(|p| p.error_rate).fold(0.0_f64, f64::max);

    println!(
        "{} page {} of {}",
        style("Unknown + Partial (%)").bold(),
        loaded.page,
        loaded.page_count
    );
    println!("{}", "─".repeat(70));

    for p in points {
        println!(
            "{:<10} {:>7.2}% {}",
            short_sha(&p.commit_sha),
            p.error_rate,
            style(rate_bar(p.error_rate, max_rate)).blue()
        );
    }

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let delta = last.error_rate - first.error_rate;
        let delta = if delta > 0.0 {
            style(format!("+{delta:.2}")).red()
        } else {
            style(format!("{delta:.2}")).green()
        };
        println!("\nChange over page: {delta} percentage points");
    }

    let missing = loaded.failed.len() + loaded.pending.len();
    if missing > 0 {
        let note = format!("{missing} commit(s) missing from the chart");
        println!("{}", style(note).yellow());
    }

    Ok(())
}
