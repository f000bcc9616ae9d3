use crate::aggregate::percent;
use crate::cli::CommonArgs;
use crate::load::{load_page, run_local, LoadedPage};
use crate::model::{short_project_name, CommitAggregate, CommitsOutput, StatEntry, SCHEMA_VERSION};
use chrono::{Local, Utc};
use console::{style, Term};

pub fn exec(
    common: CommonArgs,
    page: usize,
    json: bool,
    ndjson: bool,
    timings: bool,
) -> anyhow::Result<()> {
    let show_progress = !json && !ndjson && Term::stderr().is_term();
    let loaded = run_local(load_page(&common, page, show_progress))??;

    if json {
        output_json(&loaded)?;
    } else if ndjson {
        output_ndjson(&loaded)?;
    } else {
        output_table(&loaded, &common, timings)?;
    }

    Ok(())
}

pub fn output_json(loaded: &LoadedPage) -> anyhow::Result<()> {
    let output = CommitsOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        page: loaded.page,
        page_count: loaded.page_count,
        page_size: loaded.page_size,
        total_commits: loaded.total,
        commits: loaded.commits.clone(),
        failed: loaded.failed.clone(),
        pending: loaded.pending.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn output_ndjson(loaded: &LoadedPage) -> anyhow::Result<()> {
    for commit in &loaded.commits {
        println!("{}", serde_json::to_string(commit)?);
    }
    Ok(())
}

pub fn format_commit_time(commit: &CommitAggregate) -> String {
    commit
        .committed_at()
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| commit.timestamp.to_string())
}

fn output_table(loaded: &LoadedPage, common: &CommonArgs, timings: bool) -> anyhow::Result<()> {
    println!(
        "{} page {} of {} ({} commits)",
        style("RA Analyze Stats").bold(),
        loaded.page,
        loaded.page_count,
        loaded.total
    );

    if loaded.commits.is_empty() && loaded.failed.is_empty() && loaded.pending.is_empty() {
        println!("No commits to display");
        return Ok(());
    }

    for commit in &loaded.commits {
        output_commit(commit, common, timings);
    }

    if !loaded.failed.is_empty() {
        println!("\n{}", style("Failed to load").red().bold());
        for f in &loaded.failed {
            println!("  @{} {}", f.commit_sha, style(&f.message).dim());
        }
    }
    if !loaded.pending.is_empty() {
        println!("\n{}", style("Still pending").yellow().bold());
        for sha in &loaded.pending {
            println!("  @{sha}");
        }
    }

    Ok(())
}

fn output_commit(commit: &CommitAggregate, common: &CommonArgs, timings: bool) {
    let totals = &commit.totals;
    let unknown = totals.total_unknown + totals.total_partial;

    println!();
    println!(
        "{} {}",
        style(format!("@{}", commit.commit_sha)).cyan().bold(),
        style(format!("{}{}", common.commit_url, commit.commit_sha)).dim()
    );
    println!(
        "  Commit Time: {}  Total Expression: {}  Total Unknown + Partial: {} ({})",
        format_commit_time(commit),
        totals.total_expressions,
        unknown,
        percent(unknown, totals.total_expressions)
    );

    if timings {
        println!(
            "  {:<28} {:>6} {:>16} {:>20} {:>10} {:>14} {:>10}",
            style("Project Name").bold(),
            style("Roots").bold(),
            style("Crates [Modules]").bold(),
            style("Database Loaded(ms)").bold(),
            style("Items(ms)").bold(),
            style("Inference(ms)").bold(),
            style("Total(ms)").bold()
        );
    } else {
        println!(
            "  {:<28} {:>6} {:>16} {:>8} {:>8} {:>9} {:>18} {:>18} {:>10}",
            style("Project Name").bold(),
            style("Roots").bold(),
            style("Crates [Modules]").bold(),
            style("Decl").bold(),
            style("Func").bold(),
            style("Expr").bold(),
            style("Unknown").bold(),
            style("Partial").bold(),
            style("Mismatches").bold()
        );
    }
    println!("  {}", "─".repeat(if timings { 112 } else { 130 }));

    for entry in &commit.stats {
        println!("  {}", project_row(entry, timings));
    }
}

/// One table row for a project, in either the syntax or the timing layout.
pub fn project_row(entry: &StatEntry, timings: bool) -> String {
    let name = short_project_name(entry.project_name());
    match entry {
        StatEntry::Success(s) => {
            let crates = format!("{} [{}]", s.crates, s.modules);
            if timings {
                format!(
                    "{:<28} {:>6} {:>16} {:>20} {:>10} {:>14} {:>10}",
                    name,
                    s.roots,
                    crates,
                    s.database_loaded_time.as_millis(),
                    s.item_collection_time.as_millis(),
                    s.inference_time.as_millis(),
                    s.total_time.as_millis()
                )
            } else {
                format!(
                    "{:<28} {:>6} {:>16} {:>8} {:>8} {:>9} {:>18} {:>18} {:>10}",
                    name,
                    s.roots,
                    crates,
                    s.declarations,
                    s.functions,
                    s.expressions,
                    format!(
                        "{} ({})",
                        s.unknown_types,
                        percent(s.unknown_types, s.expressions)
                    ),
                    format!(
                        "{} ({})",
                        s.partial_unknown_types,
                        percent(s.partial_unknown_types, s.expressions)
                    ),
                    s.type_mismatches
                )
            }
        }
        StatEntry::Failure(f) => format!("{:<28} {}", name, style(&f.message).red()),
    }
}
