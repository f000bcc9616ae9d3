use crate::model::PAGE_SIZE;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COMMIT_URL: &str = "https://github.com/rust-analyzer/rust-analyzer/commit/";

#[derive(Parser)]
#[command(name = "rastats")]
#[command(about = "Browse rust-analyzer analysis-stats results across commits")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(
        long,
        default_value = "data",
        help = "Directory holding commits.json and <sha>.json stats files"
    )]
    pub data: PathBuf,

    #[arg(
        long,
        default_value_t = PAGE_SIZE,
        value_parser = parse_page_size,
        help = "Commits per page"
    )]
    pub page_size: usize,

    #[arg(
        long,
        default_value = "30s",
        value_parser = humantime::parse_duration,
        help = "How long a page waits for outstanding commits (e.g. 30s, 2m)"
    )]
    pub timeout: Duration,

    #[arg(long, default_value = DEFAULT_COMMIT_URL, help = "Base URL for commit links")]
    pub commit_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-commit totals and per-project statistics for one page
    Commits {
        #[arg(
            long,
            default_value_t = 1,
            value_parser = parse_page,
            help = "Page number, starting at 1"
        )]
        page: usize,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, help = "Show timing columns instead of syntax columns")]
        timings: bool,
    },
    /// Error-rate trend for one page, oldest commit first
    Trend {
        #[arg(
            long,
            default_value_t = 1,
            value_parser = parse_page,
            help = "Page number, starting at 1"
        )]
        page: usize,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Interactive dashboard with chart, commit list and pagination
    #[command(alias = "tui", alias = "ui")]
    Dashboard {
        #[arg(
            long,
            default_value_t = 1,
            value_parser = parse_page,
            help = "Page number, starting at 1"
        )]
        page: usize,

        #[arg(long, help = "Write logs to this file")]
        log_file: Option<PathBuf>,
    },
}

fn parse_page_size(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("page size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_page(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("pages are numbered from 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Commits {
                page,
                json,
                ndjson,
                timings,
            } => {
                crate::logging::init_stderr();
                crate::commits::exec(self.common, page, json, ndjson, timings)
            }
            Commands::Trend { page, json } => {
                crate::logging::init_stderr();
                crate::trend::exec(self.common, page, json)
            }
            Commands::Dashboard { page, log_file } => {
                crate::logging::init_file(log_file.as_deref())?;
                crate::tui::run(&self.common, page)
            }
        }
    }
}
