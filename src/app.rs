//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main:
//! - installs logging
//! - parses CLI arguments
//! - dispatches to the command handlers

use std::fs;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Command, CrawlArgs, PdfArgs, SummaryArgs, TableArgs};
use crate::error::AppError;
use crate::extract::{AnchorMode, PdfRateKind};
use crate::store::{JsonStore, Store};

pub mod pipeline;

/// Entry point for the `rates` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    // `rates` and `rates --sources x.json` behave like `rates crawl ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Crawl(args) => handle_crawl(args),
        Command::Table(args) => handle_table(args),
        Command::Pdf(args) => handle_pdf(args),
        Command::Summary(args) => handle_summary(args),
    }
}

/// Logs go to stderr so stdout carries only command output.
///
/// Filter from `RATES_LOG`, then `RUST_LOG`, default `info`.
fn init_logging() {
    let filter = std::env::var("RATES_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_crawl(args: CrawlArgs) -> Result<(), AppError> {
    let report = pipeline::run_crawl(&args)?;
    println!("{}", crate::report::format_run_report(&report));
    Ok(())
}

fn handle_table(args: TableArgs) -> Result<(), AppError> {
    let html = fs::read_to_string(&args.file)
        .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", args.file.display())))?;
    let mode = if args.caption { AnchorMode::Caption } else { AnchorMode::Text };
    let table = crate::extract::extract_table(&html, &args.anchor, mode).map_err(|e| AppError::new(4, e.to_string()))?;

    println!("{}", table.header.join(" | "));
    for row in &table.rows {
        println!("{}", row.join(" | "));
    }
    Ok(())
}

fn handle_pdf(args: PdfArgs) -> Result<(), AppError> {
    let bytes =
        fs::read(&args.file).map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", args.file.display())))?;
    let kind = if args.list { PdfRateKind::List } else { PdfRateKind::Average };
    let text = crate::extract::extract_text(&bytes).map_err(|e| AppError::new(4, e.to_string()))?;
    let sets =
        crate::extract::parse_rates(&text, &args.bank, kind, Utc::now()).map_err(|e| AppError::new(4, e.to_string()))?;

    print!("{}", crate::report::format_sets(&sets));
    println!("{} records", sets.len());
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    if !args.store.exists() {
        return Err(AppError::new(2, format!("Store '{}' does not exist.", args.store.display())));
    }
    let store = JsonStore::open(&args.store).map_err(|e| AppError::new(4, e.to_string()))?;
    let rows = crate::report::summarize(&store.interest_sets());
    print!("{}", crate::report::format_summary(&rows));
    Ok(())
}

/// Rewrite argv so `rates` defaults to `rates crawl`.
///
/// Rules:
/// - `rates`                         -> `rates crawl`
/// - `rates --sources x.json ...`    -> `rates crawl --sources x.json ...`
/// - `rates --help/--version/-h`     -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("crawl".to_string());
        return argv;
    };

    if matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help") {
        return argv;
    }
    if arg1.starts_with('-') {
        argv.insert(1, "crawl".to_string());
    }
    argv
}
