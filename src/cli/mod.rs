//! Command-line parsing for the `rates` binary.
//!
//! Parsing stays here; dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rates", version, about = "Mortgage rate harvester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl every configured source and store the results.
    Crawl(CrawlArgs),
    /// Locate and print a table from a local HTML file.
    Table(TableArgs),
    /// Print the records a local PDF yields.
    Pdf(PdfArgs),
    /// Print the per-bank summary of a stored snapshot.
    Summary(SummaryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CrawlArgs {
    /// Sources configuration (JSON).
    #[arg(long, value_name = "JSON", default_value = "sources.json")]
    pub sources: PathBuf,

    /// JSON snapshot to upsert into; memory only when omitted.
    #[arg(long, value_name = "JSON")]
    pub store: Option<PathBuf>,

    /// Also write the full snapshot to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Per-request timeout (overrides RATES_HTTP_TIMEOUT_SECS).
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// HTTP user agent (overrides RATES_USER_AGENT).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Crawl only these banks (repeatable).
    #[arg(long = "only", value_name = "BANK")]
    pub only: Vec<String>,
}

#[derive(Debug, Args)]
pub struct TableArgs {
    /// Saved HTML page.
    #[arg(long, value_name = "HTML")]
    pub file: PathBuf,

    /// Anchor phrase.
    #[arg(long)]
    pub anchor: String,

    /// Match the anchor against `<caption>` instead of preceding text.
    #[arg(long)]
    pub caption: bool,
}

#[derive(Debug, Args)]
pub struct PdfArgs {
    /// Saved PDF document.
    #[arg(long, value_name = "PDF")]
    pub file: PathBuf,

    /// Bank name stamped on the records.
    #[arg(long)]
    pub bank: String,

    /// Rows are list-rate change dates instead of average-rate months.
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// JSON snapshot written by `rates crawl --store`.
    #[arg(long, value_name = "JSON")]
    pub store: PathBuf,
}
