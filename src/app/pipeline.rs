//! The crawl workflow shared by the `crawl` command and tests:
//! config -> sources -> scheduler -> store -> export.

use std::sync::Arc;

use tracing::info;

use crate::cli::CrawlArgs;
use crate::config::{HttpConfig, load_sources};
use crate::crawl::{RunReport, run_sources};
use crate::data::{Fetcher, HttpFetcher};
use crate::error::AppError;
use crate::sources::{RunContext, SourceConfig, build_sources};
use crate::store::{JsonStore, MemoryStore, Store};

/// Keep only the requested banks; unknown names are a configuration error.
pub fn select_sources(configs: Vec<SourceConfig>, only: &[String]) -> Result<Vec<SourceConfig>, AppError> {
    if only.is_empty() {
        return Ok(configs);
    }
    if let Some(missing) = only.iter().find(|name| !configs.iter().any(|c| &c.bank == *name)) {
        return Err(AppError::new(2, format!("Unknown bank '{missing}' in --only.")));
    }
    Ok(configs.into_iter().filter(|c| only.contains(&c.bank)).collect())
}

/// Run a crawl with `fetcher` into `store`, then export if requested.
pub fn run_crawl_with(
    args: &CrawlArgs,
    fetcher: Arc<dyn Fetcher>,
    store: &mut dyn Store,
) -> Result<RunReport, AppError> {
    let configs = select_sources(load_sources(&args.sources)?, &args.only)?;
    let sources = build_sources(configs, fetcher);
    info!(sources = sources.len(), path = %args.sources.display(), "sources loaded");

    let report = run_sources(&sources, store, &RunContext::now())?;

    if let Some(path) = &args.export_csv {
        crate::io::write_snapshot_csv(path, &store.interest_sets())?;
        info!(path = %path.display(), "snapshot exported");
    }
    Ok(report)
}

/// `rates crawl`: HTTP fetcher from env + flags, JSON or memory store.
pub fn run_crawl(args: &CrawlArgs) -> Result<RunReport, AppError> {
    let http = HttpConfig::from_env()?.with_overrides(args.timeout_secs, args.user_agent.clone())?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(http.timeout, &http.user_agent)?);

    match &args.store {
        Some(path) => {
            let mut store = JsonStore::open(path).map_err(|e| AppError::new(4, e.to_string()))?;
            run_crawl_with(args, fetcher, &mut store)
        }
        None => run_crawl_with(args, fetcher, &mut MemoryStore::new()),
    }
}
