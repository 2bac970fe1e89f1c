//! A source driven entirely by its JSON configuration.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::{DocumentConfig, SourceConfig, TableLayout};
use super::convert::{self, TermRowColumns};
use super::{Emitter, RunContext, Source};
use crate::data::Fetcher;
use crate::domain::InterestSet;
use crate::error::ExtractError;
use crate::extract::{extract_table, extract_text, parse_rates};

pub struct ConfiguredSource {
    bank: String,
    documents: Vec<DocumentConfig>,
    fetcher: Arc<dyn Fetcher>,
}

impl ConfiguredSource {
    pub fn new(config: SourceConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            bank: config.bank,
            documents: config.documents,
            fetcher,
        }
    }

    fn crawl_document(&self, doc: &DocumentConfig, ctx: &RunContext) -> Result<Vec<InterestSet>, ExtractError> {
        let bank = self.bank.as_str();
        let crawled_at = ctx.crawled_at;
        match doc {
            DocumentConfig::HtmlTable(doc) => {
                let body = self.fetcher.fetch(&doc.url, &doc.headers)?;
                let table = extract_table(&body, &doc.anchor, doc.anchor_mode)?;
                debug!(bank, url = %doc.url, rows = table.rows.len(), "table located");
                match &doc.layout {
                    TableLayout::TermRows {
                        term_column,
                        rate_column,
                        changed_on_column,
                        union_discount,
                    } => convert::term_rows(
                        &table,
                        TermRowColumns {
                            term: term_column,
                            rate: rate_column,
                            changed_on: changed_on_column.as_ref(),
                            union_discount: *union_discount,
                        },
                        bank,
                        crawled_at,
                    ),
                    TableLayout::MonthRows { month_format } => {
                        convert::month_rows(&table, *month_format, bank, crawled_at)
                    }
                    TableLayout::RatioColumns { term_column } => {
                        convert::ratio_columns(&table, term_column, bank, crawled_at)
                    }
                }
            }
            DocumentConfig::Json(doc) => {
                let body = self.fetcher.fetch(&doc.url, &doc.headers)?;
                convert::json_document(&body, doc, bank, crawled_at)
            }
            DocumentConfig::IndexedJson(doc) => {
                let body = self.fetcher.fetch(&doc.url, &doc.headers)?;
                convert::indexed_document(&body, doc, bank, crawled_at)
            }
            DocumentConfig::Pdf(doc) => {
                let bytes = self.fetcher.fetch_raw(&doc.url, &doc.headers)?;
                let text = extract_text(&bytes)?;
                parse_rates(&text, bank, doc.rate_kind, crawled_at)
            }
        }
    }
}

impl Source for ConfiguredSource {
    fn name(&self) -> &str {
        &self.bank
    }

    fn crawl(&self, ctx: &RunContext, out: &Emitter) {
        for doc in &self.documents {
            match self.crawl_document(doc, ctx) {
                Ok(sets) => {
                    if sets.is_empty() {
                        warn!(url = doc.url(), "document yielded no records");
                    } else {
                        info!(url = doc.url(), records = sets.len(), "document extracted");
                    }
                    out.emit_all(sets);
                }
                Err(err) => warn!(url = doc.url(), error = %err, "document skipped"),
            }
        }
    }
}

/// One adapter per enabled source, all sharing `fetcher`.
pub fn build_sources(configs: Vec<SourceConfig>, fetcher: Arc<dyn Fetcher>) -> Vec<Box<dyn Source>> {
    configs
        .into_iter()
        .filter(|config| {
            if !config.enabled {
                info!(bank = %config.bank, "source disabled");
            }
            config.enabled
        })
        .map(|config| Box::new(ConfiguredSource::new(config, Arc::clone(&fetcher))) as Box<dyn Source>)
        .collect()
}
