//! Per-institution source configuration (the `--sources` JSON file).
//!
//! Which table, path or column holds "the" list rate is decided here, per
//! source, never in the engines.

use serde::Deserialize;

use crate::data::RequestHeaders;
use crate::extract::{AnchorMode, BlobAnchor, ColumnRef, JsonPath, PdfRateKind};
use crate::normalize::MonthFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub bank: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub documents: Vec<DocumentConfig>,
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    /// Reject configurations that could never produce a record.
    pub fn validate(&self) -> Result<(), String> {
        if self.bank.trim().is_empty() {
            return Err("source with an empty bank name".to_string());
        }
        if self.documents.is_empty() {
            return Err(format!("{}: no documents configured", self.bank));
        }
        for doc in &self.documents {
            if doc.url().trim().is_empty() {
                return Err(format!("{}: document without url", self.bank));
            }
            if let Some(fields) = doc.fields() {
                fields.validate().map_err(|e| format!("{}: {e}", self.bank))?;
            }
        }
        Ok(())
    }
}

/// One document of a source, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentConfig {
    HtmlTable(HtmlTableDocument),
    Json(JsonDocument),
    IndexedJson(IndexedJsonDocument),
    Pdf(PdfDocument),
}

impl DocumentConfig {
    pub fn url(&self) -> &str {
        match self {
            DocumentConfig::HtmlTable(doc) => &doc.url,
            DocumentConfig::Json(doc) => &doc.url,
            DocumentConfig::IndexedJson(doc) => &doc.url,
            DocumentConfig::Pdf(doc) => &doc.url,
        }
    }

    fn fields(&self) -> Option<&FieldMap> {
        match self {
            DocumentConfig::Json(doc) => Some(&doc.fields),
            DocumentConfig::IndexedJson(doc) => Some(&doc.fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlTableDocument {
    pub url: String,
    #[serde(default)]
    pub headers: RequestHeaders,
    pub anchor: String,
    #[serde(default)]
    pub anchor_mode: AnchorMode,
    pub layout: TableLayout,
}

/// How the rows and columns of a located table map to records.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableLayout {
    /// One row per term: a term cell and a rate cell.
    ///
    /// With `union_discount` set the rows are union-discounted rates carrying
    /// that flag; otherwise they are list rates.
    TermRows {
        term_column: ColumnRef,
        rate_column: ColumnRef,
        #[serde(default)]
        changed_on_column: Option<ColumnRef>,
        #[serde(default)]
        union_discount: Option<bool>,
    },
    /// One row per month of average rates; the first column is the period,
    /// the other header cells are terms.
    MonthRows {
        #[serde(default = "default_month_format")]
        month_format: MonthFormat,
    },
    /// One row per term; every other header cell is an LTV bracket.
    RatioColumns { term_column: ColumnRef },
}

fn default_month_format() -> MonthFormat {
    MonthFormat::Any
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonDocument {
    pub url: String,
    #[serde(default)]
    pub headers: RequestHeaders,
    /// Where the JSON sits inside an HTML page; absent for plain JSON APIs.
    #[serde(default)]
    pub blob: Option<BlobAnchor>,
    pub path: JsonPath,
    #[serde(flatten)]
    pub fields: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexedJsonDocument {
    pub url: String,
    #[serde(default)]
    pub headers: RequestHeaders,
    pub blob: BlobAnchor,
    #[serde(flatten)]
    pub fields: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfDocument {
    pub url: String,
    #[serde(default)]
    pub headers: RequestHeaders,
    #[serde(default)]
    pub rate_kind: PdfRateKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordRateType {
    List,
    Average,
}

/// Which record fields hold term, rate and period.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMap {
    pub rate_type: RecordRateType,
    pub term_field: String,
    pub rate_field: String,
    #[serde(default)]
    pub changed_on_field: Option<String>,
    #[serde(default)]
    pub month_field: Option<String>,
    /// When set, the period is `"<year> <month>"` built from two fields.
    #[serde(default)]
    pub year_field: Option<String>,
    #[serde(default = "default_month_format")]
    pub month_format: MonthFormat,
}

impl FieldMap {
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_type == RecordRateType::Average && self.month_field.is_none() {
            return Err("average rates need a month_field".to_string());
        }
        if self.year_field.is_some() && self.month_field.is_none() {
            return Err("year_field without month_field".to_string());
        }
        Ok(())
    }

    /// Every key a record must carry to be considered.
    pub fn required_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.term_field.as_str(), self.rate_field.as_str()];
        if self.rate_type == RecordRateType::Average {
            keys.extend(self.month_field.as_deref());
            keys.extend(self.year_field.as_deref());
        }
        keys
    }
}
