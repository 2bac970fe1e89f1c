//! Extracted rows and records to `InterestSet`s.
//!
//! Document-level problems (a configured column missing from the header, no
//! term columns at all) are `ExtractError`s; everything else skips one row or
//! cell and is logged.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::config::{FieldMap, IndexedJsonDocument, JsonDocument, RecordRateType};
use crate::domain::{InterestSet, RatioBoundaries, Term};
use crate::error::{ExtractError, FieldError};
use crate::extract::payload::field_text;
use crate::extract::{ColumnRef, IndexedPayload, ParsedTable, extract_blob, resolve_records, sanitize_split_rows};
use crate::normalize::{MonthFormat, parse_iso_date, parse_rate, parse_ratio_bracket, parse_term};

fn skipped(bank: &str, what: &str, err: &FieldError) {
    match err {
        FieldError::NotATerm(_) | FieldError::NotPublished(_) => debug!(bank, what, %err, "skipped"),
        _ => warn!(bank, what, %err, "skipped"),
    }
}

fn column_index(table: &ParsedTable, column: &ColumnRef) -> Result<usize, ExtractError> {
    table.column(column).ok_or_else(|| {
        ExtractError::shape(match column {
            ColumnRef::Index(idx) => format!("column {idx} beyond a {}-column header", table.header.len()),
            ColumnRef::Header(name) => format!("no column '{name}' in header {:?}", table.header),
        })
    })
}

fn cell(row: &[String], idx: usize) -> Result<&str, FieldError> {
    row.get(idx).map(String::as_str).ok_or(FieldError::Empty)
}

/// Accepts `2025-10-01` and timestamps starting with it.
fn parse_changed_on(raw: &str) -> Result<NaiveDate, FieldError> {
    let date_part = raw.trim().split(['T', ' ']).next().unwrap_or(raw);
    parse_iso_date(date_part)
}

/// Column layout settings for term-per-row tables.
#[derive(Debug, Clone, Copy)]
pub struct TermRowColumns<'a> {
    pub term: &'a ColumnRef,
    pub rate: &'a ColumnRef,
    pub changed_on: Option<&'a ColumnRef>,
    pub union_discount: Option<bool>,
}

/// A table with one term per row.
pub fn term_rows(
    table: &ParsedTable,
    columns: TermRowColumns<'_>,
    bank: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<InterestSet>, ExtractError> {
    let term_idx = column_index(table, columns.term)?;
    let rate_idx = column_index(table, columns.rate)?;
    let changed_idx = columns.changed_on.map(|c| column_index(table, c)).transpose()?;

    let mut out = Vec::new();
    for row in &table.rows {
        let parsed = (|| -> Result<InterestSet, FieldError> {
            let term = parse_term(cell(row, term_idx)?)?;
            let rate = parse_rate(cell(row, rate_idx)?)?;
            match columns.union_discount {
                Some(flag) => InterestSet::union_discounted_rate(bank, term, rate, flag, crawled_at),
                None => {
                    let changed_on = changed_idx.map(|idx| parse_changed_on(cell(row, idx)?)).transpose()?;
                    InterestSet::list_rate(bank, term, rate, changed_on, crawled_at)
                }
            }
        })();
        match parsed {
            Ok(set) => out.push(set),
            Err(err) => skipped(bank, "table row", &err),
        }
    }
    Ok(out)
}

/// A table with one month per row and one term per column.
pub fn month_rows(
    table: &ParsedTable,
    month_format: MonthFormat,
    bank: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<InterestSet>, ExtractError> {
    let terms: Vec<Option<Term>> = table
        .header
        .iter()
        .skip(1)
        .map(|label| match parse_term(label) {
            Ok(term) => Some(term),
            Err(err) => {
                skipped(bank, "header column", &err);
                None
            }
        })
        .collect();
    if terms.iter().all(Option::is_none) {
        return Err(ExtractError::shape(format!("no term columns in header {:?}", table.header)));
    }

    let rows = sanitize_split_rows(table.rows.clone(), |c| month_format.parse(c).is_ok());
    let mut out = Vec::new();
    for row in &rows {
        let Some(period) = row.first() else { continue };
        let month = match month_format.parse(period) {
            Ok(month) => month,
            Err(err) => {
                skipped(bank, "period cell", &err);
                continue;
            }
        };
        for (value, term) in row.iter().skip(1).zip(terms.iter()) {
            let Some(term) = *term else { continue };
            match parse_rate(value).and_then(|rate| InterestSet::average_rate(bank, term, rate, month, crawled_at)) {
                Ok(set) => out.push(set),
                Err(err) => skipped(bank, "average cell", &err),
            }
        }
    }
    Ok(out)
}

/// A table with one term per row and one LTV bracket per column.
pub fn ratio_columns(
    table: &ParsedTable,
    term_column: &ColumnRef,
    bank: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<InterestSet>, ExtractError> {
    let term_idx = column_index(table, term_column)?;
    let brackets: Vec<(usize, RatioBoundaries)> = table
        .header
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != term_idx)
        .filter_map(|(idx, label)| parse_ratio_bracket(label).ok().map(|b| (idx, b)))
        .collect();
    if brackets.is_empty() {
        return Err(ExtractError::shape(format!("no LTV brackets in header {:?}", table.header)));
    }

    let mut out = Vec::new();
    for row in &table.rows {
        let term = match cell(row, term_idx).and_then(parse_term) {
            Ok(term) => term,
            Err(err) => {
                skipped(bank, "table row", &err);
                continue;
            }
        };
        for (idx, boundaries) in &brackets {
            let parsed = cell(row, *idx)
                .and_then(parse_rate)
                .and_then(|rate| InterestSet::ratio_discounted_rate(bank, term, rate, *boundaries, crawled_at));
            match parsed {
                Ok(set) => out.push(set),
                Err(err) => skipped(bank, "bracket cell", &err),
            }
        }
    }
    Ok(out)
}

/// Build one record through a field accessor.
pub fn record_to_set<F>(
    field: F,
    fields: &FieldMap,
    bank: &str,
    crawled_at: DateTime<Utc>,
) -> Result<InterestSet, FieldError>
where
    F: Fn(&str) -> Result<String, FieldError>,
{
    let term = parse_term(&field(&fields.term_field)?)?;
    let rate = parse_rate(&field(&fields.rate_field)?)?;
    match fields.rate_type {
        RecordRateType::List => {
            let changed_on = fields
                .changed_on_field
                .as_deref()
                .map(|key| field(key).and_then(|raw| parse_changed_on(&raw)))
                .transpose()?;
            InterestSet::list_rate(bank, term, rate, changed_on, crawled_at)
        }
        RecordRateType::Average => {
            let month = match (fields.year_field.as_deref(), fields.month_field.as_deref()) {
                (Some(year), Some(month)) => {
                    MonthFormat::Any.parse(&format!("{} {}", field(year)?, field(month)?))?
                }
                (None, Some(month)) => fields.month_format.parse(&field(month)?)?,
                _ => return Err(FieldError::MissingField("month_field".to_string())),
            };
            InterestSet::average_rate(bank, term, rate, month, crawled_at)
        }
    }
}

fn collect_records<'a, I, F>(records: I, field: F, fields: &FieldMap, bank: &str, crawled_at: DateTime<Utc>) -> Vec<InterestSet>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
    F: Fn(&Map<String, Value>, &str) -> Result<String, FieldError>,
{
    records
        .into_iter()
        .filter_map(|record| match record_to_set(|key| field(record, key), fields, bank, crawled_at) {
            Ok(set) => Some(set),
            Err(err) => {
                skipped(bank, "record", &err);
                None
            }
        })
        .collect()
}

/// Records of a JSON document (plain API body or a blob inside HTML).
pub fn json_document(
    body: &str,
    doc: &JsonDocument,
    bank: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<InterestSet>, ExtractError> {
    let raw = match &doc.blob {
        Some(anchor) => extract_blob(body, anchor)?,
        None => body.to_string(),
    };
    let records = resolve_records(&raw, &doc.path)?;
    Ok(collect_records(&records, field_text, &doc.fields, bank, crawled_at))
}

/// Records of an index-reference page state.
pub fn indexed_document(
    body: &str,
    doc: &IndexedJsonDocument,
    bank: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<InterestSet>, ExtractError> {
    let raw = extract_blob(body, &doc.blob)?;
    let payload = IndexedPayload::parse(&raw)?;
    let keys = doc.fields.required_keys();
    let records = payload.records_with_fields(&keys);
    if records.is_empty() {
        return Err(ExtractError::not_found(format!("records with fields {keys:?}")));
    }
    Ok(collect_records(
        records,
        |record, key| payload.field_text(record, key),
        &doc.fields,
        bank,
        crawled_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AvgMonth, InterestType};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-10-15T06:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn table(header: &[&str], rows: &[&[&str]]) -> ParsedTable {
        ParsedTable {
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        }
    }

    fn summary(sets: &[InterestSet]) -> Vec<(Term, f32)> {
        sets.iter().map(|s| (s.term(), s.nominal_rate())).collect()
    }

    #[test]
    fn term_rows_list_rates_with_changed_on() {
        let t = table(
            &["Bindningstid", "Ränta", "Ändrad"],
            &[
                &["3 mån", "3,33 %", "2025-10-01"],
                &["1 år", "3,44 %", "2025-09-15"],
                &["9 år", "3,90 %", "2025-09-15"],
                &["2 år", "-", "2025-09-15"],
                &["3 år", "3,60 %", "igår"],
            ],
        );
        let columns = TermRowColumns {
            term: &ColumnRef::Index(0),
            rate: &ColumnRef::Header("ränta".into()),
            changed_on: Some(&ColumnRef::Header("ändrad".into())),
            union_discount: None,
        };
        let sets = term_rows(&t, columns, "Bank", now()).unwrap();
        assert_eq!(summary(&sets), vec![(Term::ThreeMonths, 3.33), (Term::OneYear, 3.44)]);
        assert_eq!(sets[0].changed_on(), NaiveDate::from_ymd_opt(2025, 10, 1));
        assert!(sets.iter().all(|s| s.kind() == InterestType::ListRate));
    }

    #[test]
    fn term_rows_union_discount_and_missing_column() {
        let t = table(&["Bindningstid", "Ränta"], &[&["1 år", "3,10"]]);
        let columns = TermRowColumns {
            term: &ColumnRef::Index(0),
            rate: &ColumnRef::Index(1),
            changed_on: None,
            union_discount: Some(true),
        };
        let sets = term_rows(&t, columns, "Bank", now()).unwrap();
        assert_eq!(sets[0].kind(), InterestType::UnionDiscountedRate);
        assert!(sets[0].union_discount());

        let columns = TermRowColumns {
            rate: &ColumnRef::Header("Listränta".into()),
            ..columns
        };
        assert!(matches!(term_rows(&t, columns, "Bank", now()), Err(ExtractError::Shape(_))));
    }

    #[test]
    fn month_rows_merge_split_rows_and_skip_placeholders() {
        let t = table(
            &["Månad", "3 mån", "1 år", "Kommentar"],
            &[&["2025-09", "2,91", "-"], &["2025-08"], &["2,95", "2,84"], &["Fotnot"]],
        );
        let sets = month_rows(&t, MonthFormat::IsoMonth, "Bank", now()).unwrap();
        assert_eq!(
            summary(&sets),
            vec![(Term::ThreeMonths, 2.91), (Term::ThreeMonths, 2.95), (Term::OneYear, 2.84)]
        );
        assert_eq!(sets[1].average_reference_month(), Some(AvgMonth::new(2025, 8).unwrap()));
    }

    #[test]
    fn month_rows_without_terms_is_a_shape_error() {
        let t = table(&["Månad", "Värde"], &[&["2025-09", "2,91"]]);
        assert!(matches!(month_rows(&t, MonthFormat::Any, "Bank", now()), Err(ExtractError::Shape(_))));
    }

    #[test]
    fn ratio_columns_emit_one_record_per_bracket() {
        let t = table(
            &["Bindningstid", "0-60 %", "60-75 %", "Över 75 %"],
            &[&["3 mån", "3,10", "3,25", "3,40"], &["Bindningstid", "x", "y", "z"]],
        );
        let sets = ratio_columns(&t, &ColumnRef::Index(0), "Bank", now()).unwrap();
        assert_eq!(sets.len(), 3);
        let b = sets[2].ratio_discount_boundaries().unwrap();
        assert!((b.min_ratio() - 0.75).abs() < 1e-6 && (b.max_ratio() - 1.0).abs() < 1e-6);
        assert!(sets.iter().all(|s| s.kind() == InterestType::RatioDiscountedRate));
    }

    fn fields(json: &str) -> FieldMap {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn json_document_from_plain_api_body() {
        let doc = JsonDocument {
            url: "https://example.com/api".into(),
            headers: Default::default(),
            blob: None,
            path: "data.rates".parse().unwrap(),
            fields: fields(r#"{"rate_type": "list", "term_field": "period", "rate_field": "rate"}"#),
        };
        let body = r#"{"data": {"rates": [
            {"period": "THREE_MONTHS", "rate": 3.45, "validFrom": "2025-10-01T00:00:00Z"},
            {"period": "ONE_YEAR", "rate": "3,55"},
            {"period": "NINE_YEARS", "rate": 4.0, "validFrom": "2025-10-01"}
        ]}}"#;
        let sets = json_document(body, &doc, "Bank", now()).unwrap();
        assert_eq!(summary(&sets), vec![(Term::ThreeMonths, 3.45), (Term::OneYear, 3.55)]);
        assert_eq!(sets[0].changed_on(), None);

        // with a change-date field, the record lacking it is skipped on its own
        let doc = JsonDocument {
            fields: fields(
                r#"{"rate_type": "list", "term_field": "period", "rate_field": "rate", "changed_on_field": "validFrom"}"#,
            ),
            ..doc
        };
        let sets = json_document(body, &doc, "Bank", now()).unwrap();
        assert_eq!(summary(&sets), vec![(Term::ThreeMonths, 3.45)]);
        assert_eq!(sets[0].changed_on(), NaiveDate::from_ymd_opt(2025, 10, 1));
    }

    #[test]
    fn json_document_path_failure_is_document_level() {
        let doc = JsonDocument {
            url: "https://example.com/api".into(),
            headers: Default::default(),
            blob: None,
            path: "data.missing".parse().unwrap(),
            fields: fields(r#"{"rate_type": "list", "term_field": "t", "rate_field": "r"}"#),
        };
        assert!(matches!(json_document(r#"{"data": {}}"#, &doc, "Bank", now()), Err(ExtractError::Shape(_))));
    }

    #[test]
    fn indexed_document_average_rates_from_year_and_month() {
        let html = r#"<html><script type="application/json" id="__NUXT_DATA__">
            [["ShallowReactive", 1], {"rows": 2}, [3, 8],
             {"term": 4, "value": 5, "year": 6, "month": 7}, "3 mån", "2,91", 2025, "september",
             {"term": 9, "value": 10, "year": 6, "month": 11}, "1 år", "2,80", 99]
        </script></html>"#;
        let doc = IndexedJsonDocument {
            url: "https://example.com/bolan".into(),
            headers: Default::default(),
            blob: crate::extract::BlobAnchor::ScriptId("__NUXT_DATA__".into()),
            fields: fields(
                r#"{"rate_type": "average", "term_field": "term", "rate_field": "value", "month_field": "month", "year_field": "year"}"#,
            ),
        };
        let sets = indexed_document(html, &doc, "Bank", now()).unwrap();
        assert_eq!(summary(&sets), vec![(Term::ThreeMonths, 2.91)]);
        assert_eq!(sets[0].average_reference_month(), Some(AvgMonth::new(2025, 9).unwrap()));
    }
}
