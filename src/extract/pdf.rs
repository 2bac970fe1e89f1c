//! Rate tables inside PDF documents.
//!
//! Text extraction flattens the table into a token stream. The header row is
//! the run of `<n> mån` / `<n> år` terms that ends right before the first
//! period anchor (a date or a month), with nothing but whitespace or
//! punctuation between them. Each body row starts at an anchor and its values
//! are the rate-like tokens up to the next anchor, matched to the header by
//! position.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{AvgMonth, InterestSet, Term};
use crate::error::{ExtractError, FieldError};
use crate::normalize::{
    is_not_published, looks_like_rate, parse_iso_date, parse_rate, parse_swedish_month, parse_term,
    parse_year_month, parse_yyyymm,
};

static TERM_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*(månader|mån|år)\b").expect("static regex"));

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("static regex"));

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").expect("static regex"));

/// What the rows of a PDF table mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfRateKind {
    /// One row per month of average rates.
    #[default]
    Average,
    /// One row per change date of list rates; rows need a full date.
    List,
}

/// Plain text of a PDF held in memory.
///
/// The PDF library can panic on malformed input; that is reported as a shape
/// error like any other unreadable document.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::shape(format!("unreadable PDF: {e}"))),
        Err(_) => Err(ExtractError::shape("PDF parser panicked")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Date(NaiveDate),
    Month(AvgMonth),
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    period: Period,
    /// Index of the first token after the anchor.
    body_start: usize,
    /// Index of the anchor's first token.
    start: usize,
}

struct Token<'a> {
    text: &'a str,
    offset: usize,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    TOKEN
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            offset: m.start(),
        })
        .collect()
}

fn find_anchors(tokens: &[Token<'_>]) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].text.trim_end_matches([':', ',']);
        let single = parse_iso_date(token)
            .map(Period::Date)
            .or_else(|_| parse_year_month(token).map(Period::Month))
            .or_else(|_| parse_yyyymm(token).map(Period::Month));
        if let Ok(period) = single {
            anchors.push(Anchor {
                period,
                body_start: i + 1,
                start: i,
            });
            i += 1;
            continue;
        }

        if let (Ok(month), Some(next)) = (parse_swedish_month(token), tokens.get(i + 1)) {
            if YEAR.is_match(next.text) {
                let year = next.text.parse::<i32>().unwrap_or_default();
                if let Ok(month) = AvgMonth::new(year, month) {
                    anchors.push(Anchor {
                        period: Period::Month(month),
                        body_start: i + 2,
                        start: i,
                    });
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    anchors
}

/// A term header found anywhere in the text.
struct HeaderTerm {
    start: usize,
    end: usize,
    /// `None` for terms outside the supported set; the column still counts.
    term: Option<Term>,
}

fn header_terms(text: &str) -> Vec<HeaderTerm> {
    TERM_HEADER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let unit = caps[2].to_lowercase();
            let unit = if unit == "månader" { "mån" } else { unit.as_str() };
            let label = format!("{} {unit}", &caps[1]);
            let term = match parse_term(&label) {
                Ok(term) => Some(term),
                Err(err) => {
                    debug!(%label, %err, "header column without a supported term");
                    None
                }
            };
            Some(HeaderTerm {
                start: whole.start(),
                end: whole.end(),
                term,
            })
        })
        .collect()
}

/// Header columns in order: the terms that end right before byte `end`,
/// separated only by whitespace or punctuation. Words break the run.
fn header_run(headers: &[HeaderTerm], text: &str, end: usize) -> Vec<Option<Term>> {
    let mut cursor = end;
    let mut run = Vec::new();
    for header in headers.iter().rev().filter(|h| h.end <= end) {
        if text[header.end..cursor].chars().any(char::is_alphanumeric) {
            break;
        }
        run.push(header.term);
        cursor = header.start;
    }
    run.reverse();
    run
}

/// Turn extracted PDF text into rate records for `bank`.
pub fn parse_rates(
    text: &str,
    bank: &str,
    kind: PdfRateKind,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<InterestSet>, ExtractError> {
    let headers = header_terms(text);
    if headers.is_empty() {
        return Err(ExtractError::not_found("term header"));
    }

    let tokens = tokenize(text);
    let anchors = find_anchors(&tokens);
    let (first, terms) = anchors
        .iter()
        .enumerate()
        .find_map(|(idx, anchor)| {
            let run = header_run(&headers, text, tokens[anchor.start].offset);
            (!run.is_empty()).then_some((idx, run))
        })
        .ok_or_else(|| ExtractError::not_found("period rows after the term header"))?;
    if terms.iter().all(Option::is_none) {
        return Err(ExtractError::shape("term header has no supported terms"));
    }
    let anchors = &anchors[first..];

    let mut out = Vec::new();
    for (idx, anchor) in anchors.iter().enumerate() {
        let body_end = anchors.get(idx + 1).map_or(tokens.len(), |next| next.start);
        let slots = tokens[anchor.body_start..body_end]
            .iter()
            .map(|t| t.text)
            .filter(|t| looks_like_rate(t) || is_not_published(t));

        for (slot, term) in slots.zip(terms.iter()) {
            let Some(term) = term else { continue };
            if is_not_published(slot) {
                continue;
            }
            let rate = match parse_rate(slot) {
                Ok(rate) => rate,
                Err(err) => {
                    warn!(bank, %term, %err, "skipping PDF cell");
                    continue;
                }
            };
            match build_record(bank, *term, rate, anchor.period, kind, crawled_at) {
                Ok(Some(set)) => out.push(set),
                Ok(None) => {}
                Err(err) => warn!(bank, %term, %err, "skipping PDF cell"),
            }
        }
    }
    Ok(out)
}

fn build_record(
    bank: &str,
    term: Term,
    rate: f32,
    period: Period,
    kind: PdfRateKind,
    crawled_at: DateTime<Utc>,
) -> Result<Option<InterestSet>, FieldError> {
    match (kind, period) {
        (PdfRateKind::Average, Period::Month(month)) => {
            InterestSet::average_rate(bank, term, rate, month, crawled_at).map(Some)
        }
        (PdfRateKind::Average, Period::Date(date)) => {
            InterestSet::average_rate(bank, term, rate, AvgMonth::from_date(date)?, crawled_at).map(Some)
        }
        (PdfRateKind::List, Period::Date(date)) => InterestSet::list_rate(bank, term, rate, Some(date), crawled_at).map(Some),
        (PdfRateKind::List, Period::Month(month)) => {
            debug!(bank, %month, "list-rate row without a full date");
            Ok(None)
        }
    }
}
