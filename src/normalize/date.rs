//! Date and month parsers.
//!
//! Each function accepts exactly one encoding. Sources pick theirs through
//! `MonthFormat`; none of them clamp or guess: a month outside 1-12 or a year
//! outside 1940-2100 is an error.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::domain::{AvgMonth, MAX_YEAR, MIN_YEAR};
use crate::error::FieldError;

/// Full Swedish month names and their 3-4 letter abbreviations.
static SWEDISH_MONTHS: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(|| {
    HashMap::from([
        ("januari", 1),
        ("jan", 1),
        ("februari", 2),
        ("feb", 2),
        ("febr", 2),
        ("mars", 3),
        ("mar", 3),
        ("april", 4),
        ("apr", 4),
        ("maj", 5),
        ("juni", 6),
        ("jun", 6),
        ("juli", 7),
        ("jul", 7),
        ("augusti", 8),
        ("aug", 8),
        ("september", 9),
        ("sep", 9),
        ("sept", 9),
        ("oktober", 10),
        ("okt", 10),
        ("november", 11),
        ("nov", 11),
        ("december", 12),
        ("dec", 12),
    ])
});

/// How a source writes the period of an average rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthFormat {
    /// `2025-10`
    IsoMonth,
    /// `2025-10-01`; only the month is kept.
    IsoDate,
    /// `202510`
    Yyyymm,
    /// `2510`
    Yymm,
    /// `2025 10`
    YearSpaceMonth,
    /// `oktober 2025`, `okt. 2025`
    SwedishMonthYear,
    /// `2025 oktober`, `2025 okt`
    SwedishYearMonth,
    /// Try every unambiguous format in a fixed order (not `Yymm`).
    Any,
}

impl MonthFormat {
    pub fn parse(self, raw: &str) -> Result<AvgMonth, FieldError> {
        match self {
            MonthFormat::IsoMonth => parse_year_month(raw),
            MonthFormat::IsoDate => parse_iso_date(raw).and_then(AvgMonth::from_date),
            MonthFormat::Yyyymm => parse_yyyymm(raw),
            MonthFormat::Yymm => parse_yymm(raw),
            MonthFormat::YearSpaceMonth => parse_year_space_month(raw),
            MonthFormat::SwedishMonthYear => parse_swedish_month_year(raw),
            MonthFormat::SwedishYearMonth => parse_swedish_year_month(raw),
            MonthFormat::Any => parse_any_month(raw),
        }
    }
}

/// `YYYY-MM-DD`.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, FieldError> {
    let trimmed = raw.trim();
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| FieldError::InvalidDate(trimmed.to_string()))?;
    check_year(date.year())?;
    Ok(date)
}

/// `YYYY-MM`.
pub fn parse_year_month(raw: &str) -> Result<AvgMonth, FieldError> {
    let trimmed = raw.trim();
    let (year, month) = trimmed
        .split_once('-')
        .ok_or_else(|| FieldError::InvalidDate(trimmed.to_string()))?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return Err(FieldError::InvalidDate(trimmed.to_string()));
    }
    AvgMonth::new(digits(year, trimmed)? as i32, digits(month, trimmed)?)
}

/// `YYYYMM`.
pub fn parse_yyyymm(raw: &str) -> Result<AvgMonth, FieldError> {
    let trimmed = raw.trim();
    if trimmed.len() != 6 {
        return Err(FieldError::InvalidDate(trimmed.to_string()));
    }
    let value = digits(trimmed, trimmed)?;
    AvgMonth::new((value / 100) as i32, value % 100)
}

/// `YYMM`; two-digit years below 40 are 20xx, the rest 19xx.
pub fn parse_yymm(raw: &str) -> Result<AvgMonth, FieldError> {
    let trimmed = raw.trim();
    if trimmed.len() != 4 {
        return Err(FieldError::InvalidDate(trimmed.to_string()));
    }
    let value = digits(trimmed, trimmed)?;
    let yy = (value / 100) as i32;
    let year = if yy < 40 { 2000 + yy } else { 1900 + yy };
    AvgMonth::new(year, value % 100)
}

/// `YYYY MM`.
pub fn parse_year_space_month(raw: &str) -> Result<AvgMonth, FieldError> {
    let trimmed = raw.trim();
    let mut parts = trimmed.split_whitespace();
    let (Some(year), Some(month), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FieldError::InvalidDate(trimmed.to_string()));
    };
    if year.len() != 4 || month.len() > 2 {
        return Err(FieldError::InvalidDate(trimmed.to_string()));
    }
    AvgMonth::new(digits(year, trimmed)? as i32, digits(month, trimmed)?)
}

/// A Swedish month name or abbreviation, with or without a trailing period.
pub fn parse_swedish_month(raw: &str) -> Result<u32, FieldError> {
    let token = raw.trim().trim_end_matches('.').to_lowercase();
    SWEDISH_MONTHS
        .get(token.as_str())
        .copied()
        .ok_or_else(|| FieldError::InvalidDate(raw.trim().to_string()))
}

/// `oktober 2025`, `okt. 2025`.
pub fn parse_swedish_month_year(raw: &str) -> Result<AvgMonth, FieldError> {
    let trimmed = raw.trim();
    let (month, year) = two_tokens(trimmed)?;
    AvgMonth::new(parse_year(year, trimmed)?, parse_swedish_month(month)?)
}

/// `2025 oktober`, `2025 okt`.
pub fn parse_swedish_year_month(raw: &str) -> Result<AvgMonth, FieldError> {
    let trimmed = raw.trim();
    let (year, month) = two_tokens(trimmed)?;
    AvgMonth::new(parse_year(year, trimmed)?, parse_swedish_month(month)?)
}

/// Every unambiguous encoding, in a fixed order; the first success wins.
pub fn parse_any_month(raw: &str) -> Result<AvgMonth, FieldError> {
    const ORDER: [fn(&str) -> Result<AvgMonth, FieldError>; 5] = [
        parse_year_month,
        parse_yyyymm,
        parse_year_space_month,
        parse_swedish_month_year,
        parse_swedish_year_month,
    ];
    if let Ok(date) = parse_iso_date(raw) {
        return AvgMonth::from_date(date);
    }
    let mut last = FieldError::InvalidDate(raw.trim().to_string());
    for parse in ORDER {
        match parse(raw) {
            Ok(month) => return Ok(month),
            // Range errors are more useful than "invalid date" for the caller.
            Err(err @ (FieldError::MonthOutOfRange(_) | FieldError::YearOutOfRange(_))) => last = err,
            Err(_) => {}
        }
    }
    Err(last)
}

fn two_tokens(trimmed: &str) -> Result<(&str, &str), FieldError> {
    let mut parts = trimmed.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(FieldError::InvalidDate(trimmed.to_string())),
    }
}

fn parse_year(token: &str, whole: &str) -> Result<i32, FieldError> {
    if token.len() != 4 {
        return Err(FieldError::InvalidDate(whole.to_string()));
    }
    let year = digits(token, whole)? as i32;
    check_year(year)?;
    Ok(year)
}

fn check_year(year: i32) -> Result<(), FieldError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(FieldError::YearOutOfRange(year))
    }
}

fn digits(token: &str, whole: &str) -> Result<u32, FieldError> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::InvalidDate(whole.to_string()));
    }
    token
        .parse::<u32>()
        .map_err(|_| FieldError::InvalidDate(whole.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> AvgMonth {
        AvgMonth::new(year, month).unwrap()
    }

    #[test]
    fn yymm_century_split() {
        assert_eq!(parse_yymm("2510"), Ok(ym(2025, 10)));
        assert_eq!(parse_yymm("3912"), Ok(ym(2039, 12)));
        assert_eq!(parse_yymm("4001"), Ok(ym(1940, 1)));
        assert_eq!(parse_yymm("2513"), Err(FieldError::MonthOutOfRange(13)));
        assert!(parse_yymm("251").is_err());
    }

    #[test]
    fn numeric_encodings() {
        assert_eq!(parse_year_month("2025-03"), Ok(ym(2025, 3)));
        assert_eq!(parse_yyyymm("202503"), Ok(ym(2025, 3)));
        assert_eq!(parse_year_space_month("2025 3"), Ok(ym(2025, 3)));
        assert_eq!(parse_year_space_month("2025 03"), Ok(ym(2025, 3)));
        assert_eq!(
            parse_iso_date("2025-03-17"),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 17).unwrap())
        );
        assert_eq!(parse_year_month("2025-00"), Err(FieldError::MonthOutOfRange(0)));
        assert_eq!(parse_yyyymm("190001"), Err(FieldError::YearOutOfRange(1900)));
        assert!(parse_iso_date("2025-13-01").is_err());
        assert!(parse_iso_date("1899-01-01").is_err());
    }

    #[test]
    fn swedish_month_names_and_abbreviations() {
        assert_eq!(parse_swedish_month("Januari"), Ok(1));
        assert_eq!(parse_swedish_month("okt."), Ok(10));
        assert_eq!(parse_swedish_month("sept"), Ok(9));
        assert_eq!(parse_swedish_month("maj"), Ok(5));
        assert!(parse_swedish_month("oct").is_err());

        assert_eq!(parse_swedish_month_year("oktober 2025"), Ok(ym(2025, 10)));
        assert_eq!(parse_swedish_month_year("Okt. 2025"), Ok(ym(2025, 10)));
        assert_eq!(parse_swedish_year_month("2025 dec"), Ok(ym(2025, 12)));
        assert!(parse_swedish_month_year("2025 dec").is_err());
        assert_eq!(
            parse_swedish_month_year("mars 2101"),
            Err(FieldError::YearOutOfRange(2101))
        );
    }

    #[test]
    fn any_tries_every_unambiguous_format() {
        assert_eq!(parse_any_month("2025-10"), Ok(ym(2025, 10)));
        assert_eq!(parse_any_month("2025-10-15"), Ok(ym(2025, 10)));
        assert_eq!(parse_any_month("202510"), Ok(ym(2025, 10)));
        assert_eq!(parse_any_month("november 2024"), Ok(ym(2024, 11)));
        assert_eq!(parse_any_month("2024 nov"), Ok(ym(2024, 11)));
        assert_eq!(parse_any_month("2025-14"), Err(FieldError::MonthOutOfRange(14)));
        assert!(parse_any_month("3 mån").is_err());
        assert!(parse_any_month("2510").is_err());
    }

    #[test]
    fn month_format_dispatch() {
        assert_eq!(MonthFormat::Yymm.parse("2510"), Ok(ym(2025, 10)));
        assert_eq!(MonthFormat::IsoDate.parse("2025-10-31"), Ok(ym(2025, 10)));
        assert_eq!(MonthFormat::SwedishYearMonth.parse("2025 januari"), Ok(ym(2025, 1)));
    }
}
