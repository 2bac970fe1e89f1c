//! Export a store snapshot to CSV.
//!
//! One row per record, type-specific columns left empty where they do not
//! apply, so the file loads straight into a spreadsheet.

use std::path::Path;

use serde::Serialize;

use crate::domain::InterestSet;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    bank: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    term: &'static str,
    nominal_rate: f32,
    changed_on: Option<String>,
    avg_year: Option<i32>,
    avg_month: Option<u32>,
    min_ratio: Option<f32>,
    max_ratio: Option<f32>,
    union_discount: bool,
    last_crawled_at: String,
}

impl<'a> From<&'a InterestSet> for SnapshotRow<'a> {
    fn from(set: &'a InterestSet) -> Self {
        let month = set.average_reference_month();
        let bracket = set.ratio_discount_boundaries();
        Self {
            bank: set.bank(),
            kind: set.kind().code(),
            term: set.term().code(),
            nominal_rate: set.nominal_rate(),
            changed_on: set.changed_on().map(|d| d.to_string()),
            avg_year: month.map(|m| m.year()),
            avg_month: month.map(|m| m.month()),
            min_ratio: bracket.map(|b| b.min_ratio()),
            max_ratio: bracket.map(|b| b.max_ratio()),
            union_discount: set.union_discount(),
            last_crawled_at: set.last_crawled_at().to_rfc3339(),
        }
    }
}

/// Write `sets` to `path`, replacing any existing file.
pub fn write_snapshot_csv(path: &Path, sets: &[InterestSet]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    for set in sets {
        writer
            .serialize(SnapshotRow::from(set))
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, Utc};

    use super::*;
    use crate::domain::{AvgMonth, Term};

    #[test]
    fn writes_header_and_type_specific_columns() {
        let at = DateTime::parse_from_rfc3339("2025-10-15T06:00:00Z").unwrap().with_timezone(&Utc);
        let sets = vec![
            InterestSet::list_rate("Bank", Term::ThreeMonths, 3.33, NaiveDate::from_ymd_opt(2025, 10, 1), at).unwrap(),
            InterestSet::average_rate("Bank", Term::OneYear, 2.8, AvgMonth::new(2025, 9).unwrap(), at).unwrap(),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.csv");
        write_snapshot_csv(&path, &sets).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "bank,type,term,nominal_rate,changed_on,avg_year,avg_month,min_ratio,max_ratio,union_discount,last_crawled_at"
        );
        assert_eq!(lines[1], "Bank,listRate,3months,3.33,2025-10-01,,,,,false,2025-10-15T06:00:00+00:00");
        assert_eq!(lines[2], "Bank,averageRate,1year,2.8,,2025,9,,,false,2025-10-15T06:00:00+00:00");
    }
}
