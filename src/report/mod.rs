//! Terminal output: per-(bank, type) summaries, run reports, record listings.
//!
//! Formatting lives here so the scheduler and the CLI handlers only deal in
//! data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::crawl::RunReport;
use crate::domain::{InterestSet, InterestType};

/// Count and rate range of one bank's records of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub bank: String,
    pub kind: InterestType,
    pub count: usize,
    pub min_rate: f32,
    pub max_rate: f32,
    pub latest_crawl: DateTime<Utc>,
}

/// Group a snapshot by (bank, type), ordered by bank then type.
pub fn summarize(sets: &[InterestSet]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(&str, InterestType), SummaryRow> = BTreeMap::new();
    for set in sets {
        groups
            .entry((set.bank(), set.kind()))
            .and_modify(|row| {
                row.count += 1;
                row.min_rate = row.min_rate.min(set.nominal_rate());
                row.max_rate = row.max_rate.max(set.nominal_rate());
                row.latest_crawl = row.latest_crawl.max(set.last_crawled_at());
            })
            .or_insert_with(|| SummaryRow {
                bank: set.bank().to_string(),
                kind: set.kind(),
                count: 1,
                min_rate: set.nominal_rate(),
                max_rate: set.nominal_rate(),
                latest_crawl: set.last_crawled_at(),
            });
    }
    groups.into_values().collect()
}

pub fn format_summary(rows: &[SummaryRow]) -> String {
    if rows.is_empty() {
        return "No records.\n".to_string();
    }
    let bank_width = rows.iter().map(|r| r.bank.chars().count()).max().unwrap_or(4).max(4);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<bank_width$}  {:<20}  {:>5}  {:>13}  {}\n",
        "Bank", "Type", "Count", "Rate range", "Last crawled"
    ));
    for row in rows {
        out.push_str(&format!(
            "{:<bank_width$}  {:<20}  {:>5}  {:>5.2}% - {:>4.2}%  {}\n",
            row.bank,
            row.kind.code(),
            row.count,
            row.min_rate,
            row.max_rate,
            row.latest_crawl.format("%Y-%m-%d %H:%M"),
        ));
    }
    let total: usize = rows.iter().map(|r| r.count).sum();
    out.push_str(&format!("Total: {total} records\n"));
    out
}

/// Per-source outcomes followed by the snapshot summary.
pub fn format_run_report(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("=== rates - crawl ===\n");
    for source in &report.sources {
        let status = match &source.panicked {
            Some(msg) => format!("PANICKED ({msg})"),
            None => "ok".to_string(),
        };
        out.push_str(&format!(
            "  {:<24} {:>4} records  {:>6} ms  {}\n",
            source.name,
            source.emitted,
            source.elapsed.as_millis(),
            status
        ));
    }
    out.push_str(&format!(
        "Upserts: {} new, {} updated, {} failed\n\n",
        report.inserted, report.updated, report.upsert_failures
    ));
    out.push_str(&format_summary(&report.summary));
    out
}

/// One line per record, for the debug commands.
pub fn format_sets(sets: &[InterestSet]) -> String {
    let mut out = String::new();
    for set in sets {
        let detail = if let Some(month) = set.average_reference_month() {
            format!("month={month}")
        } else if let Some(b) = set.ratio_discount_boundaries() {
            format!("ltv={:.0}-{:.0}%", b.min_ratio() * 100.0, b.max_ratio() * 100.0)
        } else if let Some(day) = set.changed_on() {
            format!("changed_on={day}")
        } else if set.kind() == InterestType::UnionDiscountedRate {
            format!("union_discount={}", set.union_discount())
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{:<20} {:<20} {:<8} {:>6.2}%  {}\n",
            set.bank(),
            set.kind().code(),
            set.term().code(),
            set.nominal_rate(),
            detail
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AvgMonth, Term};

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn sets() -> Vec<InterestSet> {
        let early = at("2025-10-14T06:00:00Z");
        let late = at("2025-10-15T06:00:00Z");
        let month = AvgMonth::new(2025, 9).unwrap();
        vec![
            InterestSet::list_rate("Nordbanken", Term::ThreeMonths, 3.33, None, late).unwrap(),
            InterestSet::list_rate("Nordbanken", Term::OneYear, 3.44, None, early).unwrap(),
            InterestSet::average_rate("Nordbanken", Term::ThreeMonths, 2.91, month, early).unwrap(),
            InterestSet::list_rate("Andelsbanken", Term::FiveYears, 3.90, None, early).unwrap(),
        ]
    }

    #[test]
    fn summary_groups_by_bank_and_type() {
        let rows = summarize(&sets());
        let keys: Vec<(&str, InterestType, usize)> =
            rows.iter().map(|r| (r.bank.as_str(), r.kind, r.count)).collect();
        assert_eq!(
            keys,
            vec![
                ("Andelsbanken", InterestType::ListRate, 1),
                ("Nordbanken", InterestType::ListRate, 2),
                ("Nordbanken", InterestType::AverageRate, 1),
            ]
        );
        assert!((rows[1].min_rate - 3.33).abs() < 1e-6);
        assert!((rows[1].max_rate - 3.44).abs() < 1e-6);
        assert_eq!(rows[1].latest_crawl, at("2025-10-15T06:00:00Z"));
    }

    #[test]
    fn formatted_summary_lists_every_group_and_total() {
        let text = format_summary(&summarize(&sets()));
        assert!(text.contains("Andelsbanken"));
        assert!(text.contains("averageRate"));
        assert!(text.ends_with("Total: 4 records\n"));
        assert_eq!(format_summary(&[]), "No records.\n");
    }

    #[test]
    fn record_listing_shows_type_specific_detail() {
        let text = format_sets(&sets());
        assert!(text.contains("month=2025-09"));
        assert!(text.contains("3months"));
    }
}
