//! Canonical rate observations.
//!
//! An `InterestSet` is built once per parsed row/entry and never mutated. The
//! per-type optional fields of the wire format (`changedOn`,
//! `averageReferenceMonth`, `ratioDiscountBoundaries`, `unionDiscount`) live in
//! `RateDetail`, so a list rate with an average month cannot be represented.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

pub const MIN_YEAR: i32 = 1940;
pub const MAX_YEAR: i32 = 2100;

/// Which kind of rate an observation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterestType {
    ListRate,
    AverageRate,
    RatioDiscountedRate,
    UnionDiscountedRate,
}

impl InterestType {
    pub fn code(self) -> &'static str {
        match self {
            InterestType::ListRate => "listRate",
            InterestType::AverageRate => "averageRate",
            InterestType::RatioDiscountedRate => "ratioDiscountedRate",
            InterestType::UnionDiscountedRate => "unionDiscountedRate",
        }
    }
}

impl fmt::Display for InterestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Binding period. Nine years is not published by any tracked institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "2years")]
    TwoYears,
    #[serde(rename = "3years")]
    ThreeYears,
    #[serde(rename = "4years")]
    FourYears,
    #[serde(rename = "5years")]
    FiveYears,
    #[serde(rename = "6years")]
    SixYears,
    #[serde(rename = "7years")]
    SevenYears,
    #[serde(rename = "8years")]
    EightYears,
    #[serde(rename = "10years")]
    TenYears,
}

impl Term {
    pub const ALL: [Term; 11] = [
        Term::ThreeMonths,
        Term::SixMonths,
        Term::OneYear,
        Term::TwoYears,
        Term::ThreeYears,
        Term::FourYears,
        Term::FiveYears,
        Term::SixYears,
        Term::SevenYears,
        Term::EightYears,
        Term::TenYears,
    ];

    /// Canonical code, identical to the serialized form.
    pub fn code(self) -> &'static str {
        match self {
            Term::ThreeMonths => "3months",
            Term::SixMonths => "6months",
            Term::OneYear => "1year",
            Term::TwoYears => "2years",
            Term::ThreeYears => "3years",
            Term::FourYears => "4years",
            Term::FiveYears => "5years",
            Term::SixYears => "6years",
            Term::SevenYears => "7years",
            Term::EightYears => "8years",
            Term::TenYears => "10years",
        }
    }

    /// Length of the binding period in months.
    pub fn months(self) -> u32 {
        match self {
            Term::ThreeMonths => 3,
            Term::SixMonths => 6,
            Term::OneYear => 12,
            Term::TwoYears => 24,
            Term::ThreeYears => 36,
            Term::FourYears => 48,
            Term::FiveYears => 60,
            Term::SixYears => 72,
            Term::SevenYears => 84,
            Term::EightYears => 96,
            Term::TenYears => 120,
        }
    }

    pub fn from_months(months: u32) -> Option<Term> {
        Term::ALL.into_iter().find(|t| t.months() == months)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A calendar month (not a day) that an average rate describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAvgMonth")]
pub struct AvgMonth {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawAvgMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawAvgMonth> for AvgMonth {
    type Error = FieldError;

    fn try_from(raw: RawAvgMonth) -> Result<Self, Self::Error> {
        AvgMonth::new(raw.year, raw.month)
    }
}

impl AvgMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, FieldError> {
        if !(1..=12).contains(&month) {
            return Err(FieldError::MonthOutOfRange(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(FieldError::YearOutOfRange(year));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Result<Self, FieldError> {
        Self::new(date.year(), date.month())
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for AvgMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// An LTV bracket as fractions of collateral value, `0 <= min < max <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRatioBoundaries")]
pub struct RatioBoundaries {
    min_ratio: f32,
    max_ratio: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRatioBoundaries {
    min_ratio: f32,
    max_ratio: f32,
}

impl TryFrom<RawRatioBoundaries> for RatioBoundaries {
    type Error = FieldError;

    fn try_from(raw: RawRatioBoundaries) -> Result<Self, Self::Error> {
        RatioBoundaries::new(raw.min_ratio, raw.max_ratio)
    }
}

impl RatioBoundaries {
    pub fn new(min_ratio: f32, max_ratio: f32) -> Result<Self, FieldError> {
        let valid = min_ratio.is_finite()
            && max_ratio.is_finite()
            && (0.0..=1.0).contains(&min_ratio)
            && (0.0..=1.0).contains(&max_ratio)
            && min_ratio < max_ratio;
        if !valid {
            return Err(FieldError::InvalidRatio(format!("{min_ratio}-{max_ratio}")));
        }
        Ok(Self {
            min_ratio,
            max_ratio,
        })
    }

    pub fn min_ratio(self) -> f32 {
        self.min_ratio
    }

    pub fn max_ratio(self) -> f32 {
        self.max_ratio
    }
}

/// The type-gated part of an observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDetail {
    List { changed_on: Option<NaiveDate> },
    Average { month: AvgMonth },
    RatioDiscounted { boundaries: RatioBoundaries },
    UnionDiscounted { union_discount: bool },
}

impl RateDetail {
    pub fn kind(&self) -> InterestType {
        match self {
            RateDetail::List { .. } => InterestType::ListRate,
            RateDetail::Average { .. } => InterestType::AverageRate,
            RateDetail::RatioDiscounted { .. } => InterestType::RatioDiscountedRate,
            RateDetail::UnionDiscounted { .. } => InterestType::UnionDiscountedRate,
        }
    }
}

/// One observed rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InterestSetWire", into = "InterestSetWire")]
pub struct InterestSet {
    bank: String,
    term: Term,
    nominal_rate: f32,
    detail: RateDetail,
    last_crawled_at: DateTime<Utc>,
}

impl InterestSet {
    /// The only constructor; every typed helper below funnels through here.
    pub fn new(
        bank: impl Into<String>,
        term: Term,
        nominal_rate: f32,
        detail: RateDetail,
        last_crawled_at: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        if !nominal_rate.is_finite() || nominal_rate <= 0.0 {
            return Err(FieldError::NonPositiveRate(nominal_rate));
        }
        Ok(Self {
            bank: bank.into(),
            term,
            nominal_rate,
            detail,
            last_crawled_at,
        })
    }

    pub fn list_rate(
        bank: impl Into<String>,
        term: Term,
        nominal_rate: f32,
        changed_on: Option<NaiveDate>,
        last_crawled_at: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        Self::new(bank, term, nominal_rate, RateDetail::List { changed_on }, last_crawled_at)
    }

    pub fn average_rate(
        bank: impl Into<String>,
        term: Term,
        nominal_rate: f32,
        month: AvgMonth,
        last_crawled_at: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        Self::new(bank, term, nominal_rate, RateDetail::Average { month }, last_crawled_at)
    }

    pub fn ratio_discounted_rate(
        bank: impl Into<String>,
        term: Term,
        nominal_rate: f32,
        boundaries: RatioBoundaries,
        last_crawled_at: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        Self::new(
            bank,
            term,
            nominal_rate,
            RateDetail::RatioDiscounted { boundaries },
            last_crawled_at,
        )
    }

    pub fn union_discounted_rate(
        bank: impl Into<String>,
        term: Term,
        nominal_rate: f32,
        union_discount: bool,
        last_crawled_at: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        Self::new(
            bank,
            term,
            nominal_rate,
            RateDetail::UnionDiscounted { union_discount },
            last_crawled_at,
        )
    }

    pub fn bank(&self) -> &str {
        &self.bank
    }

    pub fn kind(&self) -> InterestType {
        self.detail.kind()
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn nominal_rate(&self) -> f32 {
        self.nominal_rate
    }

    pub fn changed_on(&self) -> Option<NaiveDate> {
        match self.detail {
            RateDetail::List { changed_on } => changed_on,
            _ => None,
        }
    }

    pub fn average_reference_month(&self) -> Option<AvgMonth> {
        match self.detail {
            RateDetail::Average { month } => Some(month),
            _ => None,
        }
    }

    pub fn ratio_discount_boundaries(&self) -> Option<RatioBoundaries> {
        match self.detail {
            RateDetail::RatioDiscounted { boundaries } => Some(boundaries),
            _ => None,
        }
    }

    pub fn union_discount(&self) -> bool {
        matches!(self.detail, RateDetail::UnionDiscounted { union_discount: true })
    }

    pub fn last_crawled_at(&self) -> DateTime<Utc> {
        self.last_crawled_at
    }

    /// Natural key used for idempotent upserts.
    pub fn key(&self) -> InterestKey {
        let (changed_on, month, ratio, union_discount) = match self.detail {
            RateDetail::List { changed_on } => (changed_on, None, None, None),
            RateDetail::Average { month } => (None, Some(month), None, None),
            RateDetail::RatioDiscounted { boundaries } => (
                None,
                None,
                Some((boundaries.min_ratio.to_bits(), boundaries.max_ratio.to_bits())),
                None,
            ),
            RateDetail::UnionDiscounted { union_discount } => (None, None, None, Some(union_discount)),
        };
        InterestKey {
            bank: self.bank.clone(),
            kind: self.kind(),
            term: self.term,
            changed_on,
            month,
            ratio,
            union_discount,
        }
    }
}

/// Identity of an observation in the store.
///
/// Ratios are kept as `f32` bit patterns; they are always non-negative, for
/// which the bit order matches the numeric order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterestKey {
    pub bank: String,
    pub kind: InterestType,
    pub term: Term,
    pub changed_on: Option<NaiveDate>,
    pub month: Option<AvgMonth>,
    pub ratio: Option<(u32, u32)>,
    pub union_discount: Option<bool>,
}

/// Flat wire/persisted shape (camelCase JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterestSetWire {
    bank: String,
    #[serde(rename = "type")]
    kind: InterestType,
    term: Term,
    nominal_rate: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    changed_on: Option<NaiveDate>,
    last_crawled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    average_reference_month: Option<AvgMonth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ratio_discount_boundaries: Option<RatioBoundaries>,
    #[serde(default)]
    union_discount: bool,
}

impl From<InterestSet> for InterestSetWire {
    fn from(set: InterestSet) -> Self {
        Self {
            kind: set.kind(),
            changed_on: set.changed_on(),
            average_reference_month: set.average_reference_month(),
            ratio_discount_boundaries: set.ratio_discount_boundaries(),
            union_discount: set.union_discount(),
            bank: set.bank,
            term: set.term,
            nominal_rate: set.nominal_rate,
            last_crawled_at: set.last_crawled_at,
        }
    }
}

impl TryFrom<InterestSetWire> for InterestSet {
    type Error = FieldError;

    fn try_from(wire: InterestSetWire) -> Result<Self, Self::Error> {
        let detail = match wire.kind {
            InterestType::ListRate => RateDetail::List {
                changed_on: wire.changed_on,
            },
            InterestType::AverageRate => RateDetail::Average {
                month: wire
                    .average_reference_month
                    .ok_or_else(|| FieldError::MissingField("averageReferenceMonth".into()))?,
            },
            InterestType::RatioDiscountedRate => RateDetail::RatioDiscounted {
                boundaries: wire
                    .ratio_discount_boundaries
                    .ok_or_else(|| FieldError::MissingField("ratioDiscountBoundaries".into()))?,
            },
            InterestType::UnionDiscountedRate => RateDetail::UnionDiscounted {
                union_discount: wire.union_discount,
            },
        };
        InterestSet::new(wire.bank, wire.term, wire.nominal_rate, detail, wire.last_crawled_at)
    }
}
