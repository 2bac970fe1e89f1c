//! Term (binding period) vocabulary.
//!
//! Institutions spell the same binding period in many ways: `3 mån`,
//! `3 månader`, `tre månader`, `Rörlig`, `3M`, `THREE_MONTHS`, `3months`, ...
//! Everything is folded to a small normalized form, then matched as
//! `<number> <unit>` where the number may be a digit run or a number word.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Term;
use crate::error::FieldError;

/// Column and row labels that show up where terms are expected.
const LABELS: &[&str] = &[
    "bindningstid",
    "bindningstider",
    "räntebindningstid",
    "räntebindning",
    "bunden tid",
    "löptid",
    "period",
    "månad",
    "år",
    "datum",
    "ränta",
    "räntor",
    "räntesats",
    "listränta",
    "listpris",
    "aktuell ränta",
    "snittränta",
    "snitträntor",
    "genomsnittlig ränta",
    "genomsnittsränta",
    "senast ändrad",
    "ändrad",
    "ändringsdatum",
    "förändring",
    "term",
    "binding period",
    "rate",
    "interest rate",
    "date",
];

/// Spellings that carry no number at all.
const ALIASES: &[(&str, Term)] = &[
    ("rörlig", Term::ThreeMonths),
    ("rörligt", Term::ThreeMonths),
    ("rörlig ränta", Term::ThreeMonths),
    ("rörligt lån", Term::ThreeMonths),
    ("variable", Term::ThreeMonths),
    ("floating", Term::ThreeMonths),
];

static MONTH_UNITS: &[&str] = &[
    "m", "mån", "månad", "månader", "mnd", "mo", "mon", "month", "months",
];

static YEAR_UNITS: &[&str] = &[
    "å", "år", "års", "årig", "åriga", "ar", "y", "yr", "yrs", "year", "years",
];

/// Qualifiers that may ride along with a numeric term (`Rörlig 3 mån`).
const QUALIFIERS: &[&str] = &["rörlig", "rörligt", "rörlig ränta"];

static NUMBER_WORDS: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(|| {
    HashMap::from([
        ("en", 1),
        ("ett", 1),
        ("one", 1),
        ("två", 2),
        ("two", 2),
        ("tre", 3),
        ("three", 3),
        ("fyra", 4),
        ("four", 4),
        ("fem", 5),
        ("five", 5),
        ("sex", 6),
        ("six", 6),
        ("sju", 7),
        ("seven", 7),
        ("åtta", 8),
        ("eight", 8),
        ("nio", 9),
        ("nine", 9),
        ("tio", 10),
        ("ten", 10),
        ("tolv", 12),
        ("twelve", 12),
    ])
});

static DIGIT_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\s*([a-zåäö]+)$").expect("static regex"));

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("static regex"));

static WORD_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zåäö]+)\s+([a-zåäö]+)$").expect("static regex"));

/// Parse a term token into one of the fixed `Term` codes.
///
/// Returns `FieldError::NotATerm` for known labels (header cells, row titles)
/// and `FieldError::UnsupportedTerm` for anything else that does not match.
pub fn parse_term(raw: &str) -> Result<Term, FieldError> {
    let token = normalize_token(raw);
    if token.is_empty() {
        return Err(FieldError::Empty);
    }
    if LABELS.contains(&token.as_str()) {
        return Err(FieldError::NotATerm(raw.trim().to_string()));
    }
    if let Some((_, term)) = ALIASES.iter().find(|(alias, _)| *alias == token) {
        return Ok(*term);
    }

    let unsupported = || FieldError::UnsupportedTerm(raw.trim().to_string());

    let (count, unit) = if let Some(caps) = DIGIT_TERM.captures(&token) {
        let count = caps[1].parse::<u32>().map_err(|_| unsupported())?;
        (count, caps[2].to_string())
    } else if let Some(caps) = WORD_TERM.captures(&token) {
        let count = *NUMBER_WORDS.get(&caps[1]).ok_or_else(unsupported)?;
        (count, caps[2].to_string())
    } else {
        return Err(unsupported());
    };

    let months = if MONTH_UNITS.contains(&unit.as_str()) {
        count
    } else if YEAR_UNITS.contains(&unit.as_str()) {
        count.checked_mul(12).ok_or_else(unsupported)?
    } else {
        return Err(unsupported());
    };

    Term::from_months(months).ok_or_else(unsupported)
}

/// Lowercase, fold separators to spaces, collapse whitespace and drop
/// decorations that never change the meaning (`bunden`, trailing `.`/`:`).
/// Next to a digit, a parenthesized note or a `rörlig` qualifier is dropped too.
fn normalize_token(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let stripped = PARENTHESIZED.replace_all(&lower, " ").into_owned();
    let lower = if stripped.chars().any(|c| c.is_ascii_digit()) { stripped } else { lower };
    let folded: String = lower
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '(' | ')') || c.is_whitespace() { ' ' } else { c })
        .collect();
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut token = collapsed.trim_end_matches(['.', ':', '*']).trim().to_string();
    for prefix in ["bunden ", "bundet ", "fast ", "fixed "] {
        if let Some(rest) = token.strip_prefix(prefix) {
            token = rest.to_string();
        }
    }
    if token.chars().any(|c| c.is_ascii_digit()) {
        for qualifier in QUALIFIERS {
            if let Some(rest) = token.strip_prefix(&format!("{qualifier} ")) {
                token = rest.to_string();
            } else if let Some(rest) = token.strip_suffix(&format!(" {qualifier}")) {
                token = rest.to_string();
            }
        }
    }
    token
}
