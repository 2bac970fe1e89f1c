//! Rate cells: `3,45 %`, `3.45%`, `3,45`, ...

use crate::error::FieldError;

/// Placeholders meaning "not published for this period".
const NOT_PUBLISHED: &[&str] = &["-", "–", "—", "--", "n/a", "na"];

/// Footnote markers that trail a value (`3,45*`, `3,45 %¹`).
const FOOTNOTE_MARKERS: &[char] = &['*', '†', '¹', '²', '³', '⁴', '⁵'];

fn strip_footnote(token: &str) -> &str {
    token.trim_end_matches(FOOTNOTE_MARKERS)
}

fn strip_percent(token: &str) -> &str {
    let token = strip_footnote(token);
    strip_footnote(token.strip_suffix('%').unwrap_or(token))
}

/// Parse a percentage into a positive `f32`.
///
/// Whitespace (including non-breaking spaces), footnote markers and a trailing
/// `%` are dropped and a decimal comma becomes a point. Empty cells and `-` are errors, never
/// zero.
pub fn parse_rate(raw: &str) -> Result<f32, FieldError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = strip_percent(&compact);
    if compact.is_empty() {
        return Err(FieldError::Empty);
    }
    if NOT_PUBLISHED.contains(&compact.to_lowercase().as_str()) {
        return Err(FieldError::NotPublished(raw.trim().to_string()));
    }

    let normalized = compact.replace(',', ".");
    let value = normalized
        .parse::<f32>()
        .map_err(|_| FieldError::InvalidNumber(raw.trim().to_string()))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(FieldError::NonPositiveRate(value));
    }
    Ok(value)
}

/// True for tokens that look like a decimal rate (`3,45`, `3.45%`).
///
/// Used by the PDF scanner to tell values from words; it does not validate the
/// number itself.
pub fn looks_like_rate(token: &str) -> bool {
    let token = strip_percent(token);
    let Some((int, frac)) = token.split_once([',', '.']) else {
        return false;
    };
    !int.is_empty()
        && int.len() <= 2
        && int.chars().all(|c| c.is_ascii_digit())
        && !frac.is_empty()
        && frac.chars().all(|c| c.is_ascii_digit())
}

/// True for "no data" placeholders such as `-`.
pub fn is_not_published(token: &str) -> bool {
    NOT_PUBLISHED.contains(&token.trim().to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn swedish_and_posix_formats_agree() {
        for (swedish, posix, expected) in [
            ("3,33 %", "3.33%", 3.33_f32),
            ("0,99 %", "0.99%", 0.99),
            ("12,50 %", "12.50%", 12.5),
            ("4,05\u{a0}%", "4.05 %", 4.05),
        ] {
            assert!(close(parse_rate(swedish).unwrap(), expected), "{swedish}");
            assert!(close(parse_rate(posix).unwrap(), expected), "{posix}");
        }
        assert!(close(parse_rate(" 3,4 ").unwrap(), 3.4));
    }

    #[test]
    fn empty_and_dash_are_errors_never_zero() {
        assert_eq!(parse_rate(""), Err(FieldError::Empty));
        assert_eq!(parse_rate("  "), Err(FieldError::Empty));
        assert_eq!(parse_rate("%"), Err(FieldError::Empty));
        assert_eq!(parse_rate("-"), Err(FieldError::NotPublished("-".into())));
        assert!(matches!(parse_rate("–"), Err(FieldError::NotPublished(_))));
        assert!(matches!(parse_rate("0,00 %"), Err(FieldError::NonPositiveRate(_))));
        assert!(matches!(parse_rate("abc"), Err(FieldError::InvalidNumber(_))));
    }

    #[test]
    fn rate_like_tokens() {
        assert!(looks_like_rate("3,45"));
        assert!(looks_like_rate("3.45%"));
        assert!(!looks_like_rate("2025"));
        assert!(!looks_like_rate("2025-01"));
        assert!(!looks_like_rate("-"));
        assert!(!looks_like_rate("mån"));
        assert!(is_not_published("–"));
    }

    #[test]
    fn footnote_markers_are_not_values() {
        assert!(looks_like_rate("2,91*"));
        assert!(looks_like_rate("2,91%¹"));
        assert!(close(parse_rate("2,91*").unwrap(), 2.91));
        assert!(close(parse_rate("3,05 % ²").unwrap(), 3.05));

        // A lone marker is neither a value nor a placeholder.
        assert!(!looks_like_rate("*"));
        assert!(!is_not_published("*"));
        assert_eq!(parse_rate("*"), Err(FieldError::Empty));
    }
}
