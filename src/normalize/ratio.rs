//! LTV bracket labels: `0-60 %`, `60–75%`, `upp till 60 %`, `över 85 %`.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::RatioBoundaries;
use crate::error::FieldError;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("static regex"));

const UPPER_BOUND_MARKERS: &[&str] = &["upp till", "till och med", "högst", "max", "under", "<", "≤", "up to"];
const LOWER_BOUND_MARKERS: &[&str] = &["över", "mer än", "från", "min", ">", "≥", "above", "over"];

/// Parse a bracket label into fractions of collateral value.
///
/// Numbers above 1 are percentages; numbers up to 1 are already fractions.
pub fn parse_ratio_bracket(raw: &str) -> Result<RatioBoundaries, FieldError> {
    let label = raw.trim().to_lowercase();
    let invalid = || FieldError::InvalidRatio(raw.trim().to_string());

    let numbers: Vec<f32> = NUMBER
        .find_iter(&label)
        .map(|m| m.as_str().replace(',', ".").parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;

    let as_fraction = |v: f32| if v > 1.0 { v / 100.0 } else { v };

    let (min, max) = match numbers.as_slice() {
        [low, high] => (as_fraction(*low), as_fraction(*high)),
        [single] if UPPER_BOUND_MARKERS.iter().any(|m| label.contains(m)) => (0.0, as_fraction(*single)),
        [single] if LOWER_BOUND_MARKERS.iter().any(|m| label.contains(m)) => (as_fraction(*single), 1.0),
        _ => return Err(invalid()),
    };

    RatioBoundaries::new(min, max).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(raw: &str) -> (f32, f32) {
        let b = parse_ratio_bracket(raw).unwrap();
        (b.min_ratio(), b.max_ratio())
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
    }

    #[test]
    fn ranges_and_open_brackets() {
        assert!(close(bounds("0-60 %"), (0.0, 0.6)));
        assert!(close(bounds("60–75%"), (0.6, 0.75)));
        assert!(close(bounds("Upp till 60 %"), (0.0, 0.6)));
        assert!(close(bounds("< 50%"), (0.0, 0.5)));
        assert!(close(bounds("Över 85 %"), (0.85, 1.0)));
        assert!(close(bounds("0,5-0,7"), (0.5, 0.7)));
    }

    #[test]
    fn labels_without_bracket_are_rejected() {
        assert!(parse_ratio_bracket("Belåningsgrad").is_err());
        assert!(parse_ratio_bracket("60 %").is_err());
        assert!(parse_ratio_bracket("75-60 %").is_err());
    }
}
