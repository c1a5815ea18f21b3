//! Cleanup rules for human-readable table cells.
//!
//! Wikipedia tables mix footnote markers, ranks, report years and unit words
//! into their numbers. The rules here strip the known patterns and either
//! produce an integer or fail loudly; a cell is never guessed into a number.

use crate::error::{EtlError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const MILLION_MARKER: &str = "million";
const NOT_AVAILABLE: &str = "N/A";

// Footnote markers removed from text cells, plus invisible separators
const TEXT_NOISE: [&str; 6] = ["[c]", "[d]", "[zh]", "\u{a0}", "\u{feff}", NOT_AVAILABLE];

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\w{1,20}\]").expect("valid citation regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d{4}\)").expect("valid year regex"));
static RANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d{1,20}\w{1,20}\)").expect("valid rank regex"));
static NUMERIC_LOOKING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d[\d,]*|\d+(\.\d+)?\s*million)$").expect("valid numeric regex")
});

/// A single normalized cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Integer(i64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Read the cell as an optional integer; text that survived cleanup is an error.
    pub fn into_integer(self) -> Result<Option<i64>> {
        match self {
            CellValue::Integer(n) => Ok(Some(n)),
            CellValue::Missing => Ok(None),
            CellValue::Text(t) => Err(EtlError::NumericParse(t)),
        }
    }
}

/// Turn a number such as `"1,234,567"`, `"45[a](1991)"` or `"10.4 million"` into an integer.
///
/// Anything left over after the cleanup rules is reported as [`EtlError::NumericParse`].
pub fn normalize_number(text: &str) -> Result<i64> {
    if let Some(idx) = text.find(MILLION_MARKER) {
        // Fractional millions are truncated, not rounded
        let whole = text[..idx].trim().split('.').next().unwrap_or_default();
        return whole
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_mul(1_000_000))
            .ok_or_else(|| EtlError::NumericParse(text.to_string()));
    }

    let no_commas = text.trim().replace(',', "");
    let no_citations = CITATION.replace_all(&no_commas, "");
    let no_year = YEAR.replace_all(&no_citations, "");
    let no_rank = RANK.replace_all(&no_year, "");
    let first_token = no_rank.split_whitespace().next().unwrap_or_default();
    let residual = first_token.replace(NOT_AVAILABLE, "");

    residual
        .parse::<i64>()
        .map_err(|_| EtlError::NumericParse(text.to_string()))
}

/// Clean a text cell. Unless `skip_digit_path` is set, text starting with a
/// digit goes through [`normalize_number`] and comes back as its decimal form.
pub fn normalize_text(text: &str, skip_digit_path: bool) -> Result<String> {
    if !skip_digit_path && starts_with_digit(text) {
        return normalize_number(text).map(|n| n.to_string());
    }
    Ok(strip_text_noise(text))
}

/// One normalization pass producing a typed cell; empty text becomes [`CellValue::Missing`].
pub fn normalize_cell(text: &str, skip_digit_path: bool) -> Result<CellValue> {
    if !skip_digit_path && starts_with_digit(text) {
        return normalize_number(text).map(CellValue::Integer);
    }
    let cleaned = strip_text_noise(text);
    if cleaned.is_empty() {
        Ok(CellValue::Missing)
    } else {
        Ok(CellValue::Text(cleaned))
    }
}

/// Whether a fact value is a plain count (`"12,000"`) or a million amount (`"1.5 million"`).
pub fn looks_numeric(text: &str) -> bool {
    NUMERIC_LOOKING.is_match(text.trim())
}

fn starts_with_digit(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn strip_text_noise(text: &str) -> String {
    TEXT_NOISE
        .iter()
        .fold(text.to_string(), |acc, noise| acc.replace(noise, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_million_truncates_fraction() {
        assert_eq!(normalize_number("10.4324 million").unwrap(), 10_000_000);
        assert_eq!(normalize_number("8.9 million").unwrap(), 8_000_000);
        assert_eq!(normalize_number("3 million").unwrap(), 3_000_000);
    }

    #[test]
    fn test_million_short_circuits_other_rules() {
        // A citation after the unit is never looked at
        assert_eq!(normalize_number("2.1 million[12]").unwrap(), 2_000_000);
        assert!(matches!(
            normalize_number("about 4 million"),
            Err(EtlError::NumericParse(_))
        ));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(normalize_number("1,234,567").unwrap(), 1_234_567);
        assert_eq!(normalize_number("  9,000  ").unwrap(), 9_000);
    }

    #[test]
    fn test_citations_years_and_ranks() {
        assert_eq!(normalize_number("45[a](1991)").unwrap(), 45);
        assert_eq!(normalize_number("7,400,000[12]").unwrap(), 7_400_000);
        assert_eq!(normalize_number("3,000,000 (2019)").unwrap(), 3_000_000);
        assert_eq!(normalize_number("37,400,068(1st)").unwrap(), 37_400_068);
    }

    #[test]
    fn test_first_token_only() {
        assert_eq!(normalize_number("2019 (estimate)").unwrap(), 2019);
        assert_eq!(normalize_number("7 wonders").unwrap(), 7);
    }

    #[test]
    fn test_unparseable_residuals() {
        assert!(matches!(normalize_number("N/A"), Err(EtlError::NumericParse(_))));
        assert!(matches!(normalize_number(""), Err(EtlError::NumericParse(_))));
        assert!(matches!(normalize_number("12.5"), Err(EtlError::NumericParse(_))));
        assert!(matches!(normalize_number("abc"), Err(EtlError::NumericParse(_))));
    }

    #[test]
    fn test_normalize_text_digit_path() {
        assert_eq!(normalize_text("1,500,000[c]", false).unwrap(), "1500000");
        assert_eq!(normalize_text("7 wonders", false).unwrap(), "7");
        assert!(normalize_text("7x wonders", false).is_err());
    }

    #[test]
    fn test_normalize_text_skips_digit_path() {
        assert_eq!(normalize_text("7x wonders", true).unwrap(), "7x wonders");
        assert_eq!(normalize_text("1,500,000", true).unwrap(), "1,500,000");
    }

    #[test]
    fn test_normalize_text_strips_noise() {
        assert_eq!(normalize_text("Louvre[c]", false).unwrap(), "Louvre");
        assert_eq!(normalize_text("Beijing[zh]", false).unwrap(), "Beijing");
        assert_eq!(normalize_text("New\u{a0}York\u{feff}", false).unwrap(), "NewYork");
        assert_eq!(normalize_text("N/A", false).unwrap(), "");
        // Only the listed markers go; other footnotes stay in text cells
        assert_eq!(normalize_text("Paris[a]", false).unwrap(), "Paris[a]");
    }

    #[test]
    fn test_normalize_cell_variants() {
        assert_eq!(normalize_cell("9,650,000", false).unwrap(), CellValue::Integer(9_650_000));
        assert_eq!(normalize_cell("Vatican City", false).unwrap(), CellValue::Text("Vatican City".into()));
        assert_eq!(normalize_cell("N/A", false).unwrap(), CellValue::Missing);
        assert_eq!(normalize_cell("", true).unwrap(), CellValue::Missing);
    }

    #[test]
    fn test_cell_into_integer() {
        assert_eq!(CellValue::Integer(5).into_integer().unwrap(), Some(5));
        assert_eq!(CellValue::Missing.into_integer().unwrap(), None);
        assert!(CellValue::Text("closed".into()).into_integer().is_err());
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("12,000"));
        assert!(looks_numeric("1.5 million"));
        assert!(looks_numeric("1999"));
        assert!(!looks_numeric("1 January 1793"));
        assert!(!looks_numeric("12.5"));
        assert!(!looks_numeric("Paris"));
    }
}
