use std::{collections::HashSet, str::FromStr};

use rust_decimal::Decimal;

use crate::error::ParseError;

const NUMBER_ESCAPE_CHAR: &[char] = &['%', ',', ' ', '"', '\n'];

/// Parses a decimal value from a given string.
///
/// Thousands separators, percent signs and the characters in `escape_chars` are
/// removed before parsing.
///
/// # Example
///
/// ```
/// let s = "1,234.56";
/// let decimal_value = parse_decimal(s, None).unwrap();
/// ```
pub fn parse_decimal(s: &str, escape_chars: Option<Vec<char>>) -> Result<Decimal, ParseError> {
    let cleaned = clean_escape_chars(s, escape_chars);
    Decimal::from_str(&cleaned).map_err(|why| {
        ParseError::InvalidNumber(format!("'{}' is not a decimal because {:?}", cleaned, why))
    })
}

/// Removes a set of escape characters from a given string.
///
/// ```
/// let clean_s = clean_escape_chars("12.5 EUR", Some(vec!['E', 'U', 'R']));
/// assert_eq!(clean_s, "12.5");
/// ```
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

/// Collapses every run of whitespace into a single space.
///
/// Page fragments come with line breaks and `&nbsp;` leftovers between words.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
