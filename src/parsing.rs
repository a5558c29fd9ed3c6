//! Locale-aware amount parsing.
//!
//! Extracted invoices print amounts the Argentine way: `.` groups thousands and `,`
//! separates decimals (`"$ 7.092.636,97"`). Every amount is rounded half away from
//! zero to a whole currency unit exactly once, here.

use crate::schema::RawAmount;
use crate::utils::round_f64;
use thiserror::Error;

/// Markers stripped from amounts when the configuration does not override them.
pub const DEFAULT_CURRENCY_MARKERS: [&str; 3] = ["US$", "ARS", "$"];

/// Longest integer part accepted, keeps the `i128` accumulator far from overflow.
const MAX_DIGITS: usize = 30;

/// Largest magnitude an amount may have. Sums of many such amounts, and their products
/// with a tax total in `i128`, stay far from the integer limits.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("nothing left after stripping currency markers")]
    Empty,

    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),

    #[error("malformed thousands grouping")]
    MalformedGrouping,

    #[error("more than one decimal separator")]
    MultipleDecimalSeparators,

    #[error("amount exceeds the supported magnitude of 10^15")]
    Overflow,

    #[error("not a finite number")]
    NotFinite,
}

/// Parses an extracted amount. Blank text is an absent value, not an error.
pub fn parse_raw_amount(
    raw: &RawAmount,
    currency_markers: &[String],
) -> std::result::Result<Option<i64>, AmountParseError> {
    match raw {
        RawAmount::Number(value) => {
            let rounded = round_f64(*value).ok_or(AmountParseError::NotFinite)?;
            within_bounds(rounded as i128).map(Some)
        }
        RawAmount::Text(text) => parse_amount(text, currency_markers),
    }
}

pub fn parse_amount(
    text: &str,
    currency_markers: &[String],
) -> std::result::Result<Option<i64>, AmountParseError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let mut markers: Vec<&str> = currency_markers
        .iter()
        .map(String::as_str)
        .filter(|m| !m.is_empty())
        .collect();
    // "US$" must go before "$"
    markers.sort_by_key(|m| std::cmp::Reverse(m.len()));

    let mut stripped = text.to_string();
    for marker in markers {
        stripped = stripped.replace(marker, "");
    }
    let compact: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

    let (negative, body) = split_sign(&compact);
    if body.is_empty() {
        return Err(AmountParseError::Empty);
    }

    if let Some(c) = body
        .chars()
        .find(|c| !c.is_ascii_digit() && *c != '.' && *c != ',')
    {
        return Err(AmountParseError::UnexpectedCharacter(c));
    }

    let (integer_part, fraction_part) = split_decimal(body)?;
    let magnitude = round_digits(&integer_part, &fraction_part)?;
    let signed = if negative { -magnitude } else { magnitude };

    within_bounds(signed).map(Some)
}

fn within_bounds(value: i128) -> std::result::Result<i64, AmountParseError> {
    if value.unsigned_abs() > MAX_AMOUNT as u128 {
        return Err(AmountParseError::Overflow);
    }
    Ok(value as i64)
}

fn split_sign(compact: &str) -> (bool, &str) {
    if let Some(inner) = compact
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return (true, inner);
    }
    if let Some(rest) = compact.strip_prefix('-') {
        return (true, rest);
    }
    if let Some(rest) = compact.strip_prefix('+') {
        return (false, rest);
    }
    (false, compact)
}

/// Splits into (integer digits, fraction digits), dropping grouping dots.
fn split_decimal(body: &str) -> std::result::Result<(String, String), AmountParseError> {
    let mut comma_parts = body.split(',');
    let before_comma = comma_parts.next().unwrap_or_default();
    let after_comma = comma_parts.next();
    if comma_parts.next().is_some() {
        return Err(AmountParseError::MultipleDecimalSeparators);
    }

    match after_comma {
        Some(fraction) => {
            if fraction.is_empty() || fraction.contains('.') {
                return Err(AmountParseError::MalformedGrouping);
            }
            Ok((ungroup(before_comma)?, fraction.to_string()))
        }
        None => {
            let groups: Vec<&str> = before_comma.split('.').collect();
            // A lone dot not followed by a 3-digit group is a canonical decimal point.
            if groups.len() == 2 && groups[1].len() != 3 {
                if groups[0].is_empty() || groups[1].is_empty() {
                    return Err(AmountParseError::MalformedGrouping);
                }
                return Ok((groups[0].to_string(), groups[1].to_string()));
            }
            Ok((ungroup(before_comma)?, String::new()))
        }
    }
}

fn ungroup(integer: &str) -> std::result::Result<String, AmountParseError> {
    let groups: Vec<&str> = integer.split('.').collect();
    if groups.len() == 1 {
        if integer.is_empty() {
            return Err(AmountParseError::MalformedGrouping);
        }
        return Ok(integer.to_string());
    }

    let first = groups[0];
    if first.is_empty() || first.len() > 3 {
        return Err(AmountParseError::MalformedGrouping);
    }
    if groups[1..].iter().any(|g| g.len() != 3) {
        return Err(AmountParseError::MalformedGrouping);
    }
    Ok(groups.concat())
}

fn round_digits(integer: &str, fraction: &str) -> std::result::Result<i128, AmountParseError> {
    let integer = integer.trim_start_matches('0');
    if integer.len() > MAX_DIGITS {
        return Err(AmountParseError::Overflow);
    }

    let mut value: i128 = 0;
    for digit in integer.bytes() {
        value = value * 10 + (digit - b'0') as i128;
    }

    // Only the first fractional digit decides half-away-from-zero rounding.
    if let Some(first) = fraction.bytes().next() {
        if first >= b'5' {
            value += 1;
        }
    }

    Ok(value)
}
