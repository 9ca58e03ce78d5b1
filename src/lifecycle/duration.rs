//! Extended duration literals and notify-age ordering.
//!
//! Ages in the configuration are written as `30d`, `2w` or `1mo` on top of
//! the usual `90s`, `15m`, `1h30m` forms, so the standard grammar is only the
//! fallback here.

use std::time::Duration;
use thiserror::Error;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Errors raised while reading durations or resource timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("'{0}' added to the timestamp is out of range")]
    OutOfRange(String),
}

/// Parse a duration literal.
///
/// `d` (days), `w` (weeks) and `mo` (30 day months) take an integer prefix.
/// Anything else goes through the standard grammar: a sequence of decimal
/// numbers each followed by one of `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.
pub fn parse_duration(literal: &str) -> Result<Duration, ParseError> {
    let invalid = || ParseError::InvalidDuration(literal.to_string());

    let calendar = [("mo", 30 * DAY), ("w", 7 * DAY), ("d", DAY)];
    for (suffix, unit_secs) in calendar {
        if let Some(count) = literal.strip_suffix(suffix) {
            let count: u64 = count.parse().map_err(|_| invalid())?;
            let secs = count.checked_mul(unit_secs).ok_or_else(invalid)?;
            return Ok(Duration::from_secs(secs));
        }
    }

    parse_standard(literal).ok_or_else(invalid)
}

fn parse_standard(literal: &str) -> Option<Duration> {
    let mut rest = literal.strip_prefix('+').unwrap_or(literal);
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 60 * 60 * 1_000_000_000,
            _ => return None,
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return None;
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().ok()?
        };
        let mut component = whole.checked_mul(unit_nanos)?;
        if !fraction.is_empty() {
            let scale = 10u128.checked_pow(fraction.len() as u32)?;
            let fraction: u128 = fraction.parse().ok()?;
            component = component.checked_add(fraction.checked_mul(unit_nanos)? / scale)?;
        }

        total_nanos = total_nanos.checked_add(component)?;
        rest = tail;
    }

    u64::try_from(total_nanos).ok().map(Duration::from_nanos)
}

/// Sort notify ages ascending by resolved duration.
///
/// Unparsable entries compare as zero and end up at the front. The sort is
/// stable, so equal durations keep their configured order.
pub fn sort_thresholds(ages: &mut [String]) {
    ages.sort_by_key(|age| parse_duration(age).unwrap_or(Duration::ZERO));
}
