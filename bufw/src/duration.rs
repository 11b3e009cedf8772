//! Duration text parsing and formatting.
//!
//! Accepts strings like "100ms", "10s", "1h30m" or "1.5s": a sequence of
//! decimal numbers, each with an optional fraction and a unit suffix.
//! Valid units are "ns", "us" (or "µs"), "ms", "s", "m", "h".

use std::time::Duration;

use crate::error::{Error, Result};

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// Largest accepted duration, in nanoseconds.
const MAX_NANOS: u128 = u64::MAX as u128;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(NANOSECOND),
        "us" | "µs" | "μs" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

/// Parses a duration string like "100ms", "10s", "1h30m45s" or "2.5m".
///
/// A bare "0" is accepted without a unit. Negative durations are rejected,
/// except for a signed zero such as "-0s".
pub fn parse_duration(s: &str) -> Result<Duration> {
    let invalid = |reason: &str| Error::ParseDuration(format!("{} in {:?}", reason, s));

    let mut rest = s;
    let mut negative = false;
    if let Some(r) = rest.strip_prefix('+') {
        rest = r;
    } else if let Some(r) = rest.strip_prefix('-') {
        rest = r;
        negative = true;
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, has_whole, r) = leading_int(rest).ok_or_else(|| invalid("overflow"))?;
        rest = r;

        let mut frac: u128 = 0;
        let mut scale: u128 = 1;
        let mut has_frac = false;
        if let Some(r) = rest.strip_prefix('.') {
            let (f, sc, r) = leading_fraction(r);
            frac = f;
            scale = sc;
            has_frac = r.len() < rest.len() - 1;
            rest = r;
        }
        if !has_whole && !has_frac {
            return Err(invalid("missing number"));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(invalid("missing unit"));
        }
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let per = unit_nanos(unit).ok_or_else(|| invalid(&format!("unknown unit {:?}", unit)))?;

        let value = whole
            .checked_mul(per)
            .and_then(|v| v.checked_add(frac * per / scale))
            .filter(|v| *v <= MAX_NANOS)
            .ok_or_else(|| invalid("overflow"))?;
        total = total
            .checked_add(value)
            .filter(|v| *v <= MAX_NANOS)
            .ok_or_else(|| invalid("overflow"))?;
    }

    if negative && total > 0 {
        return Err(invalid("negative duration"));
    }
    Ok(Duration::from_nanos(total as u64))
}

/// Consumes leading decimal digits. Returns the value, whether any digit
/// was seen, and the remainder. `None` on overflow.
fn leading_int(s: &str) -> Option<(u128, bool, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let mut v: u128 = 0;
    for b in s[..end].bytes() {
        v = v.checked_mul(10)?.checked_add(u128::from(b - b'0'))?;
        if v > MAX_NANOS {
            return None;
        }
    }
    Some((v, end > 0, &s[end..]))
}

/// Consumes fraction digits after the decimal point. Digits past the
/// representable precision are dropped.
fn leading_fraction(s: &str) -> (u128, u128, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let mut v: u128 = 0;
    let mut scale: u128 = 1;
    for b in s[..end].bytes() {
        if scale >= 1_000_000_000_000_000_000 {
            continue;
        }
        v = v * 10 + u128::from(b - b'0');
        scale *= 10;
    }
    (v, scale, &s[end..])
}

/// Formats a duration in its canonical text form, e.g. "10s", "100ms",
/// "1h30m0s", "1.5µs". The output parses back with [`parse_duration`].
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < MICROSECOND {
        return format!("{}ns", nanos);
    }
    if nanos < MILLISECOND {
        return format!("{}µs", decimal(nanos, MICROSECOND, 3));
    }
    if nanos < SECOND {
        return format!("{}ms", decimal(nanos, MILLISECOND, 6));
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let s = decimal(u128::from(secs % 60) * SECOND + u128::from(d.subsec_nanos()), SECOND, 9);

    if hours > 0 {
        format!("{}h{}m{}s", hours, mins, s)
    } else if mins > 0 {
        format!("{}m{}s", mins, s)
    } else {
        format!("{}s", s)
    }
}

fn decimal(n: u128, unit: u128, width: usize) -> String {
    let whole = n / unit;
    let rem = n % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h30m45s").unwrap(), Duration::from_secs(5445));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("250µs").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("42ns").unwrap(), Duration::from_nanos(42));
        assert_eq!(parse_duration("+5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_signed_zero() {
        assert_eq!(parse_duration("-0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("-0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("-0.0ms").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+0h").unwrap(), Duration::ZERO);

        let err = parse_duration("-1ns").unwrap_err();
        assert!(err.to_string().contains("negative duration"), "got {}", err);
    }

    #[test]
    fn test_parse_fraction() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1.s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("2.5m").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_duration("1.000000001s").unwrap(), Duration::new(1, 1));
    }

    #[test]
    fn test_parse_invalid() {
        for s in ["", "10", "ms", "1x", "1.5", ".s", "-1s", "-", "1h-5m", "abc", "18446744073710s"] {
            let err = parse_duration(s).unwrap_err();
            assert!(
                matches!(err, Error::ParseDuration(_)),
                "expected parse error for {:?}, got {:?}",
                s,
                err
            );
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(42)), "42ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.5µs");
        assert_eq!(format_duration(Duration::from_millis(100)), "100ms");
        assert_eq!(format_duration(Duration::from_secs(10)), "10s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
    }

    #[test]
    fn test_format_parses_back() {
        for d in [
            Duration::from_nanos(7),
            Duration::from_micros(1500),
            Duration::from_millis(100),
            Duration::new(3725, 500_000_000),
        ] {
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }
}
