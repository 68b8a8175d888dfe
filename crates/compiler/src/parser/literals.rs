/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * YAML 1.1 resolution of plain scalars into typed, normalized literals.
 */

use std::sync::LazyLock;

use bigdecimal::num_bigint::BigInt;
use chrono::{FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;

use crate::ast::LiteralType;

static INT_BINARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?0b[01_]+$").expect("valid pattern"));
static INT_OCTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?0[0-7_]+$").expect("valid pattern"));
static INT_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(0|[1-9][0-9_]*)$").expect("valid pattern"));
static INT_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?0x[0-9a-fA-F_]+$").expect("valid pattern"));
static INT_SEXAGESIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[1-9][0-9_]*(:[0-5]?[0-9])+$").expect("valid pattern"));
static FLOAT_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?([0-9][0-9_]*)?\.[0-9_]*([eE][-+][0-9]+)?$").expect("valid pattern")
});
static FLOAT_SEXAGESIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?[0-9][0-9_]*(:[0-5]?[0-9])+\.[0-9_]*$").expect("valid pattern")
});
static FLOAT_INFINITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\.(inf|Inf|INF)$").expect("valid pattern"));
static FLOAT_NAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.(nan|NaN|NAN)$").expect("valid pattern"));
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{1,2})-(?P<day>[0-9]{1,2})(?:(?:[Tt]|[ \t]+)(?P<hour>[0-9]{1,2}):(?P<minute>[0-9]{2}):(?P<second>[0-9]{2})(?:\.(?P<fraction>[0-9]*))?(?:[ \t]*(?P<zone>Z|[-+][0-9]{1,2}(?::?[0-9]{2})?))?)?$",
    )
    .expect("valid pattern")
});

/// Resolves an untagged plain scalar. Anything unrecognized is a string.
pub(crate) fn resolve_plain(text: &str) -> (LiteralType, String) {
    if is_null(text) {
        return (LiteralType::Null, "null".to_string());
    }
    if let Some(value) = parse_bool(text) {
        return (LiteralType::Bool, value.to_string());
    }
    if let Some(value) = parse_integer(text) {
        return (LiteralType::Integer, value);
    }
    if let Some(value) = parse_float(text) {
        return (LiteralType::Float, value);
    }
    if let Some(value) = parse_timestamp(text) {
        return (LiteralType::Timestamp, value);
    }
    (LiteralType::String, text.to_string())
}

/// Resolves a scalar carrying a `!!name` core-schema tag.
///
/// Returns `None` when the text does not fit the tag or the tag is unknown.
pub(crate) fn resolve_tagged(tag: &str, text: &str) -> Option<(LiteralType, String)> {
    match tag {
        "str" => Some((LiteralType::String, text.to_string())),
        "null" => is_null(text).then(|| (LiteralType::Null, "null".to_string())),
        "bool" => parse_bool(text).map(|value| (LiteralType::Bool, value.to_string())),
        "int" => parse_integer(text).map(|value| (LiteralType::Integer, value)),
        "float" => parse_float(text)
            .or_else(|| parse_integer(text).map(|value| format!("{value}.0")))
            .map(|value| (LiteralType::Float, value)),
        "timestamp" => parse_timestamp(text).map(|value| (LiteralType::Timestamp, value)),
        _ => None,
    }
}

pub(crate) fn is_null(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "y" | "yes" | "on" | "true" => Some(true),
        "n" | "no" | "off" | "false" => Some(false),
        _ => None,
    }
}

/// Canonical decimal text of a YAML 1.1 integer.
pub(crate) fn parse_integer(text: &str) -> Option<String> {
    let (negative, unsigned) = split_sign(text);
    let value: BigInt = if INT_BINARY.is_match(text) {
        parse_radix(&unsigned[2..], 2)?
    } else if INT_HEX.is_match(text) {
        parse_radix(&unsigned[2..], 16)?
    } else if INT_OCTAL.is_match(text) {
        parse_radix(&unsigned[1..], 8)?
    } else if INT_DECIMAL.is_match(text) {
        parse_radix(unsigned, 10)?
    } else if INT_SEXAGESIMAL.is_match(text) {
        unsigned
            .split(':')
            .try_fold(BigInt::from(0u8), |total, part| Some(total * 60u32 + parse_radix(part, 10)?))?
    } else {
        return None;
    };
    Some(if negative { -value } else { value }.to_string())
}

/// Canonical text of a YAML 1.1 float.
pub(crate) fn parse_float(text: &str) -> Option<String> {
    if FLOAT_INFINITY.is_match(text) {
        return Some(if text.starts_with('-') { "-Infinity" } else { "Infinity" }.to_string());
    }
    if FLOAT_NAN.is_match(text) {
        return Some("NaN".to_string());
    }
    let (negative, unsigned) = split_sign(text);
    let value = if FLOAT_DECIMAL.is_match(text) {
        if !unsigned.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        unsigned.replace('_', "").parse::<f64>().ok()?
    } else if FLOAT_SEXAGESIMAL.is_match(text) {
        let cleaned = unsigned.replace('_', "");
        let mut parts: Vec<&str> = cleaned.split(':').collect();
        let seconds: f64 = parts.pop()?.parse().ok()?;
        let whole = parts.iter().try_fold(0f64, |total, part| {
            part.parse::<f64>().ok().map(|value| total * 60.0 + value)
        })?;
        whole * 60.0 + seconds
    } else {
        return None;
    };
    let value = if negative { -value } else { value };
    Some(format_float(value))
}

/// RFC 3339 UTC text of a YAML 1.1 timestamp.
pub(crate) fn parse_timestamp(text: &str) -> Option<String> {
    let captures = TIMESTAMP.captures(text)?;
    let number = |name: &str| -> Option<u32> {
        captures.name(name).map_or(Some(0), |m| m.as_str().parse().ok())
    };

    let year: i32 = captures["year"].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number("month")?, number("day")?)?;

    let nanos = match captures.name("fraction").map(|m| m.as_str()) {
        Some(fraction) if !fraction.is_empty() => {
            let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
            digits.parse().ok()?
        }
        _ => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(number("hour")?, number("minute")?, number("second")?, nanos)?;

    let offset_seconds = match captures.name("zone").map(|m| m.as_str()) {
        None | Some("Z") => 0,
        Some(zone) => {
            let sign = if zone.starts_with('-') { -1 } else { 1 };
            let digits = zone[1..].replace(':', "");
            let (hours, minutes) = if digits.len() > 2 {
                digits.split_at(digits.len() - 2)
            } else {
                (digits.as_str(), "0")
            };
            let hours: i32 = hours.parse().ok()?;
            let minutes: i32 = minutes.parse().ok()?;
            sign * (hours * 3600 + minutes * 60)
        }
    };
    let offset = FixedOffset::east_opt(offset_seconds)?;
    let local = offset
        .from_local_datetime(&date.and_time(time))
        .single()?;
    Some(
        local
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    )
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

fn parse_radix(digits: &str, radix: u32) -> Option<BigInt> {
    let digits = digits.replace('_', "");
    if digits.is_empty() {
        return Some(BigInt::from(0u8));
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-Infinity" } else { "Infinity" }.to_string();
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_forms() {
        for text in ["", "~", "null", "Null", "NULL"] {
            assert_eq!(resolve_plain(text).0, LiteralType::Null, "{text}");
        }
        assert_eq!(resolve_plain("nULL").0, LiteralType::String);
    }

    #[test]
    fn test_bool_forms_are_case_insensitive() {
        for text in ["y", "Yes", "ON", "true", "TRUE"] {
            assert_eq!(resolve_plain(text), (LiteralType::Bool, "true".to_string()), "{text}");
        }
        for text in ["n", "NO", "Off", "false"] {
            assert_eq!(resolve_plain(text), (LiteralType::Bool, "false".to_string()), "{text}");
        }
    }

    #[test]
    fn test_integer_forms_normalize_to_decimal() {
        let cases = [
            ("685230", "685230"),
            ("+685_230", "685230"),
            ("02472256", "685230"),
            ("0x_0A_74_AE", "685230"),
            ("0b1010_0111_0100_1010_1110", "685230"),
            ("190:20:30", "685230"),
            ("-42", "-42"),
            ("0", "0"),
        ];
        for (text, expected) in cases {
            assert_eq!(
                resolve_plain(text),
                (LiteralType::Integer, expected.to_string()),
                "{text}"
            );
        }
    }

    #[test]
    fn test_wide_integers_stay_integers() {
        let digits = "123456789012345678901234567890123456789012345678901234567890";
        assert_eq!(resolve_plain(digits), (LiteralType::Integer, digits.to_string()));
        assert_eq!(
            resolve_plain(&format!("-{digits}")),
            (LiteralType::Integer, format!("-{digits}"))
        );
        assert_eq!(
            resolve_plain("0x1_0000_0000_0000_0000_0000_0000_0000_0000"),
            (
                LiteralType::Integer,
                "340282366920938463463374607431768211456".to_string()
            )
        );
    }

    #[test]
    fn test_float_forms() {
        let cases = [
            ("6.8523015e+5", "685230.15"),
            ("685.230_15e+03", "685230.15"),
            ("685_230.15", "685230.15"),
            ("190:20:30.15", "685230.15"),
            ("1.0", "1.0"),
            (".5", "0.5"),
            ("-.inf", "-Infinity"),
            (".Inf", "Infinity"),
            (".NaN", "NaN"),
        ];
        for (text, expected) in cases {
            assert_eq!(resolve_plain(text), (LiteralType::Float, expected.to_string()), "{text}");
        }
        assert_eq!(resolve_plain(".").0, LiteralType::String);
    }

    #[test]
    fn test_timestamps_normalize_to_utc() {
        let cases = [
            ("2001-12-14t21:59:43.10-05:00", "2001-12-15T02:59:43.100Z"),
            ("2001-12-14 21:59:43.10 -5", "2001-12-15T02:59:43.100Z"),
            ("2001-12-15T02:59:43.1Z", "2001-12-15T02:59:43.100Z"),
            ("2001-12-15 2:59:43.10", "2001-12-15T02:59:43.100Z"),
            ("2002-12-14", "2002-12-14T00:00:00Z"),
        ];
        for (text, expected) in cases {
            assert_eq!(
                resolve_plain(text),
                (LiteralType::Timestamp, expected.to_string()),
                "{text}"
            );
        }
        assert_eq!(resolve_plain("2002-13-45").0, LiteralType::String);
    }

    #[test]
    fn test_other_text_is_string() {
        for text in ["hello", "1.2.3", "0x", "12abc", "arn:aws:s3:::bucket"] {
            assert_eq!(resolve_plain(text).0, LiteralType::String, "{text}");
        }
    }

    #[test]
    fn test_tagged_literals() {
        assert_eq!(resolve_tagged("str", "123"), Some((LiteralType::String, "123".to_string())));
        assert_eq!(resolve_tagged("int", "0x10"), Some((LiteralType::Integer, "16".to_string())));
        assert_eq!(resolve_tagged("float", "3"), Some((LiteralType::Float, "3.0".to_string())));
        assert_eq!(resolve_tagged("int", "abc"), None);
        assert_eq!(resolve_tagged("binary", "abc"), None);
    }
}
