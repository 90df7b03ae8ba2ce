//! Literal encoding helpers shared by both dialects.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::error::{TranspileError, TranspileResult};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Hex of a uuid in the byte order the platform stores it (`binary(16)`).
///
/// For `p0-p1-p2-p3-p4` the stored order is `p3 p4 p2 p1 p0`.
pub fn uuid_hex(uuid: &Uuid) -> String {
    let text = uuid.hyphenated().to_string();
    let parts: Vec<&str> = text.split('-').collect();
    if parts.len() != 5 {
        return uuid.simple().to_string().to_uppercase();
    }
    format!("{}{}{}{}{}", parts[3], parts[4], parts[2], parts[1], parts[0]).to_uppercase()
}

/// Big-endian hex of an entity type code (`binary(4)`).
pub fn type_code_hex(code: i32) -> String {
    format!("{:08X}", code)
}

pub fn parse_uuid(literal: &str) -> TranspileResult<Uuid> {
    Uuid::parse_str(literal.trim_matches(|c| c == '{' || c == '}'))
        .map_err(|e| TranspileError::statement(None, format!("Invalid uuid literal [{}]: {}", literal, e)))
}

/// Parse an entity literal `{code:uuid}`.
pub fn parse_entity(literal: &str) -> TranspileResult<(i32, Uuid)> {
    let inner = literal.trim().trim_start_matches('{').trim_end_matches('}');
    let (code, uuid) = inner
        .split_once(':')
        .ok_or_else(|| TranspileError::statement(None, format!("Invalid entity literal [{}]", literal)))?;
    let code = code
        .trim()
        .parse::<i32>()
        .map_err(|_| TranspileError::statement(None, format!("Invalid entity type code [{}]", literal)))?;
    Ok((code, parse_uuid(uuid.trim())?))
}

pub fn is_true_literal(literal: &str) -> bool {
    literal.eq_ignore_ascii_case("true") || literal == "1" || literal == "0x01"
}

/// Parse a datetime literal; date-only values are taken at midnight.
pub fn parse_datetime(literal: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(literal, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(literal, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Shift a datetime by whole years; Feb 29 lands on Feb 28 in common years.
pub fn shift_years(value: NaiveDateTime, years: i32) -> NaiveDateTime {
    if years == 0 {
        return value;
    }
    let year = value.year() + years;
    value
        .with_year(year)
        .or_else(|| value.with_day(28).and_then(|v| v.with_year(year)))
        .unwrap_or(value)
}

/// Format as `yyyy-MM-ddTHH:mm:ss` after applying the year offset.
///
/// Returns `None` when the literal is not a recognizable datetime.
pub fn format_datetime(literal: &str, year_offset: i32) -> Option<String> {
    parse_datetime(literal)
        .map(|value| shift_years(value, year_offset).format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Escape a string literal body for single-quoted SQL.
pub fn escape_string(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_hex_byte_order() {
        let uuid = Uuid::parse_str("08ec109e-4fe7-11ed-9c80-0050568fa7a7").unwrap();
        assert_eq!(uuid_hex(&uuid), "9C800050568FA7A711ED4FE708EC109E");
    }

    #[test]
    fn test_parse_entity() {
        let (code, uuid) = parse_entity("{42:08ec109e-4fe7-11ed-9c80-0050568fa7a7}").unwrap();
        assert_eq!(code, 42);
        assert_eq!(uuid.to_string(), "08ec109e-4fe7-11ed-9c80-0050568fa7a7");
        assert!(parse_entity("{42}").is_err());
        assert!(parse_entity("{x:08ec109e-4fe7-11ed-9c80-0050568fa7a7}").is_err());
    }

    #[test]
    fn test_format_datetime_with_offset() {
        assert_eq!(
            format_datetime("2023-05-01T10:20:30", 2000).as_deref(),
            Some("4023-05-01T10:20:30")
        );
        assert_eq!(format_datetime("2023-05-01", 0).as_deref(), Some("2023-05-01T00:00:00"));
        assert_eq!(format_datetime("yesterday", 0), None);
    }

    #[test]
    fn test_leap_day_shift() {
        assert_eq!(
            format_datetime("2024-02-29T00:00:00", 1).as_deref(),
            Some("2025-02-28T00:00:00")
        );
    }

    #[test]
    fn test_type_code_hex() {
        assert_eq!(type_code_hex(42), "0000002A");
    }
}
