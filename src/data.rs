use std::{fmt, sync::OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single cell as it travels through a validation run.
///
/// Sources only ever produce [`CellValue::Empty`] or [`CellValue::Text`];
/// the typed variants appear once coercion has replaced a raw string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Builds a cell from raw text, treating blank strings as empty.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Empty => serde_json::Value::Null,
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
            CellValue::Integer(i) => serde_json::Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_integer(value: &str) -> Option<i64> {
    value.parse::<i64>().ok()
}

pub fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

fn slash_datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}\s\d{1,2}:\d{2}:\d{2}$")
            .expect("slash datetime pattern compiles")
    })
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y年%m月%d日 %H时%M分%S秒",
    "%Y年%m月%d日 %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Parses the `yyyy/M/d H:mm:ss` layout, the most common spreadsheet export.
pub fn parse_slash_datetime(value: &str) -> Option<NaiveDateTime> {
    if !slash_datetime_pattern().is_match(value) {
        return None;
    }
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%Y/%m/%d %H:%M:%S").ok()
}

/// Parses a timestamp using the fast slash layout first, then a list of
/// general layouts. Dates without a time component resolve to midnight.
/// Failures are reported as `None` and never propagate.
pub fn parse_flexible_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if slash_datetime_pattern().is_match(trimmed) {
        return parse_slash_datetime(trimmed);
    }
    let parsed = parse_general_datetime(trimmed);
    if parsed.is_none() {
        debug!("No datetime layout matched '{trimmed}'");
    }
    parsed
}

fn parse_general_datetime(value: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    parse_compact_datetime(value)
}

// yyyyMMdd and yyyyMMddHHmmss
fn parse_compact_datetime(value: &str) -> Option<NaiveDateTime> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match value.len() {
        8 => {
            let expanded = format!("{}-{}-{}", &value[0..4], &value[4..6], &value[6..8]);
            NaiveDate::parse_from_str(&expanded, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        }
        14 => {
            let expanded = format!(
                "{}-{}-{} {}:{}:{}",
                &value[0..4],
                &value[4..6],
                &value[6..8],
                &value[8..10],
                &value[10..12],
                &value[12..14]
            );
            NaiveDateTime::parse_from_str(&expanded, "%Y-%m-%d %H:%M:%S").ok()
        }
        _ => None,
    }
}

/// Line terminator of the host platform, used when joining report lines.
pub fn platform_line_break() -> &'static str {
    if cfg!(windows) { "\r\n" } else { "\n" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn from_raw_treats_blank_as_empty() {
        assert_eq!(CellValue::from_raw("   "), CellValue::Empty);
        assert_eq!(CellValue::from_raw(""), CellValue::Empty);
        assert_eq!(
            CellValue::from_raw(" x "),
            CellValue::Text(" x ".to_string())
        );
    }

    #[test]
    fn slash_layout_accepts_single_digit_parts() {
        assert_eq!(
            parse_flexible_datetime("2021/9/5 4:30:00"),
            Some(at(2021, 9, 5, 4, 30, 0))
        );
        assert_eq!(
            parse_flexible_datetime("2021/09/05 14:30:00"),
            Some(at(2021, 9, 5, 14, 30, 0))
        );
    }

    #[test]
    fn general_layouts_cover_common_exports() {
        let expected = at(2021, 9, 5, 14, 30, 0);
        assert_eq!(parse_flexible_datetime("2021-09-05 14:30:00"), Some(expected));
        assert_eq!(parse_flexible_datetime("2021-09-05T14:30:00"), Some(expected));
        assert_eq!(
            parse_flexible_datetime("2021年09月05日 14时30分00秒"),
            Some(expected)
        );
        assert_eq!(parse_flexible_datetime("20210905143000"), Some(expected));
        assert_eq!(
            parse_flexible_datetime("2021-09-05"),
            Some(at(2021, 9, 5, 0, 0, 0))
        );
        assert_eq!(
            parse_flexible_datetime("20210905"),
            Some(at(2021, 9, 5, 0, 0, 0))
        );
    }

    #[test]
    fn unparseable_dates_yield_none() {
        assert_eq!(parse_flexible_datetime("yesterday"), None);
        assert_eq!(parse_flexible_datetime("2021/13/45 10:00:00"), None);
        assert_eq!(parse_flexible_datetime(""), None);
    }

    #[test]
    fn numeric_parsers_reject_garbage_and_non_finite() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-7"), Some(-7));
        assert_eq!(parse_integer("4.2"), None);
        assert_eq!(parse_float("4.25"), Some(4.25));
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn to_json_maps_variants() {
        assert_eq!(CellValue::Empty.to_json(), serde_json::Value::Null);
        assert_eq!(CellValue::Integer(3).to_json(), serde_json::json!(3));
        assert_eq!(
            CellValue::DateTime(at(2024, 5, 6, 7, 8, 9)).to_json(),
            serde_json::json!("2024-05-06T07:08:09")
        );
    }
}
