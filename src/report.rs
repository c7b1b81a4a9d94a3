//! Human and machine renderings of a [`ValidationResult`].

use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    engine::ValidationResult,
    table,
    violation::{Violation, display_json},
};

pub fn violation_table(violations: &[Violation]) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = ["field", "value", "message"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = violations
        .iter()
        .map(|v| {
            vec![
                v.field_name.clone(),
                display_json(&v.invalid_value),
                v.message.clone(),
            ]
        })
        .collect();
    (headers, rows)
}

pub fn render_violations(violations: &[Violation]) -> String {
    let (headers, rows) = violation_table(violations);
    table::render_table(&headers, &rows)
}

/// One-line outcome for `source_name`.
pub fn summary<T>(result: &ValidationResult<T>, source_name: &str) -> String {
    if result.is_valid {
        match &result.data {
            Some(records) => format!("✓ {source_name} is valid: {} record(s)", records.len()),
            None => format!("✓ {source_name} is valid"),
        }
    } else {
        format!(
            "✗ {source_name} failed validation: {} violation(s)",
            result.violations.len()
        )
    }
}

pub fn to_json<T: Serialize>(result: &ValidationResult<T>) -> Result<String> {
    serde_json::to_string_pretty(result).context("Serializing validation result")
}

pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating records file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)
        .with_context(|| format!("Writing records to {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> ValidationResult<serde_json::Value> {
        ValidationResult {
            is_valid: false,
            data: None,
            violations: vec![Violation::new("age", "abc", "Row 3 age invalid")],
        }
    }

    #[test]
    fn violations_render_as_table() {
        let rendered = render_violations(&failed().violations);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "field  value  message");
        assert_eq!(lines[2], "age    abc    Row 3 age invalid");
    }

    #[test]
    fn summary_reflects_outcome() {
        assert_eq!(
            summary(&failed(), "people.csv"),
            "✗ people.csv failed validation: 1 violation(s)"
        );
        let ok = ValidationResult::<serde_json::Value> {
            is_valid: true,
            data: Some(vec![serde_json::json!({}), serde_json::json!({})]),
            violations: Vec::new(),
        };
        assert_eq!(summary(&ok, "people.csv"), "✓ people.csv is valid: 2 record(s)");
    }

    #[test]
    fn json_omits_missing_data() {
        let json = to_json(&failed()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["is_valid"], serde_json::json!(false));
        assert!(parsed.get("data").is_none());
        assert_eq!(parsed["violations"][0]["field_name"], serde_json::json!("age"));
    }
}
