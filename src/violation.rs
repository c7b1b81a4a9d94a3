//! Violations and their ordered, de-duplicated aggregation.

use std::collections::HashSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::data::platform_line_break;

/// Extra provenance attached to violations raised against a bound record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordContext {
    pub record: serde_json::Value,
    pub record_type: String,
    pub path: String,
}

/// One failed check.
///
/// `field_name` is a record field name for violations raised after column
/// aliases are resolved. Caller-supplied hooks may still report a column
/// header here; both shapes are carried unchanged. `context` is only set for
/// violations produced by a [`ConstraintEvaluator`](crate::constraints::ConstraintEvaluator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub field_name: String,
    pub invalid_value: serde_json::Value,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RecordContext>,
}

impl Violation {
    pub fn new(
        field_name: impl Into<String>,
        invalid_value: impl Into<serde_json::Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            invalid_value: invalid_value.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: RecordContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn has_message(&self) -> bool {
        !self.message.trim().is_empty()
    }

    pub fn prefix_row(&mut self, readable_row: usize) {
        self.message = format!("Row {readable_row} {}", self.message);
    }

    pub fn log_line(&self) -> String {
        format!(
            "field={}, value={}, message={}",
            self.field_name,
            display_json(&self.invalid_value),
            self.message
        )
    }

    fn identity(&self) -> ViolationKey {
        (
            self.field_name.clone(),
            self.invalid_value.to_string(),
            self.message.clone(),
            self.context
                .as_ref()
                .map(|context| (context.record.to_string(), context.path.clone())),
        )
    }
}

pub(crate) fn display_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Field, value, message and the offending record with its path.
type ViolationKey = (String, String, String, Option<(String, String)>);

/// Insertion-ordered violation collection that drops exact repeats: same
/// field, value and message raised against the same record.
#[derive(Debug, Clone, Default)]
pub struct ViolationSet {
    items: Vec<Violation>,
    seen: HashSet<ViolationKey>,
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when an identical violation was already recorded.
    pub fn push(&mut self, violation: Violation) -> bool {
        if self.seen.insert(violation.identity()) {
            self.items.push(violation);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.items
    }
}

impl Extend<Violation> for ViolationSet {
    fn extend<I: IntoIterator<Item = Violation>>(&mut self, iter: I) {
        for violation in iter {
            self.push(violation);
        }
    }
}

impl FromIterator<Violation> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        let mut set = ViolationSet::new();
        set.extend(iter);
        set
    }
}

/// One `field=…, value=…, message=…` line per violation, joined with the
/// platform line terminator.
pub fn render_log(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::log_line)
        .join(platform_line_break())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_first_occurrence_order() {
        let mut set = ViolationSet::new();
        assert!(set.push(Violation::new("b", "x", "second field")));
        assert!(set.push(Violation::new("a", "y", "first field")));
        assert!(!set.push(Violation::new("b", "x", "second field")));
        assert!(set.push(Violation::new("b", "x", "different message")));
        let fields = set
            .into_vec()
            .into_iter()
            .map(|v| v.field_name)
            .collect::<Vec<_>>();
        assert_eq!(fields, vec!["b", "a", "b"]);
    }

    #[test]
    fn same_rule_on_different_records_is_kept() {
        let against = |record: serde_json::Value| {
            Violation::new("name", serde_json::Value::Null, "Name is required").with_context(
                RecordContext {
                    record,
                    record_type: "Map".to_string(),
                    path: "name".to_string(),
                },
            )
        };
        let mut set = ViolationSet::new();
        assert!(set.push(against(serde_json::json!({"age": 30}))));
        assert!(set.push(against(serde_json::json!({"age": 40}))));
        assert!(!set.push(against(serde_json::json!({"age": 30}))));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn log_line_renders_plain_strings() {
        let violation = Violation::new("age", "abc", "age invalid");
        assert_eq!(violation.log_line(), "field=age, value=abc, message=age invalid");
        let numeric = Violation::new("age", 200, "too old");
        assert_eq!(numeric.log_line(), "field=age, value=200, message=too old");
    }

    #[test]
    fn render_log_joins_with_platform_break() {
        let violations = vec![Violation::new("a", 1, "m1"), Violation::new("b", 2, "m2")];
        let rendered = render_log(&violations);
        let expected = format!(
            "field=a, value=1, message=m1{}field=b, value=2, message=m2",
            platform_line_break()
        );
        assert_eq!(rendered, expected);
        assert_eq!(render_log(&[]), "");
    }

    #[test]
    fn prefix_row_prepends_label() {
        let mut violation = Violation::new("age", "abc", "age invalid");
        violation.prefix_row(3);
        assert_eq!(violation.message, "Row 3 age invalid");
        assert!(violation.has_message());
        assert!(!Violation::new("age", "", "  ").has_message());
    }
}
