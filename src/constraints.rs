//! Per-record constraint evaluation.
//!
//! The engine only sees the [`ConstraintEvaluator`] trait. [`RuleSet`] is the
//! stock implementation: explicitly registered per-field checks, optionally
//! tagged with groups, buildable from a YAML [`BindingFile`].

use std::any;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::{
    bind::DynamicRecord,
    coerce::missing_value_message,
    error::EngineError,
    schema::{BindingFile, FieldBinding},
    violation::{RecordContext, Violation, display_json},
};

/// Checks one bound record. Implementations must be usable from several
/// validation runs at once.
pub trait ConstraintEvaluator<T>: Send + Sync {
    /// `groups` selects which constraints apply; `None` and `Some(&[])` are
    /// distinct requests.
    fn evaluate(&self, record: &T, groups: Option<&[String]>) -> Vec<Violation>;
}

impl<T, F> ConstraintEvaluator<T> for F
where
    F: Fn(&T, Option<&[String]>) -> Vec<Violation> + Send + Sync,
{
    fn evaluate(&self, record: &T, groups: Option<&[String]>) -> Vec<Violation> {
        self(record, groups)
    }
}

/// Accepts every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraints;

impl<T> ConstraintEvaluator<T> for NoConstraints {
    fn evaluate(&self, _record: &T, _groups: Option<&[String]>) -> Vec<Violation> {
        Vec::new()
    }
}

type Check<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

struct Rule<T> {
    field: String,
    groups: Vec<String>,
    check: Check<T>,
}

impl<T> Rule<T> {
    fn applies(&self, requested: Option<&[String]>) -> bool {
        match requested {
            None => true,
            Some([]) => self.groups.is_empty(),
            Some(wanted) => self.groups.iter().any(|group| wanted.contains(group)),
        }
    }
}

/// Ordered per-field checks. A check returns the violation message on
/// failure.
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> RuleSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule<F>(self, field: impl Into<String>, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.rule_in_groups(field, Vec::<String>::new(), check)
    }

    pub fn rule_in_groups<F, I, G>(mut self, field: impl Into<String>, groups: I, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        self.rules.push(Rule {
            field: field.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            check: Box::new(check),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn short_type_name<T>() -> String {
    let full = any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl<T: Serialize> ConstraintEvaluator<T> for RuleSet<T> {
    fn evaluate(&self, record: &T, groups: Option<&[String]>) -> Vec<Violation> {
        let mut snapshot: Option<Value> = None;
        let mut violations = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.applies(groups)) {
            let Err(message) = (rule.check)(record) else {
                continue;
            };
            let json = snapshot
                .get_or_insert_with(|| serde_json::to_value(record).unwrap_or(Value::Null));
            let invalid_value = json.get(&rule.field).cloned().unwrap_or(Value::Null);
            violations.push(
                Violation::new(rule.field.clone(), invalid_value, message).with_context(
                    RecordContext {
                        record: json.clone(),
                        record_type: short_type_name::<T>(),
                        path: rule.field.clone(),
                    },
                ),
            );
        }
        violations
    }
}

fn present(record: &DynamicRecord, field: &str) -> Option<Value> {
    match record.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(value) => Some(value.clone()),
    }
}

impl RuleSet<DynamicRecord> {
    /// Rules for every constraint declared in a binding file, in field order.
    pub fn from_binding(binding: &BindingFile) -> Result<Self, EngineError> {
        let mut rules = RuleSet::new();
        for field in &binding.fields {
            rules = rules.binding_rules(field)?;
        }
        Ok(rules)
    }

    fn binding_rules(mut self, field: &FieldBinding) -> Result<Self, EngineError> {
        let column = field.column_name().to_string();
        let name = field.name.clone();
        let custom = field.message.clone();
        let groups = field.groups.clone();

        // Wraps a value predicate; absent values pass every rule but `required`.
        let add = |this: Self, fallback: String, test: Box<dyn Fn(&Value) -> bool + Send + Sync>| {
            let name = name.clone();
            let message = custom.clone().unwrap_or(fallback);
            this.rule_in_groups(field.name.clone(), groups.clone(), move |record: &DynamicRecord| {
                match present(record, &name) {
                    Some(value) if !test(&value) => Err(message.clone()),
                    _ => Ok(()),
                }
            })
        };

        if field.required {
            let name = name.clone();
            let message = custom
                .clone()
                .unwrap_or_else(|| missing_value_message(None, &column));
            self = self.rule_in_groups(field.name.clone(), groups.clone(), move |record: &DynamicRecord| {
                match present(record, &name) {
                    Some(_) => Ok(()),
                    None => Err(message.clone()),
                }
            });
        }
        if let Some(min) = field.min {
            self = add(
                self,
                format!("{column} must be at least {min}"),
                Box::new(move |value: &Value| value.as_f64().is_none_or(|number| number >= min)),
            );
        }
        if let Some(max) = field.max {
            self = add(
                self,
                format!("{column} must be at most {max}"),
                Box::new(move |value: &Value| value.as_f64().is_none_or(|number| number <= max)),
            );
        }
        if let Some(min_length) = field.min_length {
            self = add(
                self,
                format!("{column} must have at least {min_length} characters"),
                Box::new(move |value: &Value| display_json(value).chars().count() >= min_length),
            );
        }
        if let Some(max_length) = field.max_length {
            self = add(
                self,
                format!("{column} must have at most {max_length} characters"),
                Box::new(move |value: &Value| display_json(value).chars().count() <= max_length),
            );
        }
        if let Some(pattern) = &field.pattern {
            let regex = Regex::new(pattern).map_err(|err| {
                EngineError::schema(format!("Pattern for field '{}': {err}", field.name))
            })?;
            self = add(
                self,
                format!("{column} does not match {pattern}"),
                Box::new(move |value: &Value| regex.is_match(&display_json(value))),
            );
        }
        if !field.one_of.is_empty() {
            let allowed = field.one_of.clone();
            self = add(
                self,
                format!("{column} must be one of: {}", allowed.join(", ")),
                Box::new(move |value: &Value| allowed.contains(&display_json(value))),
            );
        }
        Ok(self)
    }
}
