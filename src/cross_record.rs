//! Batch-level checks over every bound record of a run.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    bind::DynamicRecord,
    hooks::Verdict,
    schema::BindingFile,
    violation::{Violation, display_json},
};

pub trait CrossRecordValidator<T> {
    fn validate(&self, records: &[T]) -> Verdict;
}

impl<T, F> CrossRecordValidator<T> for F
where
    F: Fn(&[T]) -> Verdict,
{
    fn validate(&self, records: &[T]) -> Verdict {
        self(records)
    }
}

/// Rejects repeated values of the listed fields across the batch. Absent and
/// null values are not compared.
#[derive(Debug, Clone, Default)]
pub struct UniqueFields {
    /// `(field, column label)` pairs.
    fields: Vec<(String, String)>,
}

impl UniqueFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push((name.into(), column.into()));
        self
    }

    /// `None` when the binding declares no unique fields.
    pub fn from_binding(binding: &BindingFile) -> Option<Self> {
        let fields = binding
            .unique
            .iter()
            .filter_map(|name| {
                binding
                    .fields
                    .iter()
                    .find(|field| &field.name == name)
                    .map(|field| (field.name.clone(), field.column_name().to_string()))
            })
            .collect::<Vec<_>>();
        (!fields.is_empty()).then_some(Self { fields })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl CrossRecordValidator<DynamicRecord> for UniqueFields {
    fn validate(&self, records: &[DynamicRecord]) -> Verdict {
        let mut violations = Vec::new();
        for (field, column) in &self.fields {
            let mut first_seen: HashMap<String, usize> = HashMap::new();
            for (position, value) in field_values(records, field) {
                let key = value.to_string();
                match first_seen.get(&key) {
                    Some(first) => violations.push(Violation::new(
                        field.clone(),
                        value.clone(),
                        format!(
                            "{column} value {} in record {} repeats record {}",
                            display_json(value),
                            position + 1,
                            first + 1
                        ),
                    )),
                    None => {
                        first_seen.insert(key, position);
                    }
                }
            }
        }
        if violations.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(violations)
        }
    }
}

/// Non-null values of one field, paired with the position of their record in
/// the batch.
pub fn field_values<'a>(
    records: &'a [DynamicRecord],
    field: &'a str,
) -> impl Iterator<Item = (usize, &'a Value)> {
    records
        .iter()
        .enumerate()
        .filter_map(move |(position, record)| {
            record
                .get(field)
                .filter(|value| !value.is_null())
                .map(|value| (position, value))
        })
}
