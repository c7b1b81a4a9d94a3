//! The validation pipeline: read, coerce, bind, check records, check the
//! batch.
//!
//! Each [`Stage`] is a gate. Violations recorded in one stage keep the run
//! from entering the next, and a failed coercion stage never exposes bound
//! records.

use std::fmt;

use log::{debug, error, info};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    bind::{DynamicRecord, bind_row},
    coerce::{CoercionMode, FormatHints, RowCoercer},
    columns::ColumnMap,
    constraints::ConstraintEvaluator,
    cross_record::{CrossRecordValidator, UniqueFields},
    error::EngineError,
    hooks::{BlankCharacterFormatter, CellHook, FormatHook, TrimFormatter},
    schema::{BindingFile, FormatterChoice, RecordSchema},
    source::RowSource,
    violation::{Violation, ViolationSet, render_log},
};

/// Field name of the violation reported when the input cannot be read.
pub const INPUT_FIELD: &str = "input";

/// Settings of one run. Built once and never changed while the run is in
/// progress.
pub struct ValidationOptions<T> {
    pub header_row_index: usize,
    pub start_row_index: usize,
    /// Inclusive; `None` reads to the end of the input.
    pub end_row_index: Option<usize>,
    pub return_bound_records: bool,
    pub join_readable_row_number: bool,
    pub mode: CoercionMode,
    pub format_hints: FormatHints,
    pub cell_hook: Option<Box<dyn CellHook>>,
    pub format_hook: Option<Box<dyn FormatHook>>,
    pub cross_record: Option<Box<dyn CrossRecordValidator<T>>>,
    pub groups: Option<Vec<String>>,
}

impl<T> Default for ValidationOptions<T> {
    fn default() -> Self {
        Self {
            header_row_index: 0,
            start_row_index: 1,
            end_row_index: None,
            return_bound_records: true,
            join_readable_row_number: true,
            mode: CoercionMode::default(),
            format_hints: FormatHints::default(),
            cell_hook: None,
            format_hook: None,
            cross_record: None,
            groups: None,
        }
    }
}

impl<T> ValidationOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_row(mut self, index: usize) -> Self {
        self.header_row_index = index;
        self
    }

    pub fn start_row(mut self, index: usize) -> Self {
        self.start_row_index = index;
        self
    }

    pub fn end_row(mut self, index: Option<usize>) -> Self {
        self.end_row_index = index;
        self
    }

    pub fn return_bound_records(mut self, enabled: bool) -> Self {
        self.return_bound_records = enabled;
        self
    }

    pub fn join_readable_row_number(mut self, enabled: bool) -> Self {
        self.join_readable_row_number = enabled;
        self
    }

    pub fn mode(mut self, mode: CoercionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn format_hints(mut self, hints: FormatHints) -> Self {
        self.format_hints = hints;
        self
    }

    pub fn cell_hook(mut self, hook: impl CellHook + 'static) -> Self {
        self.cell_hook = Some(Box::new(hook));
        self
    }

    pub fn format_hook(mut self, hook: impl FormatHook + 'static) -> Self {
        self.format_hook = Some(Box::new(hook));
        self
    }

    pub fn cross_record(mut self, validator: impl CrossRecordValidator<T> + 'static) -> Self {
        self.cross_record = Some(Box::new(validator));
        self
    }

    pub fn groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }
}

impl ValidationOptions<DynamicRecord> {
    /// Reading options, formatter, hints, groups and unique-field checks
    /// declared in a binding file.
    pub fn from_binding(binding: &BindingFile) -> Self {
        let mut options = ValidationOptions::new()
            .header_row(binding.header_row)
            .start_row(binding.start_row)
            .end_row(binding.end_row)
            .join_readable_row_number(binding.row_numbers)
            .mode(binding.coercion)
            .format_hints(FormatHints::for_locale(binding.hints));
        options = match binding.formatter {
            FormatterChoice::None => options,
            FormatterChoice::Trim => options.format_hook(TrimFormatter),
            FormatterChoice::TrimBlank => options.format_hook(BlankCharacterFormatter),
        };
        if let Some(groups) = &binding.groups {
            options = options.groups(groups.iter().cloned());
        }
        if let Some(unique) = UniqueFields::from_binding(binding) {
            options = options.cross_record(unique);
        }
        options
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult<T> {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<T>>,
    pub violations: Vec<Violation>,
}

impl<T> ValidationResult<T> {
    fn finish(violations: ViolationSet, data: Option<Vec<T>>) -> Self {
        let violations = violations.into_vec();
        Self {
            is_valid: violations.is_empty(),
            data,
            violations,
        }
    }

    fn unreadable(source_name: &str, err: &EngineError) -> Self {
        Self {
            is_valid: false,
            data: None,
            violations: vec![Violation::new(INPUT_FIELD, source_name, err.to_string())],
        }
    }

    /// One `field=…, value=…, message=…` line per violation.
    pub fn log_message(&self) -> String {
        render_log(&self.violations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Coercing,
    SchemaChecking,
    CrossValidating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Coercing => "coercion",
            Stage::SchemaChecking => "schema check",
            Stage::CrossValidating => "cross-record check",
        };
        f.write_str(label)
    }
}

/// `true` when the run may continue past `stage`.
fn gate(stage: Stage, violations: &ViolationSet) -> bool {
    if violations.is_empty() {
        debug!("{stage} passed");
        true
    } else {
        info!("Stopping after {stage}: {} violation(s)", violations.len());
        false
    }
}

/// Runs the whole pipeline over `source`.
///
/// Bad cell values and failed checks come back as violations in the result.
/// Only an ambiguous column map, a schema that does not cover it, or a hook
/// or validator breaking its contract produce an `Err`. An unreadable input
/// yields a failed result with a single [`INPUT_FIELD`] violation.
pub fn validate<T, S>(
    source: &mut S,
    columns: &ColumnMap,
    schema: &RecordSchema,
    evaluator: &dyn ConstraintEvaluator<T>,
    options: &ValidationOptions<T>,
) -> Result<ValidationResult<T>, EngineError>
where
    T: DeserializeOwned + Serialize + Default,
    S: RowSource + ?Sized,
{
    schema.ensure_covers(columns)?;

    let source_name = source.describe();
    let mut rows = match source.read_rows(
        options.header_row_index,
        options.start_row_index,
        options.end_row_index,
        columns,
    ) {
        Ok(rows) => rows,
        Err(err) if err.is_io() => {
            error!("Validation of {source_name} aborted: {err}");
            return Ok(ValidationResult::unreadable(&source_name, &err));
        }
        Err(err) => return Err(err),
    };
    info!("Validating {} row(s) from {source_name}", rows.len());

    let coercer = RowCoercer {
        schema,
        columns,
        mode: options.mode,
        join_row_number: options.join_readable_row_number,
        hints: &options.format_hints,
        cell_hook: options.cell_hook.as_deref(),
        format_hook: options.format_hook.as_deref(),
    };

    let mut violations = ViolationSet::new();
    let mut labels = Vec::with_capacity(rows.len());
    let mut readable_row = options.start_row_index + 1;
    for row in rows.iter_mut().filter(|row| !row.is_header) {
        let row_violations = coercer.coerce_row(row, readable_row)?;
        if !row_violations.is_empty() {
            debug!("Row {readable_row}: {} coercion violation(s)", row_violations.len());
        }
        violations.extend(row_violations);
        labels.push(readable_row);
        readable_row += 1;
    }
    if !gate(Stage::Coercing, &violations) {
        return Ok(ValidationResult::finish(violations, None));
    }

    let records = rows
        .iter()
        .filter(|row| !row.is_header)
        .map(|row| bind_row::<T>(row, schema))
        .collect::<Vec<_>>();

    let groups = options.groups.as_deref();
    for (record, label) in records.iter().zip(&labels) {
        for mut violation in evaluator.evaluate(record, groups) {
            if !violation.has_message() {
                return Err(EngineError::contract(
                    "constraint evaluator",
                    format!("violation for field '{}' has an empty message", violation.field_name),
                ));
            }
            if options.join_readable_row_number {
                violation.prefix_row(*label);
            }
            violations.push(violation);
        }
    }

    if gate(Stage::SchemaChecking, &violations)
        && let Some(validator) = &options.cross_record
    {
        violations.extend(
            validator
                .validate(&records)
                .into_violations("cross-record validator")?,
        );
        gate(Stage::CrossValidating, &violations);
    }

    let data = options.return_bound_records.then_some(records);
    let result = ValidationResult::finish(violations, data);
    info!(
        "Validation of {source_name} finished: {} violation(s)",
        result.violations.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraints::NoConstraints, source::GridSource};

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Coercing.to_string(), "coercion");
        assert_eq!(Stage::CrossValidating.to_string(), "cross-record check");
    }

    #[test]
    fn schema_must_cover_column_map() {
        let columns = ColumnMap::new([("Age", "age")]).unwrap();
        let schema = RecordSchema::builder().text("name").build().unwrap();
        let mut source = GridSource::from_rows([vec!["Age"], vec!["1"]]);
        let err = validate::<DynamicRecord, _>(
            &mut source,
            &columns,
            &schema,
            &NoConstraints,
            &ValidationOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Schema(_)));
    }

    #[test]
    fn binding_file_drives_options() {
        let binding = BindingFile::from_yaml_str(
            r#"
header_row: 2
start_row: 3
row_numbers: false
coercion: without-format-validation
formatter: trim
groups: [strict]
unique: [code]
fields:
  - name: code
    kind: text
"#,
        )
        .unwrap();
        let options = ValidationOptions::from_binding(&binding);
        assert_eq!(options.header_row_index, 2);
        assert_eq!(options.start_row_index, 3);
        assert!(!options.join_readable_row_number);
        assert_eq!(options.mode, CoercionMode::WithoutFormatValidation);
        assert!(options.format_hook.is_some());
        assert!(options.cross_record.is_some());
        assert_eq!(options.groups, Some(vec!["strict".to_string()]));
    }
}
