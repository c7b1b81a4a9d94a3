//! Cell coercion: raw cell text into typed values.
//!
//! For every data row the [`RowCoercer`] walks the schema fields in declared
//! order and, per cell,
//!
//! 1. runs the caller's [`CellHook`] if one is configured,
//! 2. applies the built-in integer/float/date rules when the mode is
//!    [`CoercionMode::WithFormatValidation`] and the hook neither failed nor
//!    assigned the field,
//! 3. runs the caller's [`FormatHook`] on textual fields while the row is
//!    still free of violations.
//!
//! Replacement values are staged in a [`ScratchRow`] and merged once the
//! whole row has been visited.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    columns::ColumnMap,
    data::{CellValue, parse_flexible_datetime, parse_float, parse_integer},
    error::EngineError,
    hooks::{CellContext, CellHook, FormatHook, ScratchRow},
    schema::{FieldKind, RecordSchema},
    source::RawRow,
    violation::Violation,
};

pub const INTEGER_FORMAT_HINT: &str = "must be a whole number";
pub const DOUBLE_FORMAT_HINT: &str = "must be a decimal number";
pub const DATE_FORMAT_HINT: &str = "24-hour clock, e.g. 2021/9/5 14:30:00, 2021/09/05 14:30:00 or 2021年09月05日 14时30分00秒";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoercionMode {
    #[default]
    WithFormatValidation,
    WithoutFormatValidation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintLocale {
    #[default]
    En,
    ZhCn,
}

/// Expected-format hints quoted in coercion violation messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatHints {
    pub integer: String,
    pub float: String,
    pub date: String,
}

impl FormatHints {
    pub fn english() -> Self {
        Self {
            integer: INTEGER_FORMAT_HINT.to_string(),
            float: DOUBLE_FORMAT_HINT.to_string(),
            date: DATE_FORMAT_HINT.to_string(),
        }
    }

    pub fn zh_cn() -> Self {
        Self {
            integer: "必须填写整数".to_string(),
            float: "必须填写小数".to_string(),
            date: "正确示例（时间24小时制）示例一：2021/9/5 14:30:00 示例二：2021/09/05 14:30:00 示例三：2021年09月05日 14时30分00秒".to_string(),
        }
    }

    pub fn for_locale(locale: HintLocale) -> Self {
        match locale {
            HintLocale::En => Self::english(),
            HintLocale::ZhCn => Self::zh_cn(),
        }
    }
}

impl Default for FormatHints {
    fn default() -> Self {
        Self::english()
    }
}

/// `"<column> invalid, offending value: <raw>, expected format: <hint>"`,
/// prefixed with `"Row <n> "` when a row label is given.
pub fn violation_message(readable_row: Option<usize>, column: &str, raw: &str, hint: &str) -> String {
    let base = format!("{column} invalid, offending value: {raw}, expected format: {hint}");
    match readable_row {
        Some(row) => format!("Row {row} {base}"),
        None => base,
    }
}

pub fn missing_value_message(readable_row: Option<usize>, column: &str) -> String {
    match readable_row {
        Some(row) => format!("Row {row} {column} is missing"),
        None => format!("{column} is missing"),
    }
}

/// Outcome of applying one built-in rule to a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// The rule does not apply to this field or the cell is empty.
    Unchanged,
    Converted(CellValue),
    Rejected(Violation),
}

fn reject(ctx: &CellContext<'_>, hint: &str) -> Coerced {
    let message = violation_message(ctx.row_label(), ctx.column, ctx.raw, hint);
    Coerced::Rejected(Violation::new(ctx.field_name, ctx.raw, message))
}

pub fn coerce_integer(ctx: &CellContext<'_>) -> Coerced {
    if ctx.kind != FieldKind::Integer || ctx.value.is_empty() {
        return Coerced::Unchanged;
    }
    match ctx.value {
        CellValue::Integer(_) => Coerced::Unchanged,
        _ => match parse_integer(ctx.raw) {
            Some(parsed) => Coerced::Converted(CellValue::Integer(parsed)),
            None => reject(ctx, &ctx.hints.integer),
        },
    }
}

pub fn coerce_float(ctx: &CellContext<'_>) -> Coerced {
    if ctx.kind != FieldKind::Float || ctx.value.is_empty() {
        return Coerced::Unchanged;
    }
    match ctx.value {
        CellValue::Float(_) => Coerced::Unchanged,
        CellValue::Integer(i) => Coerced::Converted(CellValue::Float(*i as f64)),
        _ => match parse_float(ctx.raw) {
            Some(parsed) => Coerced::Converted(CellValue::Float(parsed)),
            None => reject(ctx, &ctx.hints.float),
        },
    }
}

pub fn coerce_date(ctx: &CellContext<'_>) -> Coerced {
    if ctx.kind != FieldKind::Date || ctx.value.is_empty() {
        return Coerced::Unchanged;
    }
    match ctx.value {
        CellValue::DateTime(_) => Coerced::Unchanged,
        _ => match parse_flexible_datetime(ctx.raw) {
            Some(parsed) => Coerced::Converted(CellValue::DateTime(parsed)),
            None => reject(ctx, &ctx.hints.date),
        },
    }
}

/// Applies the built-in rule matching the field's kind.
pub fn coerce_cell(ctx: &CellContext<'_>) -> Coerced {
    match ctx.kind {
        FieldKind::Integer => coerce_integer(ctx),
        FieldKind::Float => coerce_float(ctx),
        FieldKind::Date => coerce_date(ctx),
        FieldKind::Text | FieldKind::Other => Coerced::Unchanged,
    }
}

/// Drives coercion for one run; borrowed pieces of the run's options.
pub struct RowCoercer<'a> {
    pub schema: &'a RecordSchema,
    pub columns: &'a ColumnMap,
    pub mode: CoercionMode,
    pub join_row_number: bool,
    pub hints: &'a FormatHints,
    pub cell_hook: Option<&'a dyn CellHook>,
    pub format_hook: Option<&'a dyn FormatHook>,
}

impl RowCoercer<'_> {
    /// Coerces one data row in place and returns its violations in schema
    /// field order.
    pub fn coerce_row(
        &self,
        row: &mut RawRow,
        readable_row: usize,
    ) -> Result<Vec<Violation>, EngineError> {
        let mut scratch = ScratchRow::default();
        let mut row_violations = Vec::new();

        for spec in self.schema.fields() {
            let Some(value) = row.get(&spec.name) else {
                continue;
            };
            let raw = value.as_display();
            let ctx = CellContext {
                kind: spec.kind,
                field_name: &spec.name,
                column: self.columns.header_for(&spec.name),
                raw: &raw,
                value,
                readable_row,
                join_row_number: self.join_row_number,
                hints: self.hints,
            };

            let mut cell_violations = match self.cell_hook {
                Some(hook) => hook
                    .check(&ctx, &mut scratch)
                    .into_violations("cell hook")?,
                None => Vec::new(),
            };

            if cell_violations.is_empty()
                && self.mode == CoercionMode::WithFormatValidation
                && !scratch.contains(&spec.name)
            {
                match coerce_cell(&ctx) {
                    Coerced::Unchanged => {}
                    Coerced::Converted(converted) => scratch.assign(&spec.name, converted),
                    Coerced::Rejected(violation) => cell_violations.push(violation),
                }
            }
            row_violations.extend(cell_violations);

            if let Some(formatter) = self.format_hook
                && spec.kind.is_textual()
                && row_violations.is_empty()
            {
                let current = scratch.get(&spec.name).unwrap_or(value);
                if let CellValue::Text(text) = current {
                    let formatted = formatter.format(text);
                    if &formatted != text {
                        debug!(
                            "Row {readable_row} field '{}' formatted '{text}' -> '{formatted}'",
                            spec.name
                        );
                    }
                    scratch.assign(&spec.name, CellValue::Text(formatted));
                }
            }
        }

        row.merge(scratch);
        Ok(row_violations)
    }
}
