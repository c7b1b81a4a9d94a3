//! Caller-supplied extension points consulted during coercion.
//!
//! A [`CellHook`] sees every mapped cell before the built-in rules and may
//! pass it, fail it with violations, or stage a replacement value in the
//! row's [`ScratchRow`]. A [`FormatHook`] rewrites text destined for
//! textual fields. Closures implement both traits.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::{
    coerce::{Coerced, FormatHints, coerce_cell},
    data::CellValue,
    error::EngineError,
    schema::FieldKind,
    violation::Violation,
};

/// Everything a hook may want to know about the cell under inspection.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub kind: FieldKind,
    pub field_name: &'a str,
    /// Spreadsheet header the cell was read from.
    pub column: &'a str,
    /// Cell rendered as text; empty cells render as `""`.
    pub raw: &'a str,
    pub value: &'a CellValue,
    pub readable_row: usize,
    pub join_row_number: bool,
    pub hints: &'a FormatHints,
}

impl CellContext<'_> {
    /// Row label to embed in messages, if row numbers are joined.
    pub fn row_label(&self) -> Option<usize> {
        self.join_row_number.then_some(self.readable_row)
    }
}

/// Pass/fail answer of a hook or a cross-record validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(Vec<Violation>),
}

impl Verdict {
    pub fn fail(violation: Violation) -> Self {
        Verdict::Fail(vec![violation])
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Unwraps the violations, rejecting a failure that carries none or
    /// carries a violation without a message.
    pub fn into_violations(self, handler: &'static str) -> Result<Vec<Violation>, EngineError> {
        match self {
            Verdict::Pass => Ok(Vec::new()),
            Verdict::Fail(violations) if violations.is_empty() => Err(EngineError::contract(
                handler,
                "failure must carry at least one violation",
            )),
            Verdict::Fail(violations) => {
                if let Some(blank) = violations.iter().find(|v| !v.has_message()) {
                    return Err(EngineError::contract(
                        handler,
                        format!("violation for field '{}' has an empty message", blank.field_name),
                    ));
                }
                Ok(violations)
            }
        }
    }
}

/// Replacement values staged while a row is being visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScratchRow {
    entries: Vec<(String, CellValue)>,
}

impl ScratchRow {
    /// Stages `value` for `field`; a later assignment replaces an earlier one.
    pub fn assign(&mut self, field: &str, value: CellValue) {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((field.to_string(), value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, CellValue)> {
        self.entries
    }
}

pub trait CellHook {
    fn check(&self, cell: &CellContext<'_>, scratch: &mut ScratchRow) -> Verdict;
}

impl<F> CellHook for F
where
    F: Fn(&CellContext<'_>, &mut ScratchRow) -> Verdict,
{
    fn check(&self, cell: &CellContext<'_>, scratch: &mut ScratchRow) -> Verdict {
        self(cell, scratch)
    }
}

pub trait FormatHook {
    fn format(&self, raw: &str) -> String;
}

impl<F> FormatHook for F
where
    F: Fn(&str) -> String,
{
    fn format(&self, raw: &str) -> String {
        self(raw)
    }
}

/// Trims leading and trailing whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimFormatter;

impl FormatHook for TrimFormatter {
    fn format(&self, raw: &str) -> String {
        raw.trim().to_string()
    }
}

/// Trims whitespace (including full-width spaces) and strips embedded tabs
/// and line breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankCharacterFormatter;

fn blank_characters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\t\r\n]").expect("blank character pattern compiles"))
}

impl FormatHook for BlankCharacterFormatter {
    fn format(&self, raw: &str) -> String {
        let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{3000}');
        blank_characters().replace_all(trimmed, "").into_owned()
    }
}

/// The built-in integer/float/date rules packaged as a [`CellHook`], for
/// pipelines that run in
/// [`CoercionMode::WithoutFormatValidation`](crate::coerce::CoercionMode)
/// but still want the standard checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCoercionHook;

impl CellHook for StandardCoercionHook {
    fn check(&self, cell: &CellContext<'_>, scratch: &mut ScratchRow) -> Verdict {
        debug!(
            "Row {} standard coercion for field '{}'",
            cell.readable_row, cell.field_name
        );
        match coerce_cell(cell) {
            Coerced::Unchanged => Verdict::Pass,
            Coerced::Converted(value) => {
                scratch.assign(cell.field_name, value);
                Verdict::Pass
            }
            Coerced::Rejected(violation) => Verdict::fail(violation),
        }
    }
}
