use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::{
    bind::DynamicRecord,
    cli::{InputArgs, VerifyArgs},
    coerce::CoercionMode,
    constraints::RuleSet,
    engine::{self, ValidationOptions},
    io_utils, report,
    schema::BindingFile,
    source::CsvSource,
};

pub fn execute(args: &VerifyArgs) -> Result<()> {
    let mut binding = BindingFile::load(&args.binding)?;
    apply_overrides(&mut binding, args);

    let schema = binding
        .record_schema()
        .with_context(|| format!("Building record schema from {:?}", args.binding))?;
    let columns = binding
        .column_map()
        .with_context(|| format!("Building column map from {:?}", args.binding))?;
    let rules = RuleSet::from_binding(&binding)
        .with_context(|| format!("Compiling constraints from {:?}", args.binding))?;
    let options = ValidationOptions::<DynamicRecord>::from_binding(&binding)
        .return_bound_records(args.records.is_some() || args.json);

    let mut source = open_source(&args.source)?;
    let source_name = args.source.input.display().to_string();
    info!(
        "Verifying {source_name} against {:?} ({} field(s))",
        args.binding,
        schema.len()
    );
    let result = engine::validate(&mut source, &columns, &schema, &rules, &options)
        .with_context(|| format!("Validating {source_name}"))?;

    if args.json {
        println!("{}", report::to_json(&result)?);
    } else {
        if !result.violations.is_empty() {
            print!("{}", report::render_violations(&result.violations));
        }
        println!("{}", report::summary(&result, &source_name));
    }

    if let Some(path) = &args.records {
        match &result.data {
            Some(records) if result.is_valid => {
                report::write_records(path, records)?;
                info!("Wrote {} record(s) to {path:?}", records.len());
            }
            _ => warn!("Skipping records file {path:?}: validation failed"),
        }
    }

    if !result.is_valid {
        bail!(
            "{} violation(s) found in {source_name}",
            result.violations.len()
        );
    }
    Ok(())
}

pub(crate) fn open_source(args: &InputArgs) -> Result<CsvSource> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    Ok(CsvSource::new(&args.input)
        .with_delimiter(delimiter)
        .with_encoding(encoding))
}

fn apply_overrides(binding: &mut BindingFile, args: &VerifyArgs) {
    if let Some(header_row) = args.header_row {
        binding.header_row = header_row;
    }
    if let Some(start_row) = args.start_row {
        binding.start_row = start_row;
    }
    if args.end_row.is_some() {
        binding.end_row = args.end_row;
    }
    if args.no_row_numbers {
        binding.row_numbers = false;
    }
    if args.without_format_validation {
        binding.coercion = CoercionMode::WithoutFormatValidation;
    }
}
