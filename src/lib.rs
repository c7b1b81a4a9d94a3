//! Tabular data validation and binding.
//!
//! A run reads rows from a [`RowSource`](source::RowSource), resolves column
//! aliases, coerces cells to the types a [`RecordSchema`](schema::RecordSchema)
//! declares, binds each row into a record, and checks the records one by one
//! and as a batch. Everything that fails is reported as a
//! [`Violation`](violation::Violation) in the
//! [`ValidationResult`](engine::ValidationResult).

pub mod bind;
pub mod cli;
pub mod coerce;
pub mod columns;
pub mod constraints;
pub mod cross_record;
pub mod data;
pub mod engine;
pub mod error;
mod headers;
pub mod hooks;
pub mod io_utils;
mod preview;
pub mod report;
pub mod schema;
pub mod source;
pub mod table;
mod verify;
pub mod violation;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    bind::DynamicRecord,
    columns::ColumnMap,
    constraints::{ConstraintEvaluator, NoConstraints, RuleSet},
    cross_record::CrossRecordValidator,
    engine::{ValidationOptions, ValidationResult, validate},
    error::EngineError,
    hooks::{CellHook, FormatHook, Verdict},
    schema::{FieldKind, RecordSchema},
    source::{CsvSource, GridSource, RowSource},
    violation::Violation,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_validate", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Verify(args) => verify::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Headers(args) => headers::execute(&args),
    }
}
