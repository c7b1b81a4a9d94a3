use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Validate tabular files against a field binding",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Coerce, bind and check every row of a file against a binding file
    Verify(VerifyArgs),
    /// Preview the first rows of a file in a formatted table
    Preview(PreviewArgs),
    /// Check that a header row carries exactly the columns of a binding file
    Headers(HeadersArgs),
}

/// Options shared by every command that reads a tabular file.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file (`-` reads from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// YAML binding file declaring fields, columns and constraints
    #[arg(short, long)]
    pub binding: PathBuf,
    /// Zero-based index of the header row (overrides the binding file)
    #[arg(long = "header-row")]
    pub header_row: Option<usize>,
    /// Zero-based index of the first row to read (overrides the binding file)
    #[arg(long = "start-row")]
    pub start_row: Option<usize>,
    /// Zero-based index of the last row to read, inclusive
    #[arg(long = "end-row")]
    pub end_row: Option<usize>,
    /// Leave "Row <n>" labels out of violation messages
    #[arg(long = "no-row-numbers")]
    pub no_row_numbers: bool,
    /// Skip the built-in integer, decimal and date checks
    #[arg(long = "without-format-validation")]
    pub without_format_validation: bool,
    /// Write the bound records as JSON to this path
    #[arg(long = "records")]
    pub records: Option<PathBuf>,
    /// Print the full result as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of rows to display, the first row included
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct HeadersArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// YAML binding file whose columns are expected
    #[arg(short, long)]
    pub binding: PathBuf,
    /// Zero-based index of the header row (overrides the binding file)
    #[arg(long = "header-row")]
    pub header_row: Option<usize>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("、").is_err());
    }

    #[test]
    fn verify_flags_parse() {
        let cli = Cli::try_parse_from([
            "sheet-validate",
            "verify",
            "-i",
            "people.csv",
            "-b",
            "people.yaml",
            "--start-row",
            "2",
            "--no-row-numbers",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.source.input, PathBuf::from("people.csv"));
                assert_eq!(args.start_row, Some(2));
                assert!(args.no_row_numbers);
                assert!(args.json);
                assert!(!args.without_format_validation);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
