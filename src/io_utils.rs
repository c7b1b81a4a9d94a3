//! I/O helpers for tabular inputs.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reader construction**: headerless, ragged-row tolerant CSV readers;
//!   the `-` path routes through stdin.
//! - **Suffix gate**: file-extension predicates applied before a file is
//!   handed to the engine.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const XLSX_SUFFIX: &str = "xlsx";
pub const XLS_SUFFIX: &str = "xls";

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Grid-style reader: no header handling and rows of any length.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> io::Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to decode text with encoding {}", encoding.name()),
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> io::Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Whether the file name ends in one of `suffixes` (given without the dot).
/// Paths without a file name never match.
pub fn has_extension(path: &Path, suffixes: &[&str]) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if name.trim().is_empty() {
        return false;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => suffixes.contains(&ext),
        None => false,
    }
}

pub fn is_xlsx(path: &Path) -> bool {
    has_extension(path, &[XLSX_SUFFIX])
}

pub fn is_xls(path: &Path) -> bool {
    has_extension(path, &[XLS_SUFFIX])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_gate_matches_exact_extension() {
        assert!(is_xlsx(Path::new("upload/report.xlsx")));
        assert!(!is_xls(Path::new("upload/report.xlsx")));
        assert!(is_xls(Path::new("legacy.xls")));
        assert!(!is_xlsx(Path::new("report.XLSX")));
        assert!(!is_xlsx(Path::new("xlsx")));
        assert!(!has_extension(Path::new(""), &["xlsx"]));
        assert!(has_extension(Path::new("data.csv"), &["csv", "tsv"]));
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn encoding_labels_resolve() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("gbk")).unwrap().name(),
            "GBK"
        );
        assert!(resolve_encoding(Some("not-an-encoding")).is_err());
    }
}
