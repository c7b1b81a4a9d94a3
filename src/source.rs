//! Row sources: tabular inputs exposed as a grid of cells and assembled into
//! field-keyed [`RawRow`]s.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

use crate::{
    columns::ColumnMap,
    data::CellValue,
    error::EngineError,
    hooks::ScratchRow,
    io_utils,
};

/// One row of the input, keyed by field name after alias resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub index: usize,
    pub is_header: bool,
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new(index: usize, is_header: bool, cells: Vec<(String, CellValue)>) -> Self {
        Self {
            index,
            is_header,
            cells,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Replaces the value under `key`, appending it when absent.
    pub fn set(&mut self, key: &str, value: CellValue) {
        match self.cells.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((key.to_string(), value)),
        }
    }

    pub fn merge(&mut self, scratch: ScratchRow) {
        for (key, value) in scratch.into_entries() {
            self.set(&key, value);
        }
    }

    pub fn cells(&self) -> &[(String, CellValue)] {
        &self.cells
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.iter().map(|(_, value)| value)
    }
}

/// A tabular input.
///
/// Implementors provide [`grid`](RowSource::grid); row lookup and
/// header-keyed assembly come for free.
pub trait RowSource {
    /// Human-readable name used in logs and I/O violations.
    fn describe(&self) -> String;

    /// Every row of the input, blank cells as [`CellValue::Empty`].
    fn grid(&mut self) -> Result<Vec<Vec<CellValue>>, EngineError>;

    /// Cells of one row; rows past the end of the input are empty.
    fn read_row(&mut self, index: usize) -> Result<Vec<CellValue>, EngineError> {
        Ok(self.grid()?.into_iter().nth(index).unwrap_or_default())
    }

    /// Rows `start_row..=end_row` keyed by the field names derived from the
    /// header row. The header row is included, flagged, when it falls in the
    /// range.
    fn read_rows(
        &mut self,
        header_row: usize,
        start_row: usize,
        end_row: Option<usize>,
        columns: &ColumnMap,
    ) -> Result<Vec<RawRow>, EngineError> {
        let grid = self.grid()?;
        assemble_rows(
            &self.describe(),
            grid,
            header_row,
            start_row,
            end_row,
            columns,
        )
    }
}

/// Column position and field key for every keyed header cell. Blank and
/// repeated titles are not keyed; two titles resolving to the same field are
/// ambiguous.
fn header_keys(
    name: &str,
    headers: &[String],
    columns: &ColumnMap,
) -> Result<Vec<(usize, String)>, EngineError> {
    let mut seen = HashSet::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut keys = Vec::new();
    for (position, header) in headers.iter().enumerate() {
        if header.trim().is_empty() {
            continue;
        }
        if !seen.insert(header.as_str()) {
            warn!("{name}: header '{header}' repeats at column {}; ignoring it", position + 1);
            continue;
        }
        let key = columns.field_for(header);
        if let Some(owner) = owners.insert(key, header) {
            return Err(EngineError::schema(format!(
                "{name}: columns '{owner}' and '{header}' both resolve to field '{key}'"
            )));
        }
        keys.push((position, key.to_string()));
    }
    Ok(keys)
}

fn assemble_rows(
    name: &str,
    grid: Vec<Vec<CellValue>>,
    header_row: usize,
    start_row: usize,
    end_row: Option<usize>,
    columns: &ColumnMap,
) -> Result<Vec<RawRow>, EngineError> {
    let headers = match grid.get(header_row) {
        Some(cells) => cells.iter().map(CellValue::as_display).collect::<Vec<_>>(),
        None => {
            warn!("{name}: header row {header_row} is beyond the end of the input");
            Vec::new()
        }
    };
    let keys = header_keys(name, &headers, columns)?;

    let last = end_row.unwrap_or(usize::MAX);
    let mut skipped = 0usize;
    let rows = grid
        .into_iter()
        .enumerate()
        .skip(start_row)
        .take_while(|(index, _)| *index <= last)
        .filter(|(index, cells)| {
            // Fully blank lines carry no record.
            let blank = *index != header_row && cells.iter().all(CellValue::is_empty);
            skipped += usize::from(blank);
            !blank
        })
        .map(|(index, mut cells)| {
            let cells = keys
                .iter()
                .map(|(position, key)| {
                    let value = cells
                        .get_mut(*position)
                        .map(std::mem::take)
                        .unwrap_or_default();
                    (key.clone(), value)
                })
                .collect();
            RawRow::new(index, index == header_row, cells)
        })
        .collect::<Vec<_>>();
    debug!(
        "{name}: assembled {} row(s) from row {start_row}, {skipped} blank row(s) skipped",
        rows.len()
    );
    Ok(rows)
}

/// In-memory grid of text cells.
#[derive(Debug, Clone, Default)]
pub struct GridSource {
    name: String,
    rows: Vec<Vec<String>>,
}

impl GridSource {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            name: "in-memory grid".to_string(),
            rows,
        }
    }

    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl RowSource for GridSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn grid(&mut self) -> Result<Vec<Vec<CellValue>>, EngineError> {
        Ok(self
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| CellValue::from_raw(cell)).collect())
            .collect())
    }

    fn read_row(&mut self, index: usize) -> Result<Vec<CellValue>, EngineError> {
        Ok(self
            .rows
            .get(index)
            .map(|row| row.iter().map(|cell| CellValue::from_raw(cell)).collect())
            .unwrap_or_default())
    }
}

/// Delimited text file, or stdin when the path is `-`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let delimiter = io_utils::resolve_input_delimiter(&path, None);
        Self {
            path,
            delimiter,
            encoding: UTF_8,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Streams records until `visit` returns `false`. The input handle lives
    /// only for the duration of the call.
    fn scan<F>(&self, mut visit: F) -> Result<(), EngineError>
    where
        F: FnMut(usize, Vec<CellValue>) -> bool,
    {
        let name = self.describe();
        let input = io_utils::open_input(&self.path).map_err(|err| EngineError::io(&name, err))?;
        let mut reader = io_utils::open_csv_reader(input, self.delimiter);
        let mut record = csv::ByteRecord::new();
        let mut index = 0usize;
        while reader.read_byte_record(&mut record)? {
            let cells = io_utils::decode_record(&record, self.encoding)
                .map_err(|err| EngineError::io(&name, err))?
                .iter()
                .map(|cell| CellValue::from_raw(cell))
                .collect();
            if !visit(index, cells) {
                break;
            }
            index += 1;
        }
        Ok(())
    }
}

impl RowSource for CsvSource {
    fn describe(&self) -> String {
        if io_utils::is_dash(&self.path) {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }

    fn grid(&mut self) -> Result<Vec<Vec<CellValue>>, EngineError> {
        let mut rows = Vec::new();
        self.scan(|_, cells| {
            rows.push(cells);
            true
        })?;
        Ok(rows)
    }

    fn read_row(&mut self, index: usize) -> Result<Vec<CellValue>, EngineError> {
        let mut found = Vec::new();
        self.scan(|current, cells| {
            if current == index {
                found = cells;
                false
            } else {
                true
            }
        })?;
        Ok(found)
    }
}

/// Header title check: the text cells of `actual` and the `expected` titles
/// must form the same set. Order and non-text cells are ignored; an empty
/// header row never matches.
pub fn headers_match(actual: &[CellValue], expected: &[String]) -> bool {
    if actual.is_empty() {
        return false;
    }
    let reference = expected.iter().map(String::as_str).collect::<HashSet<_>>();
    let titles = actual
        .iter()
        .filter_map(CellValue::as_text)
        .collect::<HashSet<_>>();
    titles.len() == reference.len() && titles.union(&reference).count() == reference.len()
}

/// Reads `header_row` from `source` and compares it with `expected`. Read
/// failures count as a mismatch.
pub fn check_headers<S>(source: &mut S, header_row: usize, expected: &[String]) -> bool
where
    S: RowSource + ?Sized,
{
    match source.read_row(header_row) {
        Ok(cells) => headers_match(&cells, expected),
        Err(err) => {
            log::error!("Reading header row {header_row} of {}: {err}", source.describe());
            false
        }
    }
}
