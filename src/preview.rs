use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, data::CellValue, source::RowSource, table, verify};

/// Spreadsheet-style column label: A..Z, AA, AB, ...
fn column_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let mut source = verify::open_source(&args.source)?;
    let grid = source
        .grid()
        .with_context(|| format!("Reading {:?}", args.source.input))?;
    let shown = &grid[..grid.len().min(args.rows)];
    let width = shown.iter().map(Vec::len).max().unwrap_or(0);

    let headers = std::iter::once("row".to_string())
        .chain((0..width).map(column_label))
        .collect::<Vec<_>>();
    let rows = shown
        .iter()
        .enumerate()
        .map(|(index, cells)| {
            std::iter::once(index.to_string())
                .chain(cells.iter().map(CellValue::as_display))
                .collect()
        })
        .collect::<Vec<Vec<String>>>();

    table::print_table(&headers, &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), args.source.input);
    Ok(())
}
