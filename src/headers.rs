use anyhow::{Result, bail};
use log::info;

use crate::{cli::HeadersArgs, schema::BindingFile, source::check_headers, verify};

pub fn execute(args: &HeadersArgs) -> Result<()> {
    let binding = BindingFile::load(&args.binding)?;
    let header_row = args.header_row.unwrap_or(binding.header_row);
    let expected = binding.expected_headers();
    let mut source = verify::open_source(&args.source)?;

    if check_headers(&mut source, header_row, &expected) {
        println!(
            "✓ header row {header_row} of {} matches {} column(s)",
            args.source.input.display(),
            expected.len()
        );
        info!("Headers of {:?} match {:?}", args.source.input, args.binding);
        Ok(())
    } else {
        bail!(
            "Header row {header_row} of {:?} does not match the expected columns: {}",
            args.source.input,
            expected.join(", ")
        )
    }
}
