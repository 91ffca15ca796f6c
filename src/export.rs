use crate::config::OutputConfig;
use crate::error::Result;
use crate::results::{COLUMNS, ProductRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// UTF-8 byte-order mark, so spreadsheet tools detect the encoding
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write the header and one row per record; returns the number of rows
///
/// The header is written even when there are no records.
pub fn write_records<W: Write>(
    mut out: W,
    records: &[ProductRecord],
    config: &OutputConfig,
) -> Result<usize> {
    if config.bom {
        out.write_all(UTF8_BOM)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter.as_byte())
        .has_headers(false)
        .from_writer(out);

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;

    Ok(records.len())
}

/// Create (or truncate) `path` and write the records into it
pub fn write_file(
    path: impl AsRef<Path>,
    records: &[ProductRecord],
    config: &OutputConfig,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let written = write_records(BufWriter::new(file), records, config)?;
    ::log::info!("Wrote {} record(s) to {}", written, path.display());
    Ok(written)
}
