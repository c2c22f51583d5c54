use crate::engine::executor::{Cell, ResultSet};
use crate::Error;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the header and every row as CSV. NULLs become empty fields.
///
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(results: &ResultSet, writer: W) -> Result<usize, Error> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    csv_writer.write_record(&results.columns)?;

    for row in &results.rows {
        csv_writer.write_record(row.iter().map(csv_field))?;
    }

    csv_writer.flush()?;

    Ok(results.rows.len())
}

pub fn export_csv(results: &ResultSet, path: &Path) -> Result<usize, Error> {
    let file = File::create(path)?;
    let written = write_csv(results, BufWriter::new(file))?;

    info!("exported {written} rows to {}", path.display());

    Ok(written)
}

fn csv_field(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        other => other.to_string(),
    }
}
