//! CSV files for both stages.
//!
//! Headers are written explicitly so an empty table still produces a
//! header-only file.

use super::EnrichedRecord;
use crate::client::PaperRecord;
use crate::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Serialize `rows` under `columns` to any writer
pub fn write_table<W, T>(writer: W, columns: &[&str], rows: &[T]) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(columns)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the stage-1 table to `path`
pub fn write_collection(path: &Path, records: &[PaperRecord]) -> Result<()> {
    write_table(File::create(path)?, &PaperRecord::COLUMNS, records)?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Write the stage-2 table to `path`
pub fn write_enriched(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    write_table(File::create(path)?, &EnrichedRecord::COLUMNS, records)?;
    info!("Wrote {} classified records to {}", records.len(), path.display());
    Ok(())
}

/// Parse a stage-1 table; rows that do not deserialize are skipped.
///
/// Records without an id get a generated one.
pub fn read_table<R: Read>(reader: R) -> Result<Vec<PaperRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut records = Vec::new();

    for (line, row) in csv_reader.deserialize::<PaperRecord>().enumerate() {
        match row {
            Ok(mut record) => {
                record.ensure_id(records.len());
                records.push(record);
            }
            Err(e) => warn!("Skipping unreadable row {}: {}", line + 2, e),
        }
    }
    Ok(records)
}

/// Read the stage-1 file at `path`
pub fn read_collection(path: &Path) -> Result<Vec<PaperRecord>> {
    let records = read_table(File::open(path)?)?;
    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}
