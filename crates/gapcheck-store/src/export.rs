//! Parquet export of gap records.

use std::fs::File;
use std::path::Path;

use gapcheck_core::{GapRecord, gaps};
use parquet::arrow::ArrowWriter;
use tracing::info;

use crate::StoreError;

/// Write `records` as a single-row-group Parquet file, replacing any existing
/// file. Returns the number of rows written.
pub fn write_gaps_parquet(path: &Path, records: &[GapRecord]) -> Result<usize, StoreError> {
    let batch = gaps::gap_records_batch(records)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    info!(path = %path.display(), rows = batch.num_rows(), "wrote gap records");
    Ok(batch.num_rows())
}
