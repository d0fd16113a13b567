use csv::WriterBuilder;
use std::path::Path;
use tracing::debug;

use crate::error::PermitResult;
use crate::scraper::{PermitField, PermitRecord};

/// Write a header row followed by one row per record, in column order.
/// Returns the file size in bytes.
pub async fn write_csv(path: &Path, columns: &[PermitField], records: &[PermitRecord]) -> PermitResult<u64> {
    debug!("Writing {} records to {}", records.len(), path.display());

    let file = std::fs::File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    writer.write_record(columns.iter().map(|column| column.as_str()))?;
    for record in records {
        writer.write_record(record.to_row(columns))?;
    }

    writer.flush()?;
    drop(writer);

    let file_size = tokio::fs::metadata(path).await?.len();
    Ok(file_size)
}
