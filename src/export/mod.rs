use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod csv_exporter;
pub mod sorting;

pub use sorting::SortKey;

use crate::error::{PermitError, PermitResult};
use crate::scraper::{PermitField, PermitRecord};

/// Timestamp embedded in every output file name
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Files produced by one sink write
#[derive(Debug, Clone)]
pub struct SinkReport {
    pub primary: PathBuf,
    pub sorted: Vec<PathBuf>,
    pub record_count: usize,
    /// False when an unparseable issue date left extraction order in place
    pub date_sorted: bool,
    pub bytes_written: u64,
}

impl SinkReport {
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.primary).chain(self.sorted.iter())
    }
}

/// Persists permit records as timestamped CSV files
pub struct CsvSink {
    output_dir: PathBuf,
    columns: Vec<PermitField>,
}

impl CsvSink {
    /// Create the sink, making sure the output directory exists
    pub fn new(output_dir: impl Into<PathBuf>, columns: Vec<PermitField>) -> PermitResult<Self> {
        if columns.is_empty() {
            return Err(PermitError::config("CSV sink needs at least one column"));
        }

        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            PermitError::export(format!("Cannot create output directory {}: {}", output_dir.display(), e))
        })?;

        Ok(Self { output_dir, columns })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `{dir}/{slug}_permits_{timestamp}.csv`
    pub fn primary_path(&self, slug: &str, timestamp: NaiveDateTime) -> PathBuf {
        self.output_dir.join(format!("{}.csv", file_stem(slug, timestamp)))
    }

    /// `{dir}/{slug}_permits_{timestamp}_sorted_{key}.csv`
    pub fn sorted_path(&self, slug: &str, timestamp: NaiveDateTime, key: SortKey) -> PathBuf {
        self.output_dir
            .join(format!("{}_sorted_{}.csv", file_stem(slug, timestamp), key.suffix()))
    }

    /// Write the primary file and, when asked, one variant per sort key.
    ///
    /// Nothing is written for an empty record set. Records are only
    /// reordered, never altered.
    pub async fn write(
        &self,
        records: &[PermitRecord],
        slug: &str,
        timestamp: NaiveDateTime,
        also_sorted: bool,
    ) -> PermitResult<Option<SinkReport>> {
        if records.is_empty() {
            info!("No records for {}, skipping CSV output", slug);
            return Ok(None);
        }

        let mut primary = records.to_vec();
        let date_sorted = match sorting::sort_by_issue_date_desc(&mut primary) {
            Ok(()) => true,
            Err(bad_value) => {
                warn!(
                    "Could not sort {} by issue date (unparseable value {:?}), keeping extraction order",
                    slug, bad_value
                );
                false
            }
        };

        let primary_path = self.primary_path(slug, timestamp);
        let mut bytes_written = csv_exporter::write_csv(&primary_path, &self.columns, &primary).await?;
        info!("Wrote {} records to {}", primary.len(), primary_path.display());

        let mut sorted = Vec::new();
        if also_sorted {
            // Variants start from the primary order so equal keys stay newest first
            for key in SortKey::ALL {
                let mut variant = primary.clone();
                key.sort(&mut variant);

                let path = self.sorted_path(slug, timestamp, key);
                bytes_written += csv_exporter::write_csv(&path, &self.columns, &variant).await?;
                sorted.push(path);
            }
            info!("Wrote {} sorted variants for {}", sorted.len(), slug);
        }

        Ok(Some(SinkReport {
            primary: primary_path,
            sorted,
            record_count: records.len(),
            date_sorted,
            bytes_written,
        }))
    }
}

fn file_stem(slug: &str, timestamp: NaiveDateTime) -> String {
    format!("{}_permits_{}", slug, timestamp.format(TIMESTAMP_FORMAT))
}
