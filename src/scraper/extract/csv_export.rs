use csv::{ReaderBuilder, Trim};

use super::{Extraction, ExtractionSource, ResultExtractor, MIN_COLUMNS};
use crate::scraper::PermitRecord;

/// Parses raw CSV published by export-style portals.
///
/// The first line is a header. Columns are positional like the table path;
/// blank, malformed and short lines are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExportExtractor;

impl CsvExportExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ResultExtractor for CsvExportExtractor {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extract(&self, payload: &str) -> Extraction {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(payload.as_bytes());

        let records = reader
            .records()
            .filter_map(Result::ok)
            .filter(|row| row.len() >= MIN_COLUMNS)
            .map(|row| {
                let column = |index: usize| row.get(index).unwrap_or_default().to_string();
                PermitRecord {
                    permit_number: column(0),
                    issue_date: column(1),
                    address: column(2),
                    work_type: column(3),
                    contractor: column(4),
                    valuation: column(5),
                }
            })
            .collect();

        Extraction {
            records,
            source: ExtractionSource::CsvExport,
        }
    }
}
