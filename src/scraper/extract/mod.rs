use std::fmt;

pub mod card;
pub mod csv_export;
pub mod table;

pub use card::CardExtractor;
pub use csv_export::CsvExportExtractor;
pub use table::TableExtractor;

use crate::config::{CountyConfig, ExtractorKind};
use crate::error::PermitResult;
use crate::scraper::PermitRecord;

/// Columns a row must carry before it becomes a record
pub const MIN_COLUMNS: usize = 4;

/// Which markup path produced a set of records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Table,
    CardFallback,
    CsvExport,
}

impl ExtractionSource {
    /// Card parsing guesses at field positions and is never authoritative
    pub fn is_degraded(&self) -> bool {
        matches!(self, ExtractionSource::CardFallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionSource::Table => "table",
            ExtractionSource::CardFallback => "card_fallback",
            ExtractionSource::CsvExport => "csv_export",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records plus the path that produced them
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<PermitRecord>,
    pub source: ExtractionSource,
}

/// Turns rendered markup or export text into permit records.
///
/// Missing data is never an error: rows that lack the minimum columns are
/// skipped and empty input yields no records.
pub trait ResultExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, payload: &str) -> Extraction;
}

/// Uses `primary`, switching to `fallback` only when it finds nothing
pub struct FallbackExtractor {
    primary: Box<dyn ResultExtractor>,
    fallback: Box<dyn ResultExtractor>,
}

impl FallbackExtractor {
    pub fn new(primary: Box<dyn ResultExtractor>, fallback: Box<dyn ResultExtractor>) -> Self {
        Self { primary, fallback }
    }
}

impl ResultExtractor for FallbackExtractor {
    fn name(&self) -> &'static str {
        "table_with_card_fallback"
    }

    fn extract(&self, payload: &str) -> Extraction {
        let primary = self.primary.extract(payload);
        if !primary.records.is_empty() {
            return primary;
        }

        let fallback = self.fallback.extract(payload);
        if fallback.records.is_empty() {
            // Report the authoritative path when both come up empty
            primary
        } else {
            fallback
        }
    }
}

/// Build the extractor a county's configuration asks for
pub fn extractor_for(county: &CountyConfig) -> PermitResult<Box<dyn ResultExtractor>> {
    let extractor: Box<dyn ResultExtractor> = match county.extractor_kind() {
        ExtractorKind::Table => Box::new(TableExtractor::new()?),
        ExtractorKind::Card => Box::new(CardExtractor::new(&county.card_class_pattern)?),
        ExtractorKind::TableWithCardFallback => Box::new(FallbackExtractor::new(
            Box::new(TableExtractor::new()?),
            Box::new(CardExtractor::new(&county.card_class_pattern)?),
        )),
        ExtractorKind::Csv => Box::new(CsvExportExtractor::new()),
    };
    Ok(extractor)
}

/// Concatenated, trimmed text content of an element
pub(crate) fn clean_text<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments.collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = r#"
        <html><body>
          <div class="permit-card">
            <span>2024-0042</span>
            <span>01/06/2024</span>
            <span>12 Broadway</span>
          </div>
        </body></html>
    "#;

    fn civic() -> FallbackExtractor {
        FallbackExtractor::new(
            Box::new(TableExtractor::new().unwrap()),
            Box::new(CardExtractor::new("permit|result|record").unwrap()),
        )
    }

    #[test]
    fn test_table_wins_when_it_has_rows() {
        let markup = r#"<table>
            <tr><th>No</th><th>Date</th><th>Address</th><th>Type</th></tr>
            <tr><td>T1</td><td>01/02/2024</td><td>5 Elm</td><td>Pool</td></tr>
        </table>
        <div class="result">X
        Y
        Z</div>"#;

        let extraction = civic().extract(markup);
        assert_eq!(extraction.source, ExtractionSource::Table);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].permit_number, "T1");
    }

    #[test]
    fn test_cards_used_when_no_table() {
        let extraction = civic().extract(CARDS);

        assert_eq!(extraction.source, ExtractionSource::CardFallback);
        assert!(extraction.source.is_degraded());
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].permit_number, "2024-0042");
        assert_eq!(extraction.records[0].work_type, "Unknown");
    }

    #[test]
    fn test_empty_markup_reports_table_path() {
        let extraction = civic().extract("");
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.source, ExtractionSource::Table);
    }
}
