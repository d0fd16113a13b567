use scraper::{ElementRef, Html, Selector};

use super::{clean_text, Extraction, ExtractionSource, ResultExtractor, MIN_COLUMNS};
use crate::error::{PermitError, PermitResult};
use crate::scraper::PermitRecord;

/// Reads the first `<table>` on the page positionally
pub struct TableExtractor {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl TableExtractor {
    pub fn new() -> PermitResult<Self> {
        Ok(Self {
            table: parse_selector("table")?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
        })
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Option<PermitRecord> {
        let cells: Vec<String> = row.select(&self.cell).map(|cell| clean_text(cell.text())).collect();

        if cells.len() < MIN_COLUMNS {
            return None;
        }

        let column = |index: usize| cells.get(index).cloned().unwrap_or_default();
        Some(PermitRecord {
            permit_number: column(0),
            issue_date: column(1),
            address: column(2),
            work_type: column(3),
            contractor: column(4),
            valuation: column(5),
        })
    }
}

impl ResultExtractor for TableExtractor {
    fn name(&self) -> &'static str {
        "table"
    }

    fn extract(&self, payload: &str) -> Extraction {
        let document = Html::parse_document(payload);

        let records = match document.select(&self.table).next() {
            // First row is the header
            Some(table) => table
                .select(&self.row)
                .skip(1)
                .filter_map(|row| self.parse_row(row))
                .collect(),
            None => Vec::new(),
        };

        Extraction {
            records,
            source: ExtractionSource::Table,
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> PermitResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| PermitError::extraction(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}
