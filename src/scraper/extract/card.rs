use regex::Regex;
use scraper::Html;

use super::table::parse_selector;
use super::{Extraction, ExtractionSource, ResultExtractor};
use crate::error::{PermitError, PermitResult};
use crate::scraper::{PermitRecord, UNKNOWN_WORK_TYPE};

/// Best-effort parser for results rendered as cards or list items.
///
/// Each matching `div`/`li` is read line by line: permit number, issue
/// date, address. Work type is not recoverable and is set to "Unknown".
pub struct CardExtractor {
    blocks: scraper::Selector,
    class_pattern: Regex,
}

impl CardExtractor {
    pub fn new(class_pattern: &str) -> PermitResult<Self> {
        let class_pattern = Regex::new(class_pattern)
            .map_err(|e| PermitError::extraction(format!("Invalid card class pattern: {}", e)))?;

        Ok(Self {
            blocks: parse_selector("div, li")?,
            class_pattern,
        })
    }
}

impl ResultExtractor for CardExtractor {
    fn name(&self) -> &'static str {
        "card"
    }

    fn extract(&self, payload: &str) -> Extraction {
        let document = Html::parse_document(payload);

        let records = document
            .select(&self.blocks)
            .filter(|element| element.value().classes().any(|class| self.class_pattern.is_match(class)))
            .filter_map(|element| {
                let text: String = element.text().collect();
                let lines: Vec<&str> = text.lines().map(str::trim).filter(|line| !line.is_empty()).collect();

                if lines.len() < 3 {
                    return None;
                }

                Some(PermitRecord {
                    permit_number: lines[0].to_string(),
                    issue_date: lines[1].to_string(),
                    address: lines[2].to_string(),
                    work_type: UNKNOWN_WORK_TYPE.to_string(),
                    contractor: String::new(),
                    valuation: String::new(),
                })
            })
            .collect();

        Extraction {
            records,
            source: ExtractionSource::CardFallback,
        }
    }
}
