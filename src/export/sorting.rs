use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;

use crate::scraper::PermitRecord;

/// Format issue dates are normalized from for sorting
pub const ISSUE_DATE_FORMAT: &str = "%m/%d/%Y";

/// Keys a sorted variant file can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Valuation,
    Address,
    Contractor,
    WorkType,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Date,
        SortKey::Valuation,
        SortKey::Address,
        SortKey::Contractor,
        SortKey::WorkType,
    ];

    /// File name suffix, as in `_sorted_{suffix}.csv`
    pub fn suffix(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Valuation => "valuation",
            SortKey::Address => "address",
            SortKey::Contractor => "contractor",
            SortKey::WorkType => "work_type",
        }
    }

    /// Stable sort; date and valuation descend, text keys ascend ignoring case
    pub fn sort(&self, records: &mut [PermitRecord]) {
        match self {
            SortKey::Date => records.sort_by(|a, b| {
                parse_issue_date(&b.issue_date).cmp(&parse_issue_date(&a.issue_date))
            }),
            SortKey::Valuation => records.sort_by(|a, b| {
                parse_valuation(&b.valuation).total_cmp(&parse_valuation(&a.valuation))
            }),
            SortKey::Address => records.sort_by(|a, b| compare_text(&a.address, &b.address)),
            SortKey::Contractor => records.sort_by(|a, b| compare_text(&a.contractor, &b.contractor)),
            SortKey::WorkType => records.sort_by(|a, b| compare_text(&a.work_type, &b.work_type)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

pub fn parse_issue_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), ISSUE_DATE_FORMAT).ok()
}

/// Currency-like text as a number: everything but digits and dots is
/// dropped, and anything still unparseable counts as zero.
pub fn parse_valuation(value: &str) -> f64 {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    digits.parse().unwrap_or(0.0)
}

/// Newest first, all or nothing.
///
/// When any issue date fails to parse the records keep their extraction
/// order and the offending value is returned.
pub fn sort_by_issue_date_desc(records: &mut [PermitRecord]) -> Result<(), String> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records.iter() {
        match parse_issue_date(&record.issue_date) {
            Some(date) => keyed.push(date),
            None => return Err(record.issue_date.clone()),
        }
    }

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|a, b| keyed[*b].cmp(&keyed[*a]));

    let sorted: Vec<PermitRecord> = order.iter().map(|index| records[*index].clone()).collect();
    records.clone_from_slice(&sorted);
    Ok(())
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
