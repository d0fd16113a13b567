use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod browser;
pub mod extract;
pub mod http_client;
pub mod navigation;
pub mod pacing;
pub mod user_agent;

use crate::error::{PermitError, PermitResult};

/// Sentinel used when the work type cannot be recovered from markup
pub const UNKNOWN_WORK_TYPE: &str = "Unknown";

/// Number of days covered by each run's issue-date window
pub const WINDOW_DAYS: i64 = 7;

/// One normalized building permit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRecord {
    pub permit_number: String,
    pub issue_date: String,
    pub address: String,
    pub work_type: String,
    pub contractor: String,
    pub valuation: String,
}

impl PermitRecord {
    /// Value of a single output column
    pub fn field(&self, field: PermitField) -> &str {
        match field {
            PermitField::PermitNumber => &self.permit_number,
            PermitField::IssueDate => &self.issue_date,
            PermitField::Address => &self.address,
            PermitField::WorkType => &self.work_type,
            PermitField::Contractor => &self.contractor,
            PermitField::Valuation => &self.valuation,
        }
    }

    /// Values in the given column order
    pub fn to_row(&self, columns: &[PermitField]) -> Vec<&str> {
        columns.iter().map(|column| self.field(*column)).collect()
    }
}

/// Output columns a CSV header list may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermitField {
    PermitNumber,
    IssueDate,
    Address,
    WorkType,
    Contractor,
    Valuation,
}

impl PermitField {
    pub const ALL: [PermitField; 6] = [
        PermitField::PermitNumber,
        PermitField::IssueDate,
        PermitField::Address,
        PermitField::WorkType,
        PermitField::Contractor,
        PermitField::Valuation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermitField::PermitNumber => "permit_number",
            PermitField::IssueDate => "issue_date",
            PermitField::Address => "address",
            PermitField::WorkType => "work_type",
            PermitField::Contractor => "contractor",
            PermitField::Valuation => "valuation",
        }
    }
}

impl FromStr for PermitField {
    type Err = PermitError;

    fn from_str(s: &str) -> PermitResult<Self> {
        PermitField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| PermitError::config(format!("Unknown CSV header field: {}", s)))
    }
}

impl fmt::Display for PermitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue-date window searched on every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// Window ending on `today` and starting `days` earlier
    pub fn trailing(today: NaiveDate, days: i64) -> Self {
        Self {
            from: today - ChronoDuration::days(days),
            to: today,
        }
    }

    /// Both bounds rendered with a strftime pattern
    pub fn formatted(&self, date_format: &str) -> (String, String) {
        (
            self.from.format(date_format).to_string(),
            self.to.format(date_format).to_string(),
        )
    }
}

/// Records produced for one county in one run
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub county: String,
    pub records: Vec<PermitRecord>,
    pub source: extract::ExtractionSource,
}

impl ScrapeResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
