//! County Permits - scheduled scraper for newly issued building permits
//!
//! Each county portal is driven through its own search workflow, the
//! rendered results are normalized into one permit record shape and
//! written to timestamped CSV files:
//! - Navigation strategies for search-portal and civic-portal families
//! - Table, card-fallback and raw-CSV extractors
//! - CSV sink with optional sorted variants
//! - Sequential orchestration with per-county failure isolation

pub mod logging;

pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod scraper;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use crate::config::ScraperConfig;
pub use crate::core::{PermitScraper, RunReport};
pub use crate::error::{PermitError, PermitResult};
pub use crate::scraper::PermitRecord;
