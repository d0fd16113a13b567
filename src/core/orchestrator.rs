use chrono::{Local, NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::ScraperConfig;
use crate::core::pipeline::CountyPipeline;
use crate::logging::LogContext;
use crate::scraper::{DateWindow, WINDOW_DAYS};
use crate::log_error;

/// What happened to one county during a run
#[derive(Debug, Clone)]
pub enum CountyOutcome {
    Completed {
        slug: String,
        county: String,
        record_count: usize,
        extraction: &'static str,
        files: Vec<PathBuf>,
    },
    Failed {
        slug: String,
        county: String,
        error: String,
        category: &'static str,
    },
}

impl CountyOutcome {
    pub fn slug(&self) -> &str {
        match self {
            CountyOutcome::Completed { slug, .. } | CountyOutcome::Failed { slug, .. } => slug,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CountyOutcome::Completed { .. })
    }
}

/// Per-county outcomes of a whole run, in run order
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: NaiveDateTime,
    pub window_from: NaiveDate,
    pub window_to: NaiveDate,
    pub outcomes: Vec<CountyOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_records(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                CountyOutcome::Completed { record_count, .. } => *record_count,
                CountyOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Runs every configured county in sequence, one at a time.
///
/// A failure inside one county is logged and recorded; the remaining
/// counties still run.
pub struct Orchestrator {
    config: Arc<ScraperConfig>,
    pipeline: CountyPipeline,
}

impl Orchestrator {
    pub fn new(config: Arc<ScraperConfig>, pipeline: CountyPipeline) -> Self {
        Self { config, pipeline }
    }

    /// Scrape the trailing seven-day window ending today
    pub async fn run(&self, also_sorted: bool) -> RunReport {
        let window = DateWindow::trailing(Local::now().date_naive(), WINDOW_DAYS);
        self.run_window(window, also_sorted).await
    }

    /// Scrape an explicit issue-date window
    pub async fn run_window(&self, window: DateWindow, also_sorted: bool) -> RunReport {
        let started_at = Local::now().naive_local();
        let order = self.config.run_order();
        info!(
            "Scraping {} counties for permits issued {} to {}",
            order.len(),
            window.from,
            window.to
        );

        let mut outcomes = Vec::with_capacity(order.len());
        for (index, slug) in order.iter().enumerate() {
            let county = self
                .config
                .counties
                .get(slug)
                .map(|county| county.name.clone())
                .unwrap_or_else(|| slug.clone());

            let timestamp = Local::now().naive_local();
            let outcome = match self.pipeline.run(slug, window, timestamp, also_sorted).await {
                Ok(scrape) => CountyOutcome::Completed {
                    slug: slug.clone(),
                    county,
                    record_count: scrape.result.len(),
                    extraction: scrape.result.source.as_str(),
                    files: scrape
                        .report
                        .map(|report| report.files().cloned().collect())
                        .unwrap_or_default(),
                },
                Err(e) => {
                    let context = LogContext::new("orchestrator", "scrape_county")
                        .with_county(county.as_str())
                        .with_status("failed")
                        .with_error_category(e.category());
                    log_error!(context, error = %e, "Scrape failed for {}", county);

                    CountyOutcome::Failed {
                        slug: slug.clone(),
                        county,
                        error: e.to_string(),
                        category: e.category(),
                    }
                }
            };
            outcomes.push(outcome);

            if index + 1 < order.len() {
                self.pipeline
                    .pacer()
                    .pause(&self.config.global.delays.between_counties)
                    .await;
            }
        }

        let report = RunReport {
            started_at,
            window_from: window.from,
            window_to: window.to,
            outcomes,
        };
        info!(
            "Run finished: {} succeeded, {} failed, {} records",
            report.succeeded(),
            report.failed(),
            report.total_records()
        );
        report
    }
}
