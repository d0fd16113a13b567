use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{CountyConfig, ScraperConfig};
use crate::error::{PermitError, PermitResult};
use crate::export::{CsvSink, SinkReport};
use crate::logging::{LogContext, PerformanceLogger};
use crate::scraper::browser::{SessionFactory, SessionSettings};
use crate::scraper::extract::extractor_for;
use crate::scraper::http_client::{export_url, ExportFetcher};
use crate::scraper::navigation::{strategy_for, NavigationContext, NavigationStrategy};
use crate::scraper::pacing::Pacer;
use crate::scraper::user_agent::IdentityProvider;
use crate::scraper::{DateWindow, ScrapeResult};
use crate::{log_info, log_warn};

/// Capabilities a county scrape runs against
#[derive(Clone)]
pub struct ScrapeComponents {
    pub sessions: Arc<dyn SessionFactory>,
    pub fetcher: Arc<dyn ExportFetcher>,
    pub identities: Arc<dyn IdentityProvider>,
    pub pacer: Arc<dyn Pacer>,
    pub sink: Arc<CsvSink>,
}

/// Outcome of one successful county scrape
#[derive(Debug, Clone)]
pub struct CountyScrape {
    pub result: ScrapeResult,
    /// `None` when there was nothing to write
    pub report: Option<SinkReport>,
}

/// Navigation, extraction and CSV output for a single county
pub struct CountyPipeline {
    config: Arc<ScraperConfig>,
    components: ScrapeComponents,
}

impl CountyPipeline {
    pub fn new(config: Arc<ScraperConfig>, components: ScrapeComponents) -> Self {
        Self { config, components }
    }

    pub fn pacer(&self) -> &dyn Pacer {
        self.components.pacer.as_ref()
    }

    /// Scrape one county and write its files
    pub async fn run(
        &self,
        slug: &str,
        window: DateWindow,
        timestamp: NaiveDateTime,
        also_sorted: bool,
    ) -> PermitResult<CountyScrape> {
        let county = self
            .config
            .counties
            .get(slug)
            .ok_or_else(|| PermitError::config(format!("Unknown county '{}'", slug)))?;

        let context = LogContext::new("pipeline", "scrape")
            .with_county(county.name.as_str())
            .with_url(county.entry_url().unwrap_or_default());
        log_info!(context, "Starting scrape for {}", county.name);
        let timer = PerformanceLogger::new(context.clone());

        let payload = match strategy_for(county.navigation) {
            Some(strategy) => self.browse(strategy.as_ref(), county, window).await,
            None => self.download(county, window).await,
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                timer.finish_with_error("Scrape failed", &e);
                return Err(e);
            }
        };

        let extractor = extractor_for(county)?;
        let extraction = extractor.extract(&payload);
        debug!("{} extractor produced {} records", extractor.name(), extraction.records.len());

        if extraction.source.is_degraded() {
            let degraded = context.clone().with_record_count(extraction.records.len());
            log_warn!(
                degraded,
                "No results table for {}, records came from the card fallback and may be incomplete",
                county.name
            );
        }

        let result = ScrapeResult {
            county: county.name.clone(),
            records: extraction.records,
            source: extraction.source,
        };

        let report = self
            .components
            .sink
            .write(&result.records, slug, timestamp, also_sorted)
            .await?;

        if let Some(report) = &report {
            let files: Vec<String> = report.files().map(|path| path.display().to_string()).collect();
            log_info!(
                context,
                "CSV files written ({} bytes): {}",
                report.bytes_written,
                files.join(", ")
            );
        }

        timer.finish(&format!("Completed {} via {}", county.name, result.source), result.len());
        Ok(CountyScrape { result, report })
    }

    /// Drive a browser session through the county's search workflow.
    /// The session is closed on every path out of here.
    async fn browse(
        &self,
        strategy: &dyn NavigationStrategy,
        county: &CountyConfig,
        window: DateWindow,
    ) -> PermitResult<String> {
        let settings = SessionSettings {
            user_agent: self.components.identities.user_agent(),
            viewport: self.config.global.viewport,
            element_timeout: self.config.wait_timeout(),
            page_load_timeout: self.config.page_load_timeout(),
            headless: true,
        };
        let session = self.components.sessions.create_session(&settings).await?;
        debug!("Session opened for {} using {}", county.name, strategy.name());

        let ctx = NavigationContext {
            county,
            window,
            pacer: self.components.pacer.as_ref(),
            between_actions: self.config.global.delays.between_actions,
            wait_timeout: self.config.wait_timeout(),
        };
        let markup = strategy.fetch_results(session.as_ref(), &ctx).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session for {}: {}", county.name, e);
        }
        markup
    }

    /// Fetch a published CSV export for the window
    async fn download(&self, county: &CountyConfig, window: DateWindow) -> PermitResult<String> {
        let template = county
            .entry_url()
            .ok_or_else(|| PermitError::config(format!("County '{}' has no export URL", county.name)))?;
        let url = export_url(template, &window, &county.date_format)?;

        self.components
            .fetcher
            .fetch_text(&url, &self.components.identities.user_agent())
            .await
    }
}
