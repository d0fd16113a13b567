use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod orchestrator;
pub mod pipeline;

pub use orchestrator::{CountyOutcome, Orchestrator, RunReport};
pub use pipeline::{CountyPipeline, CountyScrape, ScrapeComponents};

use crate::config::ScraperConfig;
use crate::error::PermitResult;
use crate::export::CsvSink;
use crate::scraper::browser::ChromeSessionFactory;
use crate::scraper::http_client::HttpClient;
use crate::scraper::pacing::RandomPacer;
use crate::scraper::user_agent::UserAgentRotator;

/// Upper bound on a single CSV export download
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Core application: validated configuration wired to the production
/// browser, HTTP client, pacing and CSV sink.
pub struct PermitScraper {
    config: Arc<ScraperConfig>,
    orchestrator: Orchestrator,
}

impl PermitScraper {
    /// Initialize with the real components
    pub fn new(config: ScraperConfig) -> PermitResult<Self> {
        info!("Initializing county permit scraper");

        let components = ScrapeComponents {
            sessions: Arc::new(ChromeSessionFactory::new()),
            fetcher: Arc::new(HttpClient::new(DOWNLOAD_TIMEOUT)?),
            identities: Arc::new(UserAgentRotator::new(&config.global.user_agents)),
            pacer: Arc::new(RandomPacer::new()),
            sink: Arc::new(CsvSink::new(&config.global.output_dir, config.csv_columns()?)?),
        };
        info!("Output directory: {}", config.global.output_dir.display());

        Ok(Self::with_components(config, components))
    }

    pub fn with_components(config: ScraperConfig, components: ScrapeComponents) -> Self {
        let config = Arc::new(config);
        let pipeline = CountyPipeline::new(config.clone(), components);
        Self {
            orchestrator: Orchestrator::new(config.clone(), pipeline),
            config,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Scrape every configured county for the trailing seven-day window
    pub async fn run(&self, also_sorted: bool) -> RunReport {
        self.orchestrator.run(also_sorted).await
    }
}
