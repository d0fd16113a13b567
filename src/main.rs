use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use county_permits::config::ConfigOverrides;
use county_permits::core::CountyOutcome;
use county_permits::logging::{init_logging, LogContext};
use county_permits::{log_info, PermitScraper, ScraperConfig};

/// Scrape newly issued building permits from county portals into CSV files
#[derive(Parser, Debug)]
#[command(name = "county-permits", version, about)]
struct Cli {
    /// Also write one CSV per sort key (date, valuation, address, contractor, work type)
    #[arg(long)]
    sort: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration problems abort before any county is attempted
    let config_path = ConfigOverrides::config_path();
    let mut config = ScraperConfig::load_from_file(&config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    ConfigOverrides::apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config.global.logging)?;
    info!("Starting county-permits v{}", env!("CARGO_PKG_VERSION"));

    let scraper = PermitScraper::new(config)?;
    let report = scraper.run(cli.sort).await;

    for outcome in &report.outcomes {
        match outcome {
            CountyOutcome::Completed {
                county,
                record_count,
                extraction,
                files,
                ..
            } => info!(
                "{}: {} records via {}, {} files",
                county,
                record_count,
                extraction,
                files.len()
            ),
            CountyOutcome::Failed { county, error, .. } => {
                warn!("{}: no output, see log ({})", county, error)
            }
        }
    }

    let context = LogContext::new("main", "run")
        .with_status(if report.failed() == 0 { "completed" } else { "degraded" })
        .with_record_count(report.total_records());
    log_info!(
        context,
        "Run complete: {}/{} counties succeeded",
        report.succeeded(),
        report.outcomes.len()
    );

    Ok(())
}
