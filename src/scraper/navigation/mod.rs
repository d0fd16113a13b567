use async_trait::async_trait;
use std::time::Duration;

pub mod civic_portal;
pub mod search_portal;

pub use civic_portal::CivicPortalNavigator;
pub use search_portal::SearchPortalNavigator;

use crate::config::{CountyConfig, DelayRange, NavigationFamily};
use crate::error::{PermitError, PermitResult};
use crate::scraper::browser::BrowserSession;
use crate::scraper::pacing::Pacer;
use crate::scraper::DateWindow;

/// Everything a navigator needs besides the session itself
pub struct NavigationContext<'a> {
    pub county: &'a CountyConfig,
    pub window: DateWindow,
    pub pacer: &'a dyn Pacer,
    pub between_actions: DelayRange,
    /// Bound on every explicit element wait
    pub wait_timeout: Duration,
}

impl NavigationContext<'_> {
    pub fn entry_url(&self) -> PermitResult<&str> {
        self.county
            .entry_url()
            .ok_or_else(|| PermitError::config(format!("County '{}' has no entry URL", self.county.name)))
    }

    /// Randomized pause between portal interactions
    pub async fn pause(&self) {
        self.pacer.pause(&self.between_actions).await;
    }
}

/// Drives a browser session through one portal family's search workflow
/// and returns the rendered results markup.
///
/// Steps run strictly in order and are never retried; the first failing
/// step aborts the workflow.
#[async_trait]
pub trait NavigationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_results(&self, session: &dyn BrowserSession, ctx: &NavigationContext<'_>) -> PermitResult<String>;
}

/// Browser navigator for a family, or `None` when the family downloads directly
pub fn strategy_for(family: NavigationFamily) -> Option<Box<dyn NavigationStrategy>> {
    match family {
        NavigationFamily::SearchPortal => Some(Box::new(SearchPortalNavigator)),
        NavigationFamily::CivicPortal => Some(Box::new(CivicPortalNavigator)),
        NavigationFamily::CsvExport => None,
    }
}
