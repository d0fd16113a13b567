use async_trait::async_trait;
use tracing::debug;

use super::{NavigationContext, NavigationStrategy};
use crate::error::PermitResult;
use crate::scraper::browser::{BrowserSession, ElementLocator};

/// Generic search-and-results portal: open the search page, type the
/// issue-date window into two inputs and submit.
///
/// Selectors used: `search_link` (partial link text), `from_date`,
/// `to_date` and `submit` (CSS).
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchPortalNavigator;

#[async_trait]
impl NavigationStrategy for SearchPortalNavigator {
    fn name(&self) -> &'static str {
        "search_portal"
    }

    async fn fetch_results(&self, session: &dyn BrowserSession, ctx: &NavigationContext<'_>) -> PermitResult<String> {
        let county = ctx.county;
        let url = ctx.entry_url()?;

        debug!("Opening {} for {}", url, county.name);
        session.goto(url).await?;

        let search_link = ElementLocator::partial_link_text(county.selector("search_link")?);
        session.wait_for(&search_link, ctx.wait_timeout).await?;
        session.click(&search_link).await?;
        ctx.pause().await;

        let (from, to) = ctx.window.formatted(&county.date_format);
        let from_field = ElementLocator::css(county.selector("from_date")?);
        let to_field = ElementLocator::css(county.selector("to_date")?);

        session.wait_for(&from_field, ctx.wait_timeout).await?;
        session.clear_and_type(&from_field, &from).await?;
        session.clear_and_type(&to_field, &to).await?;
        debug!("Searching {} for permits issued {} to {}", county.name, from, to);

        session.click(&ElementLocator::css(county.selector("submit")?)).await?;
        ctx.pause().await;

        session.page_source().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CountyConfig, DelayRange};
    use crate::error::PermitError;
    use crate::scraper::DateWindow;
    use crate::test_support::{search_county, Action, ImmediatePacer, ScriptedSession};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn context<'a>(county: &'a CountyConfig, pacer: &'a ImmediatePacer) -> NavigationContext<'a> {
        NavigationContext {
            county,
            window: DateWindow::trailing(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(), 7),
            pacer,
            between_actions: DelayRange::new(2.0, 5.0),
            wait_timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_workflow_runs_in_order() {
        let county = search_county("Bexar County", "https://permits.example.gov/");
        let pacer = ImmediatePacer::default();
        let session = ScriptedSession::with_page("<table></table>");

        let markup = SearchPortalNavigator
            .fetch_results(&session, &context(&county, &pacer))
            .await
            .unwrap();

        assert_eq!(markup, "<table></table>");
        assert_eq!(
            session.actions(),
            vec![
                Action::Goto("https://permits.example.gov/".into()),
                Action::WaitFor(ElementLocator::partial_link_text("Search Permits")),
                Action::Click(ElementLocator::partial_link_text("Search Permits")),
                Action::WaitFor(ElementLocator::css("#fromDate")),
                Action::Type(ElementLocator::css("#fromDate"), "01/01/2024".into()),
                Action::Type(ElementLocator::css("#toDate"), "01/08/2024".into()),
                Action::Click(ElementLocator::css("#btnSearch")),
                Action::PageSource,
            ]
        );
        assert_eq!(pacer.pauses(), 2);
    }

    #[tokio::test]
    async fn test_missing_search_link_times_out() {
        let county = search_county("Bexar County", "https://permits.example.gov/");
        let pacer = ImmediatePacer::default();
        let session = ScriptedSession::with_page("").failing_on(ElementLocator::partial_link_text("Search Permits"));

        let error = SearchPortalNavigator
            .fetch_results(&session, &context(&county, &pacer))
            .await
            .unwrap_err();

        assert!(matches!(error, PermitError::NavigationTimeout { waited_secs: 10, .. }));
        assert_eq!(error.category(), "navigation");
        assert!(!session.actions().iter().any(|action| matches!(action, Action::Type(..))));
    }

    #[tokio::test]
    async fn test_fallback_url_used_when_preferred() {
        let mut county = search_county("Travis County", "https://abc.example.gov/");
        county.fallback_url = Some("https://county.example.gov/permits".into());
        county.prefer_fallback = true;
        let pacer = ImmediatePacer::default();
        let session = ScriptedSession::with_page("");

        SearchPortalNavigator
            .fetch_results(&session, &context(&county, &pacer))
            .await
            .unwrap();

        assert_eq!(session.actions()[0], Action::Goto("https://county.example.gov/permits".into()));
    }
}
