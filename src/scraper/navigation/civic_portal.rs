use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{NavigationContext, NavigationStrategy};
use crate::config::secs;
use crate::error::{PermitError, PermitResult};
use crate::scraper::browser::{BrowserSession, ElementLocator};

const DEFAULT_FROM_FIELD: &str = "issuedDateFrom";
const DEFAULT_TO_FIELD: &str = "issuedDateTo";
const DEFAULT_DISMISS_TARGET: &str = "body";

/// JavaScript-heavy civic portal whose date pickers ignore synthetic
/// keystrokes.
///
/// Dates are assigned by script, announced with `input`/`change` events
/// and read back before the search is submitted. Fixed settle sleeps stand
/// in for readiness signals the portal does not expose.
///
/// Selectors used: `advanced_search_link` (exact link text),
/// `status_issued` (CSS), `search_button` (exact button text), plus the
/// optional `issued_date_from` / `issued_date_to` element ids and
/// `dismiss` (CSS).
#[derive(Debug, Default, Clone, Copy)]
pub struct CivicPortalNavigator;

#[async_trait]
impl NavigationStrategy for CivicPortalNavigator {
    fn name(&self) -> &'static str {
        "civic_portal"
    }

    async fn fetch_results(&self, session: &dyn BrowserSession, ctx: &NavigationContext<'_>) -> PermitResult<String> {
        let county = ctx.county;
        let settle = county.settle;

        session.goto(ctx.entry_url()?).await?;
        ctx.pacer.settle(secs(settle.initial_load_secs)).await;

        let advanced = ElementLocator::link_text(county.selector("advanced_search_link")?);
        session.wait_for(&advanced, ctx.wait_timeout).await?;
        session.click(&advanced).await?;
        ctx.pacer.settle(secs(settle.after_advanced_search_secs)).await;

        let issued = ElementLocator::css(county.selector("status_issued")?);
        session.wait_for(&issued, ctx.wait_timeout).await?;
        session.click(&issued).await?;

        let fields = DateFields {
            from_id: county.selector_or("issued_date_from", DEFAULT_FROM_FIELD),
            to_id: county.selector_or("issued_date_to", DEFAULT_TO_FIELD),
        };
        let (from, to) = ctx.window.formatted(&county.date_format);

        let assigned = session.execute_script(&fields.assign_script(&from, &to)).await?;
        if assigned != Value::Bool(true) {
            return Err(PermitError::ElementNotFound {
                locator: fields.describe(),
            });
        }
        ctx.pacer.settle(secs(settle.after_date_injection_secs)).await;

        // Close any date picker left open over the form
        let dismiss = ElementLocator::css(county.selector_or("dismiss", DEFAULT_DISMISS_TARGET));
        session.click(&dismiss).await?;
        ctx.pacer.settle(secs(settle.after_dismiss_secs)).await;

        let read_back = session.execute_script(&fields.read_script()).await?;
        verify_dates(&read_back, &from, &to)?;
        debug!("Issued-date window {} to {} accepted by {}", from, to, county.name);

        let search = ElementLocator::button_text(county.selector("search_button")?);
        session.wait_for(&search, ctx.wait_timeout).await?;
        session.click(&search).await?;
        ctx.pause().await;

        session.page_source().await
    }
}

struct DateFields<'a> {
    from_id: &'a str,
    to_id: &'a str,
}

impl DateFields<'_> {
    fn describe(&self) -> String {
        format!("date fields #{} / #{}", self.from_id, self.to_id)
    }

    fn lookup(&self) -> String {
        format!(
            "var from = document.getElementById({}); var to = document.getElementById({});",
            js_string(self.from_id),
            js_string(self.to_id)
        )
    }

    fn assign_script(&self, from: &str, to: &str) -> String {
        format!(
            "(function() {{ {} \
             if (!from || !to) {{ return false; }} \
             from.value = {}; to.value = {}; \
             [from, to].forEach(function (field) {{ \
               field.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               field.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             }}); \
             return true; }})()",
            self.lookup(),
            js_string(from),
            js_string(to)
        )
    }

    fn read_script(&self) -> String {
        format!(
            "(function() {{ {} \
             return JSON.stringify([from ? from.value : null, to ? to.value : null]); }})()",
            self.lookup()
        )
    }
}

/// JSON string literals are valid JavaScript string literals
fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn verify_dates(read_back: &Value, from: &str, to: &str) -> PermitResult<()> {
    let values: Vec<Option<String>> = read_back
        .as_str()
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default();

    let actual_from = values.first().cloned().flatten().unwrap_or_default();
    let actual_to = values.get(1).cloned().flatten().unwrap_or_default();

    if actual_from == from && actual_to == to {
        return Ok(());
    }

    warn!("Date fields read back as {:?} / {:?}, expected {} / {}", actual_from, actual_to, from, to);
    Err(PermitError::DateInjection {
        expected: format!("{} - {}", from, to),
        actual: format!("{} - {}", actual_from, actual_to),
    })
}
