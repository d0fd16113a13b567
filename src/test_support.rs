//! In-memory stand-ins for the browser, timing, identity and download seams.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::config::{
    CountyConfig, DelayConfig, DelayRange, GlobalConfig, LoggingConfig, NavigationFamily, ScraperConfig,
    SettleTimings, Viewport,
};
use crate::error::{PermitError, PermitResult};
use crate::scraper::browser::{BrowserSession, ElementLocator, SessionFactory, SessionSettings};
use crate::scraper::http_client::ExportFetcher;
use crate::scraper::pacing::Pacer;
use crate::scraper::user_agent::IdentityProvider;
use crate::scraper::PermitField;

/// One recorded browser interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Goto(String),
    WaitFor(ElementLocator),
    Click(ElementLocator),
    Type(ElementLocator, String),
    Script(String),
    PageSource,
    Close,
}

/// Browser session that replays canned pages and records every call
pub struct ScriptedSession {
    pages: HashMap<String, String>,
    default_page: String,
    failing_urls: HashSet<String>,
    fail_on: Option<ElementLocator>,
    current_url: Mutex<Option<String>>,
    script_results: Mutex<VecDeque<Value>>,
    actions: Mutex<Vec<Action>>,
    closed: AtomicBool,
    closed_count: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn with_page(page: &str) -> Self {
        Self {
            pages: HashMap::new(),
            default_page: page.to_string(),
            failing_urls: HashSet::new(),
            fail_on: None,
            current_url: Mutex::new(None),
            script_results: Mutex::new(VecDeque::new()),
            actions: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            closed_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits and clicks on `locator` fail
    pub fn failing_on(mut self, locator: ElementLocator) -> Self {
        self.fail_on = Some(locator);
        self
    }

    /// Values returned by successive `execute_script` calls, then `null`
    pub fn with_script_results(self, results: Vec<Value>) -> Self {
        *self.script_results.lock().unwrap() = results.into();
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Script(script) => Some(script),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    fn check(&self, locator: &ElementLocator) -> bool {
        self.fail_on.as_ref() != Some(locator)
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str) -> PermitResult<()> {
        self.record(Action::Goto(url.to_string()));
        if self.failing_urls.contains(url) {
            return Err(PermitError::session(format!("Failed to load {}", url)));
        }
        *self.current_url.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn wait_for(&self, locator: &ElementLocator, timeout: Duration) -> PermitResult<()> {
        self.record(Action::WaitFor(locator.clone()));
        if !self.check(locator) {
            return Err(PermitError::NavigationTimeout {
                locator: locator.to_string(),
                waited_secs: timeout.as_secs(),
            });
        }
        Ok(())
    }

    async fn click(&self, locator: &ElementLocator) -> PermitResult<()> {
        self.record(Action::Click(locator.clone()));
        if !self.check(locator) {
            return Err(PermitError::ElementNotFound {
                locator: locator.to_string(),
            });
        }
        Ok(())
    }

    async fn clear_and_type(&self, locator: &ElementLocator, text: &str) -> PermitResult<()> {
        self.record(Action::Type(locator.clone(), text.to_string()));
        if !self.check(locator) {
            return Err(PermitError::ElementNotFound {
                locator: locator.to_string(),
            });
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> PermitResult<Value> {
        self.record(Action::Script(script.to_string()));
        Ok(self.script_results.lock().unwrap().pop_front().unwrap_or(Value::Null))
    }

    async fn page_source(&self) -> PermitResult<String> {
        self.record(Action::PageSource);
        let current = self.current_url.lock().unwrap().clone();
        Ok(current
            .and_then(|url| self.pages.get(&url).cloned())
            .unwrap_or_else(|| self.default_page.clone()))
    }

    async fn close(&self) -> PermitResult<()> {
        self.record(Action::Close);
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.closed_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Hands out scripted sessions and counts their lifetimes
#[derive(Default)]
pub struct ScriptedSessionFactory {
    pages: HashMap<String, String>,
    default_page: String,
    failing_urls: HashSet<String>,
    script_results: Vec<Value>,
    refuse_launch: bool,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    settings: Mutex<Vec<SessionSettings>>,
}

impl ScriptedSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` after navigating to `url`
    pub fn page(mut self, url: &str, page: &str) -> Self {
        self.pages.insert(url.to_string(), page.to_string());
        self
    }

    /// Navigation to `url` fails with a session error
    pub fn failing_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    /// Script results replayed by every session this factory creates
    pub fn script_results(mut self, results: Vec<Value>) -> Self {
        self.script_results = results;
        self
    }

    /// Every launch fails
    pub fn refusing_launch(mut self) -> Self {
        self.refuse_launch = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.settings().into_iter().map(|settings| settings.user_agent).collect()
    }

    /// Settings passed to every launch, in order
    pub fn settings(&self) -> Vec<SessionSettings> {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn create_session(&self, settings: &SessionSettings) -> PermitResult<Box<dyn BrowserSession>> {
        if self.refuse_launch {
            return Err(PermitError::session("Failed to launch browser: no binary"));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.settings.lock().unwrap().push(settings.clone());

        let mut session = ScriptedSession::with_page(&self.default_page);
        session.pages = self.pages.clone();
        session.failing_urls = self.failing_urls.clone();
        session.closed_count = self.closed.clone();
        Ok(Box::new(session.with_script_results(self.script_results.clone())))
    }
}

/// Pacer that never sleeps, counting what it was asked to do
#[derive(Default)]
pub struct ImmediatePacer {
    pauses: AtomicUsize,
    ranges: Mutex<Vec<DelayRange>>,
    settles: Mutex<Vec<Duration>>,
}

impl ImmediatePacer {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn ranges(&self) -> Vec<DelayRange> {
        self.ranges.lock().unwrap().clone()
    }

    pub fn settles(&self) -> Vec<Duration> {
        self.settles.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for ImmediatePacer {
    async fn pause(&self, range: &DelayRange) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push(*range);
    }

    async fn settle(&self, duration: Duration) {
        self.settles.lock().unwrap().push(duration);
    }
}

/// Always answers with the same user agent
pub struct FixedIdentity(pub String);

impl IdentityProvider for FixedIdentity {
    fn user_agent(&self) -> String {
        self.0.clone()
    }
}

/// Export fetcher answering every request with one canned response
pub struct CannedFetcher {
    response: Result<String, u16>,
    requests: Mutex<Vec<(String, String)>>,
}

impl CannedFetcher {
    pub fn body(body: &str) -> Self {
        Self {
            response: Ok(body.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            response: Err(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(url, user_agent)` for every request made
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExportFetcher for CannedFetcher {
    async fn fetch_text(&self, url: &Url, user_agent: &str) -> PermitResult<String> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), user_agent.to_string()));

        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(PermitError::HttpRequest {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}

/// Valid configuration writing into `output_dir`
pub fn test_config(output_dir: &Path, counties: Vec<(&str, CountyConfig)>) -> ScraperConfig {
    ScraperConfig {
        global: GlobalConfig {
            user_agents: vec!["TestAgent/1.0".to_string()],
            delays: DelayConfig {
                between_actions: DelayRange::new(2.0, 5.0),
                between_counties: DelayRange::new(10.0, 20.0),
            },
            csv_headers: PermitField::ALL.iter().map(|field| field.as_str().to_string()).collect(),
            output_dir: output_dir.to_path_buf(),
            wait_timeout_secs: 10,
            page_load_timeout_secs: 120,
            viewport: Viewport::default(),
            county_order: Vec::new(),
            logging: LoggingConfig::default(),
        },
        counties: counties
            .into_iter()
            .map(|(slug, county)| (slug.to_string(), county))
            .collect(),
    }
}

fn county(name: &str, navigation: NavigationFamily, base_url: &str, selectors: &[(&str, &str)]) -> CountyConfig {
    CountyConfig {
        name: name.to_string(),
        navigation,
        base_url: Some(base_url.to_string()),
        fallback_url: None,
        prefer_fallback: false,
        selectors: selectors
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        date_format: "%m/%d/%Y".to_string(),
        extractor: None,
        card_class_pattern: "permit|result|record".to_string(),
        settle: SettleTimings::default(),
    }
}

pub fn search_county(name: &str, base_url: &str) -> CountyConfig {
    county(
        name,
        NavigationFamily::SearchPortal,
        base_url,
        &[
            ("search_link", "Search Permits"),
            ("from_date", "#fromDate"),
            ("to_date", "#toDate"),
            ("submit", "#btnSearch"),
        ],
    )
}

pub fn civic_county(name: &str, base_url: &str) -> CountyConfig {
    county(
        name,
        NavigationFamily::CivicPortal,
        base_url,
        &[
            ("advanced_search_link", "Advanced Search"),
            ("status_issued", "input[value='Issued']"),
            ("search_button", "Search"),
        ],
    )
}

pub fn export_county(name: &str, export_url: &str) -> CountyConfig {
    county(name, NavigationFamily::CsvExport, export_url, &[])
}

/// Results table with a header row and the given data rows
pub fn results_table(rows: &[[&str; 6]]) -> String {
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row.iter().map(|cell| format!("<td>{}</td>", cell)).collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();

    format!(
        "<html><body><table><tr><th>Permit</th><th>Issued</th><th>Address</th><th>Type</th>\
         <th>Contractor</th><th>Value</th></tr>{}</table></body></html>",
        body
    )
}
