use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::error::{PermitError, PermitResult};
use crate::scraper::PermitField;

/// Default county run order
pub const DEFAULT_COUNTY_ORDER: [&str; 4] = ["bexar", "hamilton", "davidson", "travis"];

/// Scraper configuration, resolved once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub global: GlobalConfig,
    pub counties: BTreeMap<String, CountyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub user_agents: Vec<String>,
    pub delays: DelayConfig,
    #[serde(default = "default_csv_headers")]
    pub csv_headers: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
    /// Bound on a full page load, separate from element waits
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub county_order: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayConfig {
    pub between_actions: DelayRange,
    pub between_counties: DelayRange,
}

/// Inclusive `[min, max]` range in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn is_valid(&self) -> bool {
        self.min_secs.is_finite()
            && self.max_secs.is_finite()
            && self.min_secs >= 0.0
            && self.min_secs <= self.max_secs
    }
}

impl From<[f64; 2]> for DelayRange {
    fn from([min_secs, max_secs]: [f64; 2]) -> Self {
        Self { min_secs, max_secs }
    }
}

impl From<DelayRange> for [f64; 2] {
    fn from(range: DelayRange) -> Self {
        [range.min_secs, range.max_secs]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: PathBuf,
    pub file_prefix: String,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: true,
            console_enabled: true,
            log_directory: PathBuf::from("logs"),
            file_prefix: "scraper".to_string(),
            max_files: 14,
        }
    }
}

/// Workflow shape a county portal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationFamily {
    SearchPortal,
    CivicPortal,
    CsvExport,
}

impl NavigationFamily {
    /// Logical selector names this family cannot run without
    pub fn required_selectors(&self) -> &'static [&'static str] {
        match self {
            NavigationFamily::SearchPortal => &["search_link", "from_date", "to_date", "submit"],
            NavigationFamily::CivicPortal => &["advanced_search_link", "status_issued", "search_button"],
            NavigationFamily::CsvExport => &[],
        }
    }

    pub fn default_extractor(&self) -> ExtractorKind {
        match self {
            NavigationFamily::SearchPortal => ExtractorKind::Table,
            NavigationFamily::CivicPortal => ExtractorKind::TableWithCardFallback,
            NavigationFamily::CsvExport => ExtractorKind::Csv,
        }
    }

    pub fn uses_browser(&self) -> bool {
        !matches!(self, NavigationFamily::CsvExport)
    }
}

/// Result markup shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    Table,
    TableWithCardFallback,
    Card,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountyConfig {
    pub name: String,
    pub navigation: NavigationFamily,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub fallback_url: Option<String>,
    #[serde(default)]
    pub prefer_fallback: bool,
    #[serde(default)]
    pub selectors: HashMap<String, String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub extractor: Option<ExtractorKind>,
    #[serde(default = "default_card_pattern")]
    pub card_class_pattern: String,
    #[serde(default)]
    pub settle: SettleTimings,
}

impl CountyConfig {
    /// URL the scrape starts from
    pub fn entry_url(&self) -> Option<&str> {
        let primary = self.base_url.as_deref().filter(|url| !url.trim().is_empty());
        let fallback = self.fallback_url.as_deref().filter(|url| !url.trim().is_empty());
        if self.prefer_fallback {
            fallback.or(primary)
        } else {
            primary.or(fallback)
        }
    }

    pub fn selector(&self, name: &str) -> PermitResult<&str> {
        self.selectors
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PermitError::config(format!("County '{}' has no '{}' selector", self.name, name)))
    }

    /// Selector with a built-in fallback for optional locators
    pub fn selector_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.selectors.get(name).map(String::as_str).unwrap_or(default)
    }

    pub fn extractor_kind(&self) -> ExtractorKind {
        self.extractor.unwrap_or_else(|| self.navigation.default_extractor())
    }
}

/// Fixed sleeps used by the civic portal while its scripts render.
/// Tuned against the live portal and subject to drift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleTimings {
    pub initial_load_secs: f64,
    pub after_advanced_search_secs: f64,
    pub after_date_injection_secs: f64,
    pub after_dismiss_secs: f64,
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            initial_load_secs: 5.0,
            after_advanced_search_secs: 3.0,
            after_date_injection_secs: 3.0,
            after_dismiss_secs: 1.0,
        }
    }
}

impl SettleTimings {
    fn all(&self) -> [f64; 4] {
        [
            self.initial_load_secs,
            self.after_advanced_search_secs,
            self.after_date_injection_secs,
            self.after_dismiss_secs,
        ]
    }
}

fn default_csv_headers() -> Vec<String> {
    PermitField::ALL.iter().map(|field| field.as_str().to_string()).collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_wait_timeout() -> u64 {
    10
}

fn default_page_load_timeout() -> u64 {
    120
}

fn default_date_format() -> String {
    "%m/%d/%Y".to_string()
}

fn default_card_pattern() -> String {
    "permit|result|record".to_string()
}

/// Seconds as a `Duration`, clamping anything negative to zero
pub fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

impl ScraperConfig {
    /// Load configuration from a YAML (or `.toml`) file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> PermitResult<Self> {
        let path = path.as_ref();
        let path_display = path.display().to_string();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PermitError::ConfigNotFound { path: path_display });
            }
            Err(e) => return Err(PermitError::Io(e)),
        };

        let is_toml = path.extension().map(|ext| ext == "toml").unwrap_or(false);
        let config = if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
        .map_err(|e| match e {
            PermitError::Configuration { message } => PermitError::InvalidConfig { path: path_display.clone(), message },
            other => other,
        })?;

        info!("Configuration loaded from {}", path_display);
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> PermitResult<Self> {
        serde_yaml::from_str(content).map_err(|e| PermitError::config(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> PermitResult<Self> {
        toml::from_str(content).map_err(|e| PermitError::config(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> PermitResult<()> {
        let global = &self.global;

        if global.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(PermitError::config("At least one user agent must be configured"));
        }

        if !global.delays.between_actions.is_valid() {
            return Err(PermitError::config("delays.between_actions must be [min, max] with 0 <= min <= max"));
        }

        if !global.delays.between_counties.is_valid() {
            return Err(PermitError::config("delays.between_counties must be [min, max] with 0 <= min <= max"));
        }

        if global.wait_timeout_secs == 0 {
            return Err(PermitError::config("wait_timeout_secs must be > 0"));
        }

        if global.page_load_timeout_secs < global.wait_timeout_secs {
            return Err(PermitError::config("page_load_timeout_secs must be >= wait_timeout_secs"));
        }

        self.csv_columns()?;

        let mut ordered = HashSet::new();
        for slug in &global.county_order {
            if !self.counties.contains_key(slug) {
                return Err(PermitError::config(format!("county_order names unknown county '{}'", slug)));
            }
            if !ordered.insert(slug.as_str()) {
                return Err(PermitError::config(format!("county_order lists '{}' more than once", slug)));
            }
        }

        for (slug, county) in &self.counties {
            validate_county(slug, county)?;
        }

        info!("Configuration validation passed");
        Ok(())
    }

    /// Header list as typed columns
    pub fn csv_columns(&self) -> PermitResult<Vec<PermitField>> {
        if self.global.csv_headers.is_empty() {
            return Err(PermitError::config("csv_headers must name at least one field"));
        }

        let mut seen = HashSet::new();
        self.global
            .csv_headers
            .iter()
            .map(|header| {
                let field: PermitField = header.parse()?;
                if !seen.insert(field) {
                    return Err(PermitError::config(format!("Duplicate CSV header field: {}", header)));
                }
                Ok(field)
            })
            .collect()
    }

    /// Counties in run order: explicit order first, then the remainder
    pub fn run_order(&self) -> Vec<String> {
        let explicit: Vec<String> = if self.global.county_order.is_empty() {
            DEFAULT_COUNTY_ORDER
                .iter()
                .filter(|slug| self.counties.contains_key(**slug))
                .map(|slug| slug.to_string())
                .collect()
        } else {
            self.global.county_order.clone()
        };

        let mut order = explicit.clone();
        for slug in self.counties.keys() {
            if !explicit.contains(slug) {
                order.push(slug.clone());
            }
        }
        order
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.global.wait_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.global.page_load_timeout_secs)
    }
}

fn validate_county(slug: &str, county: &CountyConfig) -> PermitResult<()> {
    county
        .entry_url()
        .ok_or_else(|| PermitError::config(format!("County '{}' needs a base_url or fallback_url", slug)))?;

    for url in [county.base_url.as_deref(), county.fallback_url.as_deref()].into_iter().flatten() {
        if url.trim().is_empty() {
            continue;
        }
        // `{from}`/`{to}` placeholders are filled in at request time
        let probe = url.replace("{from}", "from").replace("{to}", "to");
        Url::parse(&probe).map_err(|e| PermitError::config(format!("County '{}' has an invalid URL {}: {}", slug, url, e)))?;
    }

    for name in county.navigation.required_selectors() {
        match county.selectors.get(*name) {
            Some(value) if !value.trim().is_empty() => {}
            _ => {
                return Err(PermitError::config(format!(
                    "County '{}' is missing the '{}' selector required by its navigation family",
                    slug, name
                )));
            }
        }
    }

    if StrftimeItems::new(&county.date_format).any(|item| matches!(item, Item::Error)) {
        return Err(PermitError::config(format!(
            "County '{}' has an invalid date_format '{}'",
            slug, county.date_format
        )));
    }

    Regex::new(&county.card_class_pattern).map_err(|e| {
        PermitError::config(format!("County '{}' has an invalid card_class_pattern: {}", slug, e))
    })?;

    if county.settle.all().iter().any(|value| !value.is_finite() || *value < 0.0) {
        return Err(PermitError::config(format!("County '{}' has a negative settle timing", slug)));
    }

    Ok(())
}

/// Environment-based configuration overrides
pub struct ConfigOverrides;

impl ConfigOverrides {
    /// Environment variable naming the configuration file
    pub const CONFIG_PATH_VAR: &'static str = "PERMITS_CONFIG";

    pub fn config_path() -> PathBuf {
        std::env::var(Self::CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.yaml"))
    }

    /// Apply environment variable overrides to configuration
    pub fn apply(config: &mut ScraperConfig) {
        if let Ok(output_dir) = std::env::var("PERMITS_OUTPUT_DIR") {
            config.global.output_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("PERMITS_LOG_LEVEL") {
            config.global.logging.level = log_level;
        }

        if let Ok(timeout_str) = std::env::var("PERMITS_WAIT_TIMEOUT") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.global.wait_timeout_secs = timeout;
            }
        }
    }
}
