use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::error::{PermitError, PermitResult};
use crate::scraper::DateWindow;

/// Downloads raw export text for sources that publish CSV directly
#[async_trait]
pub trait ExportFetcher: Send + Sync {
    async fn fetch_text(&self, url: &Url, user_agent: &str) -> PermitResult<String>;
}

/// HTTP client wrapper for direct CSV exports
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create new HTTP client; `timeout` bounds each request end to end
    pub fn new(timeout: Duration) -> PermitResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("text/csv,text/plain;q=0.9,*/*;q=0.8"));
        headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert("DNT", HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| PermitError::network(format!("Failed to build HTTP client: {}", e)))?;

        info!("HTTP client initialized");
        Ok(Self { client })
    }
}

#[async_trait]
impl ExportFetcher for HttpClient {
    async fn fetch_text(&self, url: &Url, user_agent: &str) -> PermitResult<String> {
        let start_time = Instant::now();
        debug!("HTTP GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .header("User-Agent", user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PermitError::HttpRequest {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Downloaded {} bytes from {} in {}ms", body.len(), url, start_time.elapsed().as_millis());
        Ok(body)
    }
}

/// Fill `{from}` / `{to}` placeholders with URL-encoded window dates
pub fn export_url(template: &str, window: &DateWindow, date_format: &str) -> PermitResult<Url> {
    let (from, to) = window.formatted(date_format);
    let filled = template
        .replace("{from}", &encode_component(&from))
        .replace("{to}", &encode_component(&to));

    Url::parse(&filled).map_err(|e| PermitError::config(format!("Invalid export URL {}: {}", filled, e)))
}

fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
