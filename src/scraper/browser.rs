use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::config::Viewport;
use crate::error::PermitResult;

/// How a navigation step finds an element on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementLocator {
    Css(String),
    LinkText(String),
    PartialLinkText(String),
    ButtonText(String),
}

impl ElementLocator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::PartialLinkText(text.into())
    }

    pub fn button_text(text: impl Into<String>) -> Self {
        Self::ButtonText(text.into())
    }

    /// CSS selector, when the locator is one
    pub fn as_css(&self) -> Option<&str> {
        match self {
            Self::Css(selector) => Some(selector),
            _ => None,
        }
    }

    /// XPath equivalent for text-based locators
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Self::Css(_) => None,
            Self::LinkText(text) => Some(format!("//a[normalize-space(.)={}]", xpath_literal(text))),
            Self::PartialLinkText(text) => {
                Some(format!("//a[contains(normalize-space(.), {})]", xpath_literal(text)))
            }
            Self::ButtonText(text) => Some(format!("//button[normalize-space(.)={}]", xpath_literal(text))),
        }
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css `{}`", selector),
            Self::LinkText(text) => write!(f, "link text `{}`", text),
            Self::PartialLinkText(text) => write!(f, "partial link text `{}`", text),
            Self::ButtonText(text) => write!(f, "button text `{}`", text),
        }
    }
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|part| format!("'{}'", part)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Identity and limits for one browser session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub user_agent: String,
    pub viewport: Viewport,
    /// Bounded wait applied to every element lookup
    pub element_timeout: Duration,
    /// Bound on navigation and other tab operations without their own wait
    pub page_load_timeout: Duration,
    pub headless: bool,
}

/// Browser-automation capability used by the navigation drivers.
///
/// Every lookup is bounded by a timeout; nothing here retries.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> PermitResult<()>;

    /// Wait until the element is present, failing with `NavigationTimeout`
    async fn wait_for(&self, locator: &ElementLocator, timeout: Duration) -> PermitResult<()>;

    async fn click(&self, locator: &ElementLocator) -> PermitResult<()>;

    /// Clear an input and type `text` into it
    async fn clear_and_type(&self, locator: &ElementLocator, text: &str) -> PermitResult<()>;

    /// Evaluate a script expression, returning its value as JSON
    async fn execute_script(&self, script: &str) -> PermitResult<serde_json::Value>;

    async fn page_source(&self) -> PermitResult<String>;

    /// Release the browser process. Safe to call more than once.
    async fn close(&self) -> PermitResult<()>;
}

/// Produces fresh sessions, one per scrape attempt
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(&self, settings: &SessionSettings) -> PermitResult<Box<dyn BrowserSession>>;
}

#[cfg(feature = "browser")]
pub use chrome::{ChromeSession, ChromeSessionFactory};

#[cfg(feature = "browser")]
mod chrome {
    use async_trait::async_trait;
    use headless_chrome::{Browser, Element, LaunchOptions, Tab};
    use std::ffi::OsString;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::{debug, warn};

    use super::{BrowserSession, ElementLocator, SessionFactory, SessionSettings};
    use crate::error::{PermitError, PermitResult};

    /// Launches headless Chrome through the DevTools protocol
    #[derive(Debug, Default, Clone)]
    pub struct ChromeSessionFactory;

    impl ChromeSessionFactory {
        pub fn new() -> Self {
            Self
        }

        fn launch(settings: &SessionSettings) -> PermitResult<ChromeSession> {
            let user_agent_arg = OsString::from(format!("--user-agent={}", settings.user_agent));
            let shm_arg = OsString::from("--disable-dev-shm-usage");

            let options = LaunchOptions::default_builder()
                .headless(settings.headless)
                .sandbox(false)
                .window_size(Some((settings.viewport.width, settings.viewport.height)))
                .args(vec![user_agent_arg.as_os_str(), shm_arg.as_os_str()])
                .build()
                .map_err(|e| PermitError::session(format!("Invalid launch options: {}", e)))?;

            let browser = Browser::new(options)
                .map_err(|e| PermitError::session(format!("Failed to launch browser: {}", e)))?;

            let tab = browser
                .new_tab()
                .map_err(|e| PermitError::session(format!("Failed to open tab: {}", e)))?;

            // Some agents ignore the launch flag, so override through DevTools too
            tab.set_user_agent(&settings.user_agent, None, None)
                .map_err(|e| PermitError::session(format!("Failed to override user agent: {}", e)))?;
            tab.set_default_timeout(settings.page_load_timeout);

            Ok(ChromeSession {
                browser: Mutex::new(Some(browser)),
                tab,
                element_timeout: settings.element_timeout,
            })
        }
    }

    #[async_trait]
    impl SessionFactory for ChromeSessionFactory {
        async fn create_session(&self, settings: &SessionSettings) -> PermitResult<Box<dyn BrowserSession>> {
            debug!("Launching headless browser");
            let settings = settings.clone();
            let session = tokio::task::spawn_blocking(move || Self::launch(&settings))
                .await
                .map_err(|e| PermitError::session(format!("Browser launch task failed: {}", e)))??;
            Ok(Box::new(session))
        }
    }

    /// One Chrome process with a single tab. Dropping it kills the process.
    pub struct ChromeSession {
        browser: Mutex<Option<Browser>>,
        tab: Arc<Tab>,
        element_timeout: Duration,
    }

    fn locate<'a>(tab: &'a Tab, locator: &ElementLocator, timeout: Duration) -> Option<Element<'a>> {
        let found = match (locator.as_css(), locator.to_xpath()) {
            (Some(css), _) => tab.wait_for_element_with_custom_timeout(css, timeout),
            (None, Some(xpath)) => tab.wait_for_xpath_with_custom_timeout(&xpath, timeout),
            (None, None) => return None,
        };
        found.ok()
    }

    fn not_found(locator: &ElementLocator) -> PermitError {
        PermitError::ElementNotFound { locator: locator.to_string() }
    }

    impl ChromeSession {
        async fn on_tab<T, F>(&self, op: F) -> PermitResult<T>
        where
            T: Send + 'static,
            F: FnOnce(&Tab, Duration) -> PermitResult<T> + Send + 'static,
        {
            let tab = self.tab.clone();
            let timeout = self.element_timeout;
            tokio::task::spawn_blocking(move || op(&*tab, timeout))
                .await
                .map_err(|e| PermitError::session(format!("Browser task failed: {}", e)))?
        }
    }

    #[async_trait]
    impl BrowserSession for ChromeSession {
        async fn goto(&self, url: &str) -> PermitResult<()> {
            let url = url.to_string();
            self.on_tab(move |tab, _| {
                tab.navigate_to(&url)
                    .and_then(|tab| tab.wait_until_navigated())
                    .map(|_| ())
                    .map_err(|e| PermitError::session(format!("Failed to load {}: {}", url, e)))
            })
            .await
        }

        async fn wait_for(&self, locator: &ElementLocator, timeout: Duration) -> PermitResult<()> {
            let locator = locator.clone();
            self.on_tab(move |tab, _| {
                locate(tab, &locator, timeout).map(|_| ()).ok_or_else(|| PermitError::NavigationTimeout {
                    locator: locator.to_string(),
                    waited_secs: timeout.as_secs(),
                })
            })
            .await
        }

        async fn click(&self, locator: &ElementLocator) -> PermitResult<()> {
            let locator = locator.clone();
            self.on_tab(move |tab, timeout| {
                let element = locate(tab, &locator, timeout).ok_or_else(|| not_found(&locator))?;
                element
                    .click()
                    .map(|_| ())
                    .map_err(|e| PermitError::session(format!("Failed to click {}: {}", locator, e)))
            })
            .await
        }

        async fn clear_and_type(&self, locator: &ElementLocator, text: &str) -> PermitResult<()> {
            let locator = locator.clone();
            let text = text.to_string();
            self.on_tab(move |tab, timeout| {
                let element = locate(tab, &locator, timeout).ok_or_else(|| not_found(&locator))?;
                element
                    .call_js_fn("function() { this.value = ''; }", vec![], false)
                    .map_err(|e| PermitError::session(format!("Failed to clear {}: {}", locator, e)))?;
                element
                    .type_into(&text)
                    .map(|_| ())
                    .map_err(|e| PermitError::session(format!("Failed to type into {}: {}", locator, e)))
            })
            .await
        }

        async fn execute_script(&self, script: &str) -> PermitResult<serde_json::Value> {
            let script = script.to_string();
            self.on_tab(move |tab, _| {
                let result = tab
                    .evaluate(&script, false)
                    .map_err(|e| PermitError::session(format!("Script failed: {}", e)))?;
                Ok(result.value.unwrap_or(serde_json::Value::Null))
            })
            .await
        }

        async fn page_source(&self) -> PermitResult<String> {
            self.on_tab(|tab, _| {
                tab.get_content()
                    .map_err(|e| PermitError::session(format!("Failed to read page source: {}", e)))
            })
            .await
        }

        async fn close(&self) -> PermitResult<()> {
            let browser = match self.browser.lock() {
                Ok(mut guard) => guard.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            };

            if let Some(browser) = browser {
                let tab = self.tab.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = tab.close(true) {
                        warn!("Failed to close tab cleanly: {}", e);
                    }
                    drop(browser);
                })
                .await
                .map_err(|e| PermitError::session(format!("Browser shutdown task failed: {}", e)))?;
                debug!("Browser session closed");
            }

            Ok(())
        }
    }
}

// Stub implementation when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[derive(Debug, Default, Clone)]
pub struct ChromeSessionFactory;

#[cfg(not(feature = "browser"))]
impl ChromeSessionFactory {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn create_session(&self, _settings: &SessionSettings) -> PermitResult<Box<dyn BrowserSession>> {
        Err(crate::error::PermitError::session("Browser feature not enabled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_locators_become_xpath() {
        assert_eq!(
            ElementLocator::link_text("Advanced Search").to_xpath().unwrap(),
            "//a[normalize-space(.)='Advanced Search']"
        );
        assert_eq!(
            ElementLocator::partial_link_text("Search").to_xpath().unwrap(),
            "//a[contains(normalize-space(.), 'Search')]"
        );
        assert_eq!(
            ElementLocator::button_text("Search").to_xpath().unwrap(),
            "//button[normalize-space(.)='Search']"
        );
        assert!(ElementLocator::css("#fromDate").to_xpath().is_none());
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("Search"), "'Search'");
        assert_eq!(xpath_literal("Owner's Search"), "\"Owner's Search\"");
        assert_eq!(
            xpath_literal(r#"Owner's "Quick" Search"#),
            r#"concat('Owner', "'", 's "Quick" Search')"#
        );
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(ElementLocator::css("#submit").to_string(), "css `#submit`");
        assert_eq!(ElementLocator::button_text("Search").to_string(), "button text `Search`");
    }
}
