use thiserror::Error;

/// Error types for the county permit scraper
#[derive(Error, Debug)]
pub enum PermitError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Invalid configuration file: {path}: {message}")]
    InvalidConfig { path: String, message: String },

    // Navigation errors
    #[error("Timed out after {waited_secs}s waiting for {locator}")]
    NavigationTimeout { locator: String, waited_secs: u64 },

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Injected search dates were not applied: expected {expected}, found {actual}")]
    DateInjection { expected: String, actual: String },

    // Browser session errors
    #[error("Browser session error: {message}")]
    Session { message: String },

    // Network errors
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("HTTP request failed: {url} - {status}")]
    HttpRequest { url: String, status: u16 },

    // Extraction errors
    #[error("Extraction error: {message}")]
    Extraction { message: String },

    // Export errors
    #[error("Export error: {message}")]
    Export { message: String },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PermitError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a browser session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session { message: message.into() }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction { message: message.into() }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export { message: message.into() }
    }

    /// Configuration problems abort the run before any county is attempted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::ConfigNotFound { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::ConfigNotFound { .. } | Self::InvalidConfig { .. } => {
                "configuration"
            }
            Self::NavigationTimeout { .. } | Self::ElementNotFound { .. } | Self::DateInjection { .. } => {
                "navigation"
            }
            Self::Session { .. } => "session",
            Self::Network { .. } | Self::HttpRequest { .. } => "network",
            Self::Extraction { .. } => "extraction",
            Self::Export { .. } | Self::Csv(_) | Self::Io(_) => "export",
        }
    }
}

impl From<reqwest::Error> for PermitError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::HttpRequest {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => Self::Network { message: err.to_string() },
        }
    }
}

/// Result type alias for the permit scraper
pub type PermitResult<T> = std::result::Result<T, PermitError>;
