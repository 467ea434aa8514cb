//! Connection settings for the Nautobot REST API.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of results requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// How to reach and authenticate against a Nautobot instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://nautobot.example.com`.
    pub url: String,
    /// API token sent as `Authorization: Token <token>`.
    pub token: String,
    /// Verify TLS certificates.
    pub validate_certs: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `limit` sent with list queries.
    pub page_size: u32,
}

impl ClientConfig {
    /// Creates a config with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            validate_certs: true,
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets whether TLS certificates are verified.
    #[must_use]
    pub fn with_validate_certs(mut self, validate: bool) -> Self {
        self.validate_certs = validate;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the page size of list queries.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Checks the settings and returns the parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` for an empty token, a zero page
    /// size, or a URL that does not parse or is not http(s).
    pub fn validate(&self) -> Result<Url, ClientError> {
        if self.token.trim().is_empty() {
            return Err(ClientError::invalid_config("API token must not be empty"));
        }
        if self.page_size == 0 {
            return Err(ClientError::invalid_config("page size must be at least 1"));
        }
        let url = Url::parse(self.url.trim())
            .map_err(|e| ClientError::invalid_config(format!("invalid url {:?}: {e}", self.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ClientError::invalid_config(format!(
                "unsupported url scheme {scheme}, expected http or https"
            ))),
        }
    }
}
