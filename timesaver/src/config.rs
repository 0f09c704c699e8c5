use crate::endpoint::ServiceEndpoint;
use crate::errors::TimesaverError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

const DEFAULT_WEBDRIVER_URL: &str = "http://127.0.0.1:4444";

/// Browser started through the WebDriver server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Firefox,
    Chrome,
}

impl FromStr for Browser {
    type Err = TimesaverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firefox" | "gecko" => Ok(Browser::Firefox),
            "chrome" | "chromium" => Ok(Browser::Chrome),
            other => Err(TimesaverError::Config(format!("Unknown browser '{other}'"))),
        }
    }
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_headless() -> bool {
    true
}

fn default_implicit_wait_ms() -> u64 {
    5_000
}

fn default_login_timeout_ms() -> u64 {
    10_000
}

/// Everything needed to open a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub endpoint: ServiceEndpoint,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub browser: Browser,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Default wait for an element to render, in milliseconds
    #[serde(default = "default_implicit_wait_ms")]
    pub implicit_wait_ms: u64,
    /// How long to wait for the logged-in marker after submitting credentials
    #[serde(default = "default_login_timeout_ms")]
    pub login_timeout_ms: u64,
    /// Selector overriding the built-in logged-in marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_marker: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: ServiceEndpoint::default(),
            webdriver_url: default_webdriver_url(),
            browser: Browser::default(),
            headless: default_headless(),
            implicit_wait_ms: default_implicit_wait_ms(),
            login_timeout_ms: default_login_timeout_ms(),
            login_marker: None,
        }
    }
}

impl SessionConfig {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TimesaverError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TimesaverError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, TimesaverError> {
        serde_json::from_str(raw)
            .map_err(|e| TimesaverError::Config(format!("Invalid configuration: {e}")))
    }

    /// Defaults overlaid with `TIMESAVER_*` environment variables
    pub fn from_env() -> Result<Self, TimesaverError> {
        Self::default().with_env()
    }

    /// Overlay `TIMESAVER_*` environment variables on this configuration
    pub fn with_env(self) -> Result<Self, TimesaverError> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars<F>(mut self, var: F) -> Result<Self, TimesaverError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.endpoint = self.endpoint.with_overrides(
            var("TIMESAVER_HOST"),
            var("TIMESAVER_VERSION"),
            var("TIMESAVER_ACCESS_KEY"),
            var("TIMESAVER_PRODUCT"),
            var("TIMESAVER_ENTRY_PAGE"),
        );
        if let Some(url) = var("TIMESAVER_WEBDRIVER_URL") {
            self.webdriver_url = url;
        }
        if let Some(browser) = var("TIMESAVER_BROWSER") {
            self.browser = browser.parse()?;
        }
        if let Some(headless) = var("TIMESAVER_HEADLESS") {
            self.headless = parse_bool(&headless)?;
        }
        if let Some(wait) = var("TIMESAVER_IMPLICIT_WAIT_MS") {
            self.implicit_wait_ms = wait.trim().parse().map_err(|e| {
                TimesaverError::Config(format!("TIMESAVER_IMPLICIT_WAIT_MS '{wait}': {e}"))
            })?;
        }
        if let Some(marker) = var("TIMESAVER_LOGIN_MARKER") {
            self.login_marker = Some(marker);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), TimesaverError> {
        if self.endpoint.host().trim().is_empty() {
            return Err(TimesaverError::Config(
                "endpoint host is required (set TIMESAVER_HOST)".to_string(),
            ));
        }
        if self.webdriver_url.trim().is_empty() {
            return Err(TimesaverError::Config(
                "webdriver_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Result<bool, TimesaverError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TimesaverError::Config(format!("Expected a boolean, got '{other}'"))),
    }
}
