use crate::config::SessionConfig;
use crate::{AutomationError, Element, Selector};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub mod webdriver;

pub use webdriver::WebDriverEngine;

/// How often a waiting lookup re-queries the page
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The common trait that all automation backends must implement.
///
/// Backends only provide single-shot queries; the waiting variants
/// (`find_element`, `find_elements`) poll on top of them until the wait
/// budget runs out, which is how the implicit wait is realised.
pub trait AutomationEngine: Send + Sync {
    /// Load `url` in the controlled browser
    fn navigate(&self, url: &str) -> Result<(), AutomationError>;

    fn current_url(&self) -> Result<String, AutomationError>;

    /// Query the page (or the subtree under `root`) once, without waiting
    fn query_elements(
        &self,
        selector: &Selector,
        root: Option<&Element>,
    ) -> Result<Vec<Element>, AutomationError>;

    /// Run a script in the page and return its JSON result
    fn execute_script(
        &self,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, AutomationError>;

    /// Default wait budget used when a lookup does not pass its own
    fn implicit_wait(&self) -> Duration;

    fn set_implicit_wait(&self, wait: Duration);

    /// Release the underlying browser session. Calling it twice is not an error.
    fn quit(&self) -> Result<(), AutomationError>;

    fn is_closed(&self) -> bool;

    /// Find the first matching element, waiting up to `timeout` (or the implicit wait)
    fn find_element(
        &self,
        selector: &Selector,
        root: Option<&Element>,
        timeout: Option<Duration>,
    ) -> Result<Element, AutomationError> {
        let timeout = timeout.unwrap_or_else(|| self.implicit_wait());
        let mut found = poll(timeout, || self.query_elements(selector, root))?;
        if found.is_empty() {
            return Err(AutomationError::ElementNotFound(format!(
                "{selector} (waited {timeout:?})"
            )));
        }
        Ok(found.swap_remove(0))
    }

    /// Find all matching elements, waiting up to `timeout` for at least one to
    /// appear. An empty result after the wait is not an error.
    fn find_elements(
        &self,
        selector: &Selector,
        root: Option<&Element>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Element>, AutomationError> {
        let timeout = timeout.unwrap_or_else(|| self.implicit_wait());
        poll(timeout, || self.query_elements(selector, root))
    }

    /// Enable downcasting to concrete engine types
    fn as_any(&self) -> &dyn std::any::Any;
}

fn poll<F>(timeout: Duration, mut query: F) -> Result<Vec<Element>, AutomationError>
where
    F: FnMut() -> Result<Vec<Element>, AutomationError>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let found = query()?;
        let elapsed = start.elapsed();
        if !found.is_empty() || elapsed >= timeout {
            if found.is_empty() && attempts > 1 {
                debug!(attempts, ?elapsed, "Lookup gave up waiting");
            }
            return Ok(found);
        }
        thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
    }
}

/// Start the configured browser through its WebDriver server
pub fn create_engine(config: &SessionConfig) -> Result<Arc<dyn AutomationEngine>, AutomationError> {
    let engine = WebDriverEngine::connect(
        &config.webdriver_url,
        config.browser,
        config.headless,
        Duration::from_millis(config.implicit_wait_ms),
    )?;
    Ok(Arc::new(engine))
}
