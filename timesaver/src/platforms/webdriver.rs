use crate::config::Browser;
use crate::element::ElementImpl;
use crate::platforms::AutomationEngine;
use crate::{AutomationError, Element, Selector};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key under which W3C WebDriver serialises element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// One live WebDriver session, shared by the engine and every element handle
#[derive(Debug)]
struct Connection {
    base_url: String,
    session_id: String,
    http: Client,
    closed: AtomicBool,
}

impl Connection {
    fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AutomationError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AutomationError::SessionClosed(format!(
                "session {} already released",
                self.session_id
            )));
        }
        let url = if path.is_empty() {
            format!("{}/session/{}", self.base_url, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.base_url, self.session_id, path)
        };
        send(&self.http, method, &url, body)
    }
}

fn send(
    http: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, AutomationError> {
    debug!(%method, %url, "WebDriver command");
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .map_err(|e| AutomationError::PlatformError(format!("WebDriver request failed: {e}")))?;
    let status = response.status();
    let payload: Value = response.json().map_err(|e| {
        AutomationError::PlatformError(format!("Failed to parse WebDriver response: {e}"))
    })?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(map_error(error, message));
    }
    Ok(value)
}

fn map_error(error: String, message: String) -> AutomationError {
    match error.as_str() {
        "no such element" => AutomationError::ElementNotFound(message),
        "stale element reference" => AutomationError::ElementDetached(message),
        "element not interactable" | "element click intercepted" => {
            AutomationError::ElementNotInteractable(message)
        }
        "invalid selector" => AutomationError::InvalidSelector(message),
        "invalid session id" => AutomationError::SessionClosed(message),
        "timeout" | "script timeout" => AutomationError::Timeout(message),
        _ => AutomationError::WebDriver { error, message },
    }
}

fn capabilities(browser: Browser, headless: bool) -> Value {
    match browser {
        Browser::Firefox => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            json!({ "browserName": "firefox", "moz:firefoxOptions": { "args": args } })
        }
        Browser::Chrome => {
            let args: Vec<&str> = if headless { vec!["--headless=new"] } else { vec![] };
            json!({ "browserName": "chrome", "goog:chromeOptions": { "args": args } })
        }
    }
}

fn parse_elements(value: Value, conn: &Arc<Connection>) -> Result<Vec<Element>, AutomationError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(AutomationError::PlatformError(format!(
                "Expected an element list, got {other}"
            )))
        }
    };
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| {
                    Element::new(Box::new(WebDriverElement {
                        id: id.to_string(),
                        conn: conn.clone(),
                    }))
                })
                .ok_or_else(|| {
                    AutomationError::PlatformError(format!("Malformed element reference: {item}"))
                })
        })
        .collect()
}

fn query(
    conn: &Arc<Connection>,
    path: &str,
    selector: &Selector,
) -> Result<Vec<Element>, AutomationError> {
    let (using, value) = selector.strategy()?;
    let found = conn.command(
        Method::POST,
        path,
        Some(json!({ "using": using, "value": value })),
    )?;
    parse_elements(found, conn)
}

/// W3C WebDriver backend (geckodriver, chromedriver) over blocking HTTP
pub struct WebDriverEngine {
    conn: Arc<Connection>,
    implicit_wait_ms: AtomicU64,
}

impl WebDriverEngine {
    /// Start a new browser session on the WebDriver server at `webdriver_url`
    pub fn connect(
        webdriver_url: &str,
        browser: Browser,
        headless: bool,
        implicit_wait: Duration,
    ) -> Result<Self, AutomationError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                AutomationError::PlatformError(format!("Failed to build http client: {e}"))
            })?;
        let base_url = webdriver_url.trim_end_matches('/').to_string();

        let created = send(
            &http,
            Method::POST,
            &format!("{base_url}/session"),
            Some(json!({ "capabilities": { "alwaysMatch": capabilities(browser, headless) } })),
        )?;
        let session_id = created
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AutomationError::PlatformError(format!("No sessionId in response: {created}"))
            })?
            .to_string();
        info!(%session_id, ?browser, headless, "Started WebDriver session");

        // From here on, dropping the engine releases the browser.
        let engine = Self {
            conn: Arc::new(Connection {
                base_url,
                session_id,
                http,
                closed: AtomicBool::new(false),
            }),
            implicit_wait_ms: AtomicU64::new(implicit_wait.as_millis() as u64),
        };
        // Waiting is done client-side, so the server must answer immediately.
        engine.conn.command(
            Method::POST,
            "timeouts",
            Some(json!({ "implicit": 0 })),
        )?;
        Ok(engine)
    }

    pub fn session_id(&self) -> &str {
        &self.conn.session_id
    }
}

impl AutomationEngine for WebDriverEngine {
    fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        info!(%url, "Navigating");
        self.conn
            .command(Method::POST, "url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn current_url(&self) -> Result<String, AutomationError> {
        let value = self.conn.command(Method::GET, "url", None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn query_elements(
        &self,
        selector: &Selector,
        root: Option<&Element>,
    ) -> Result<Vec<Element>, AutomationError> {
        match root {
            None => query(&self.conn, "elements", selector),
            Some(root) => {
                let root = root
                    .as_any()
                    .downcast_ref::<WebDriverElement>()
                    .ok_or_else(|| {
                        AutomationError::InvalidArgument(
                            "Root element does not belong to a WebDriver session".to_string(),
                        )
                    })?;
                root.query(selector)
            }
        }
    }

    fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, AutomationError> {
        debug!(script_len = script.len(), "Executing script");
        self.conn.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
    }

    fn implicit_wait(&self) -> Duration {
        Duration::from_millis(self.implicit_wait_ms.load(Ordering::SeqCst))
    }

    fn set_implicit_wait(&self, wait: Duration) {
        self.implicit_wait_ms
            .store(wait.as_millis() as u64, Ordering::SeqCst);
    }

    fn quit(&self) -> Result<(), AutomationError> {
        if self.conn.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.conn.command(Method::DELETE, "", None);
        self.conn.closed.store(true, Ordering::SeqCst);
        info!(session_id = %self.conn.session_id, "Released WebDriver session");
        result.map(|_| ())
    }

    fn is_closed(&self) -> bool {
        self.conn.closed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for WebDriverEngine {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!("Failed to release WebDriver session on drop: {}", e);
        }
    }
}

/// Element reference inside a live WebDriver session
#[derive(Debug, Clone)]
pub struct WebDriverElement {
    id: String,
    conn: Arc<Connection>,
}

impl WebDriverElement {
    fn path(&self, suffix: &str) -> String {
        format!("element/{}/{}", self.id, suffix)
    }

    fn query(&self, selector: &Selector) -> Result<Vec<Element>, AutomationError> {
        query(&self.conn, &self.path("elements"), selector)
    }
}

impl ElementImpl for WebDriverElement {
    fn handle(&self) -> String {
        self.id.clone()
    }

    fn text(&self) -> Result<String, AutomationError> {
        let value = self.conn.command(Method::GET, &self.path("text"), None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        let value = self
            .conn
            .command(Method::GET, &self.path(&format!("attribute/{name}")), None)?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    fn click(&self) -> Result<(), AutomationError> {
        self.conn
            .command(Method::POST, &self.path("click"), Some(json!({})))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AutomationError> {
        self.conn
            .command(Method::POST, &self.path("clear"), Some(json!({})))?;
        Ok(())
    }

    fn send_text(&self, text: &str) -> Result<(), AutomationError> {
        self.conn
            .command(Method::POST, &self.path("value"), Some(json!({ "text": text })))?;
        Ok(())
    }

    fn find_element(&self, selector: &Selector) -> Result<Element, AutomationError> {
        let mut found = self.query(selector)?;
        if found.is_empty() {
            return Err(AutomationError::ElementNotFound(format!(
                "{selector} under element {}",
                self.id
            )));
        }
        Ok(found.swap_remove(0))
    }

    fn find_elements(&self, selector: &Selector) -> Result<Vec<Element>, AutomationError> {
        self.query(selector)
    }

    fn clone_box(&self) -> Box<dyn ElementImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
