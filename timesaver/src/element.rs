use crate::errors::AutomationError;
use crate::selector::Selector;
use std::fmt::Debug;
use tracing::instrument;

/// Backend-specific element operations. One implementation per automation
/// engine; `Element` is the handle callers work with.
pub trait ElementImpl: Send + Sync + Debug {
    /// Opaque identifier assigned by the engine (e.g. the WebDriver element reference).
    fn handle(&self) -> String;
    /// Rendered text content of the element.
    fn text(&self) -> Result<String, AutomationError>;
    fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError>;
    fn click(&self) -> Result<(), AutomationError>;
    fn clear(&self) -> Result<(), AutomationError>;
    fn send_text(&self, text: &str) -> Result<(), AutomationError>;
    /// Find the first descendant matching the selector, without waiting.
    fn find_element(&self, selector: &Selector) -> Result<Element, AutomationError>;
    /// Find every descendant matching the selector, without waiting.
    fn find_elements(&self, selector: &Selector) -> Result<Vec<Element>, AutomationError>;
    fn clone_box(&self) -> Box<dyn ElementImpl>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Represents an element on the rendered page
#[derive(Debug)]
pub struct Element {
    inner: Box<dyn ElementImpl>,
}

impl Element {
    /// Create a new element from an engine-specific implementation
    pub fn new(impl_: Box<dyn ElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn handle(&self) -> String {
        self.inner.handle()
    }

    /// Get the element's text content
    pub fn text(&self) -> Result<String, AutomationError> {
        self.inner.text()
    }

    /// Text content with surrounding whitespace removed
    pub fn trimmed_text(&self) -> Result<String, AutomationError> {
        Ok(self.inner.text()?.trim().to_string())
    }

    pub fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.inner.attribute(name)
    }

    /// Click on this element
    #[instrument(level = "debug", skip(self))]
    pub fn click(&self) -> Result<(), AutomationError> {
        self.inner.click()
    }

    pub fn clear(&self) -> Result<(), AutomationError> {
        self.inner.clear()
    }

    #[instrument(level = "debug", skip(self, text))]
    pub fn send_text(&self, text: &str) -> Result<(), AutomationError> {
        self.inner.send_text(text)
    }

    /// Clear the field, then type `text` into it
    pub fn fill(&self, text: &str) -> Result<(), AutomationError> {
        self.clear()?;
        self.send_text(text)
    }

    pub fn find_one(&self, selector: impl Into<Selector>) -> Result<Element, AutomationError> {
        self.inner.find_element(&selector.into())
    }

    pub fn find_many(&self, selector: impl Into<Selector>) -> Result<Vec<Element>, AutomationError> {
        self.inner.find_elements(&selector.into())
    }

    /// Whether a select-list option or similar control reports itself as selected
    pub fn is_selected(&self) -> Result<bool, AutomationError> {
        Ok(matches!(
            self.attribute("selected")?.as_deref(),
            Some("true") | Some("selected") | Some("")
        ))
    }

    /// Enable downcasting to the engine-specific implementation
    pub fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle() == other.inner.handle()
    }
}

impl Eq for Element {}
