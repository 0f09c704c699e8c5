use tracing::{debug, instrument};

use crate::element::Element;
use crate::errors::AutomationError;
use crate::platforms::AutomationEngine;
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;

/// A high-level API for finding elements on the rendered page
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn AutomationEngine>,
    selector: Selector,
    timeout: Option<Duration>, // Falls back to the engine's implicit wait
    root: Option<Element>,
}

impl Locator {
    pub fn new(engine: Arc<dyn AutomationEngine>, selector: impl Into<Selector>) -> Self {
        Self {
            engine,
            selector: selector.into(),
            timeout: None,
            root: None,
        }
    }

    /// Set the wait budget for this locator instance.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Restrict the search to descendants of `element`
    pub fn within(mut self, element: Element) -> Self {
        self.root = Some(element);
        self
    }

    /// Wait for the first matching element.
    ///
    /// Not finding anything within the budget is reported as `ElementTimeout`.
    #[instrument(level = "debug", skip(self))]
    pub fn first(&self) -> Result<Element, AutomationError> {
        debug!("Waiting for element matching selector: {}", self.selector);
        let effective_timeout = self.timeout.unwrap_or_else(|| self.engine.implicit_wait());
        self.engine
            .find_element(&self.selector, self.root.as_ref(), Some(effective_timeout))
            .map_err(|e| {
                if let AutomationError::ElementNotFound(inner_msg) = e {
                    AutomationError::ElementTimeout(format!(
                        "{} after {effective_timeout:?}. Original error: {inner_msg}",
                        self.selector
                    ))
                } else {
                    e
                }
            })
    }

    /// Get all matching elements, waiting for at least one to show up.
    /// An empty list is a valid answer.
    pub fn all(&self) -> Result<Vec<Element>, AutomationError> {
        self.engine
            .find_elements(&self.selector, self.root.as_ref(), self.timeout)
    }

    /// Get all matching elements as they are right now, without waiting.
    pub fn now(&self) -> Result<Vec<Element>, AutomationError> {
        self.engine.query_elements(&self.selector, self.root.as_ref())
    }

    /// Get a nested locator rooted at the first match of this one
    pub fn locator(&self, selector: impl Into<Selector>) -> Result<Locator, AutomationError> {
        let root = self.first()?;
        Ok(Locator {
            engine: self.engine.clone(),
            selector: selector.into(),
            timeout: self.timeout,
            root: Some(root),
        })
    }
}
