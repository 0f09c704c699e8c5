use thiserror::Error;

/// Failures raised by the automation surface itself (driver, transport, DOM).
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A waiting lookup ran out of budget without a match
    #[error("Timed out waiting for element: {0}")]
    ElementTimeout(String),

    /// The driver itself gave up (page load, script or command timeout)
    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element is detached from DOM: {0}")]
    ElementDetached(String),

    #[error("Element is not interactable: {0}")]
    ElementNotInteractable(String),

    #[error("WebDriver error '{error}': {message}")]
    WebDriver { error: String, message: String },

    #[error("Driver session is closed: {0}")]
    SessionClosed(String),
}

impl AutomationError {
    /// True when the element simply was not there, as opposed to the page or
    /// the driver failing while looking for it. A driver-side `Timeout` is a
    /// failure, not an absence.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotFound(_) | AutomationError::ElementTimeout(_)
        )
    }
}

/// Which selectable dimension an index referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Site,
    JobCode,
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionKind::Site => write!(f, "site"),
            SelectionKind::JobCode => write!(f, "job code"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TimesaverError {
    /// Credentials did not produce a verified login, the login marker could
    /// not be read, or a view was requested without being logged in.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Selection out of range: {kind} index {index} but only {len} available")]
    SelectionRange {
        kind: SelectionKind,
        index: usize,
        len: usize,
    },

    #[error("Unexpected table shape in {table}: row {row} has {found} cells, header has {expected}")]
    ExtractionShape {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Automation resource unavailable: {0}")]
    Resource(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Password change rejected: {0}")]
    PasswordRejected(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Automation(#[from] AutomationError),
}
