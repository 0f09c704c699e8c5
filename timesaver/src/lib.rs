//! Client for a browser-rendered timekeeping application
//!
//! The application is only reachable through a browser, so this crate drives
//! one (through a W3C WebDriver server) and turns its pages into a stateful
//! [`Session`]: log in, read the timecard, punch, change the password.
//!
//! ```no_run
//! use timesaver::{Period, ServiceEndpoint, Session, SessionConfig};
//!
//! let endpoint = ServiceEndpoint::new("timesaver.example.com", "v2", "KEY", "TS", "Login.aspx");
//! let mut session = Session::open(SessionConfig::new(endpoint))?;
//! session.set_credentials("jdoe", "secret");
//! session.authenticate()?;
//! session.select_period(Period::Previous)?;
//! for row in session.timetable()?.iter() {
//!     println!("{:?}", row.get("Date"));
//! }
//! session.close()?;
//! # Ok::<(), timesaver::TimesaverError>(())
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod element;
pub mod endpoint;
pub mod errors;
pub mod locator;
pub mod models;
pub mod pages;
pub mod platforms;
pub mod selector;
pub mod session;
pub mod table;

pub use auth::{AuthState, Credentials};
pub use cache::{Mutation, View};
pub use config::{Browser, SessionConfig};
pub use element::{Element, ElementImpl};
pub use endpoint::ServiceEndpoint;
pub use errors::{AutomationError, SelectionKind, TimesaverError};
pub use locator::Locator;
pub use models::{ApprovalStatus, DateRange, JobCodes, Period, PeriodOptions, Sites, Totals};
pub use platforms::AutomationEngine;
pub use selector::Selector;
pub use session::Session;
pub use table::{Row, Table};

/// Alias used for the time-entries view
pub type Timetable = Table;
