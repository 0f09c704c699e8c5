//! In-memory stand-in for the timekeeping application, rendered through the
//! `AutomationEngine` seam so sessions can be driven without a browser.

#![allow(dead_code)]

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use timesaver::{
    AutomationEngine, AutomationError, Element, ElementImpl, Selector, ServiceEndpoint, Session,
    SessionConfig,
};

pub const VALID_UID: &str = "jdoe";
pub const VALID_PASSWD: &str = "correct-horse";

const CURRENT: &str = "Current Pay Period";
const PREVIOUS: &str = "Previous Pay Period";
const NEXT: &str = "Next Pay Period";
const DATE_RANGE: &str = "Date Range";

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
pub struct FakeState {
    pub passwd: String,
    pub logged_in: bool,
    pub fields: HashMap<String, String>,
    pub sites: Vec<String>,
    pub site_selected: usize,
    pub job_columns: Vec<String>,
    pub job_codes: Vec<Vec<String>>,
    pub job_selected: usize,
    pub periods: Vec<String>,
    pub period_selected: usize,
    /// Key of the period whose entries are shown
    pub active_period: String,
    pub entry_columns: Vec<String>,
    pub entries: HashMap<String, Vec<Vec<String>>>,
    pub entries_open: bool,
    pub confirm_visible: bool,
    pub dialog_open: bool,
    pub password_error: Option<String>,
    pub punches: usize,
    /// Number of page-level lookups per selector
    pub queries: HashMap<String, usize>,
    pub scripts: Vec<(String, Vec<Value>)>,
    pub navigated: Vec<String>,
    pub quits: usize,
    /// Make every lookup of the login marker fail at the transport level
    pub broken_marker: bool,
    /// Make the driver time out while looking up the login marker
    pub marker_timeout: bool,
    /// Render the login marker with whitespace-only text
    pub blank_marker: bool,
    /// Make navigation fail
    pub broken_navigation: bool,
}

impl FakeState {
    pub fn new() -> Self {
        let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let mut entries = HashMap::new();
        entries.insert(
            CURRENT.to_string(),
            vec![row(&["01/09/2023", "08:00", "16:00", "8.00"])],
        );
        entries.insert(
            PREVIOUS.to_string(),
            vec![
                row(&["01/02/2023", "08:00", "16:00", "8.00"]),
                row(&["01/03/2023", "08:30", "16:00", "7.50"]),
            ],
        );
        entries.insert(NEXT.to_string(), vec![]);

        Self {
            passwd: VALID_PASSWD.to_string(),
            logged_in: false,
            fields: HashMap::new(),
            sites: vec!["Main Office".into(), "Warehouse".into(), "Remote".into()],
            site_selected: 0,
            job_columns: vec!["Code".into(), "Description".into()],
            job_codes: vec![
                row(&["100", "Administration"]),
                row(&["200", "  Shipping  Dock "]),
            ],
            job_selected: 1,
            periods: vec![CURRENT.into(), PREVIOUS.into(), NEXT.into(), DATE_RANGE.into()],
            period_selected: 0,
            active_period: CURRENT.to_string(),
            entry_columns: vec!["Date".into(), "In".into(), "Out".into(), "Hours".into()],
            entries,
            entries_open: false,
            confirm_visible: false,
            dialog_open: false,
            password_error: None,
            punches: 0,
            queries: HashMap::new(),
            scripts: Vec::new(),
            navigated: Vec::new(),
            quits: 0,
            broken_marker: false,
            marker_timeout: false,
            blank_marker: false,
            broken_navigation: false,
        }
    }

    pub fn query_count(&self, selector: &str) -> usize {
        self.queries
            .get(&Selector::from(selector).to_string())
            .copied()
            .unwrap_or(0)
    }

    fn current_entries(&self) -> Vec<Vec<String>> {
        self.entries
            .get(&self.active_period)
            .cloned()
            .unwrap_or_default()
    }

    fn field(&self, id: &str) -> String {
        self.fields.get(id).cloned().unwrap_or_default()
    }

    fn present(&self, id: &str) -> bool {
        match id {
            "username" | "password" | "bttSubmit" => !self.logged_in,
            "lblEmployeeName" | "lnkLogoff" | "ddlSite" | "gvJobCodes" | "ddlPeriod"
            | "txtStartDate" | "txtEndDate" | "btnRefresh" | "tabTimeEntries" | "tabPunch"
            | "btnAddPunch" | "lnkChangePassword" => self.logged_in,
            "gvTimeEntries" | "lblTotalHours" | "lblHourPayCodeTotal"
            | "lblDollarPayCodeTotal" | "lblProjectTotal" | "lblApprovalStatus" => {
                self.logged_in && self.entries_open
            }
            "btnPunchConfirmOk" => self.confirm_visible,
            "txtOldPassword" | "txtNewPassword" | "txtConfirmPassword" | "btnChangePassword" => {
                self.dialog_open
            }
            "lblPasswordError" => self.password_error.is_some(),
            _ => false,
        }
    }
}

impl Default for FakeState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Id(String),
    SiteOption(usize),
    PeriodOption(usize),
    Header { grid: Grid, col: usize },
    /// Row 0 is the header row, which carries no `td` cells
    Row { grid: Grid, row: usize },
    Cell { grid: Grid, row: usize, col: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grid {
    JobCodes,
    Entries,
}

impl Grid {
    fn columns(self, state: &FakeState) -> Vec<String> {
        match self {
            Grid::JobCodes => state.job_columns.clone(),
            Grid::Entries => state.entry_columns.clone(),
        }
    }

    /// Rendered rows: the header row, the data rows, and for entries a
    /// trailing blank separator row.
    fn rendered_rows(self, state: &FakeState) -> Vec<Vec<String>> {
        let mut rows = vec![vec![]];
        match self {
            Grid::JobCodes => rows.extend(state.job_codes.iter().cloned()),
            Grid::Entries => {
                let data = state.current_entries();
                let width = state.entry_columns.len();
                let has_data = !data.is_empty();
                rows.extend(data);
                if has_data {
                    rows.push(vec![String::new(); width]);
                }
            }
        }
        rows
    }
}

type Shared = Arc<Mutex<FakeState>>;

fn element(state: &Shared, node: Node) -> Element {
    Element::new(Box::new(FakeElement {
        node,
        state: state.clone(),
    }))
}

fn query(
    shared: &Shared,
    selector: &Selector,
    root: Option<&Node>,
) -> Result<Vec<Element>, AutomationError> {
    let mut state = shared.lock().unwrap();
    let nodes = match root {
        None => {
            *state.queries.entry(selector.to_string()).or_insert(0) += 1;
            match selector {
                Selector::Id(id) if id == "lblEmployeeName" && state.broken_marker => {
                    return Err(AutomationError::PlatformError(
                        "connection reset by peer".to_string(),
                    ))
                }
                Selector::Id(id) if id == "lblEmployeeName" && state.marker_timeout => {
                    return Err(AutomationError::Timeout("page load timed out".to_string()))
                }
                Selector::Id(id) if state.present(id) => vec![Node::Id(id.clone())],
                Selector::Id(_) => vec![],
                other => {
                    return Err(AutomationError::InvalidSelector(format!(
                        "fake page only resolves ids at top level, got {other}"
                    )))
                }
            }
        }
        Some(root) => children(&state, root, selector),
    };
    drop(state);
    Ok(nodes.into_iter().map(|n| element(shared, n)).collect())
}

fn children(state: &FakeState, root: &Node, selector: &Selector) -> Vec<Node> {
    let tag = |t: &str| matches!(selector, Selector::Tag(s) if s == t);
    let css = |c: &str| matches!(selector, Selector::Css(s) if s == c);
    let grid = match root {
        Node::Id(id) if id == "gvJobCodes" => Some(Grid::JobCodes),
        Node::Id(id) if id == "gvTimeEntries" => Some(Grid::Entries),
        _ => None,
    };

    match (root, grid) {
        (Node::Id(id), _) if id == "ddlSite" && tag("option") => {
            (0..state.sites.len()).map(Node::SiteOption).collect()
        }
        (Node::Id(id), _) if id == "ddlPeriod" && tag("option") => {
            (0..state.periods.len()).map(Node::PeriodOption).collect()
        }
        (_, Some(grid)) if css("tr th") => (0..grid.columns(state).len())
            .map(|col| Node::Header { grid, col })
            .collect(),
        (_, Some(grid)) if css("tr") => (0..grid.rendered_rows(state).len())
            .map(|row| Node::Row { grid, row })
            .collect(),
        (Node::Row { grid, row }, _) if tag("td") => {
            let width = grid
                .rendered_rows(state)
                .get(*row)
                .map(Vec::len)
                .unwrap_or(0);
            (0..width)
                .map(|col| Node::Cell {
                    grid: *grid,
                    row: *row,
                    col,
                })
                .collect()
        }
        _ => vec![],
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    node: Node,
    state: Shared,
}

impl FakeElement {
    fn id(&self) -> Option<&str> {
        match &self.node {
            Node::Id(id) => Some(id),
            _ => None,
        }
    }
}

impl ElementImpl for FakeElement {
    fn handle(&self) -> String {
        format!("{:?}", self.node)
    }

    fn text(&self) -> Result<String, AutomationError> {
        let state = self.state.lock().unwrap();
        let text = match &self.node {
            Node::Id(id) => match id.as_str() {
                "lblEmployeeName" if state.blank_marker => " \u{a0} ".to_string(),
                "lblEmployeeName" => "  Jane Doe ".to_string(),
                "lblTotalHours" => {
                    let total: f64 = state
                        .current_entries()
                        .iter()
                        .filter_map(|r| r.last().and_then(|h| h.parse::<f64>().ok()))
                        .sum();
                    format!("{total:.2}")
                }
                "lblHourPayCodeTotal" | "lblProjectTotal" => "0.00".to_string(),
                "lblDollarPayCodeTotal" => "$0.00".to_string(),
                "lblApprovalStatus" => {
                    if state.active_period == PREVIOUS {
                        "Approved".to_string()
                    } else {
                        "Pending\u{a0}Approval".to_string()
                    }
                }
                "lblPasswordError" => state.password_error.clone().unwrap_or_default(),
                _ => String::new(),
            },
            Node::SiteOption(i) => state.sites[*i].clone(),
            Node::PeriodOption(i) => state.periods[*i].clone(),
            Node::Header { grid, col } => format!(" {} ", grid.columns(&state)[*col]),
            Node::Row { grid, row } => grid.rendered_rows(&state)[*row].join(" "),
            Node::Cell { grid, row, col } => grid.rendered_rows(&state)[*row][*col].clone(),
        };
        Ok(text)
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        let state = self.state.lock().unwrap();
        let value = match (&self.node, name) {
            (Node::SiteOption(i), "selected") => (*i == state.site_selected).then(|| "true".into()),
            (Node::PeriodOption(i), "selected") => {
                (*i == state.period_selected).then(|| "true".into())
            }
            (Node::Row { grid: Grid::JobCodes, row }, "class") => Some(
                if *row > 0 && row - 1 == state.job_selected {
                    "GridRow SelectedRow".to_string()
                } else {
                    "GridRow".to_string()
                },
            ),
            (Node::Id(id), "value") => Some(state.field(id)),
            _ => None,
        };
        Ok(value)
    }

    fn click(&self) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        match &self.node {
            Node::SiteOption(i) => state.site_selected = *i,
            Node::PeriodOption(i) => {
                state.period_selected = *i;
                let label = state.periods[*i].clone();
                if label != DATE_RANGE {
                    state.active_period = label;
                }
            }
            Node::Id(id) => match id.as_str() {
                "bttSubmit" => {
                    state.logged_in =
                        state.field("username") == VALID_UID && state.field("password") == state.passwd;
                }
                "lnkLogoff" => {
                    state.logged_in = false;
                    state.entries_open = false;
                    state.fields.clear();
                }
                "tabTimeEntries" => state.entries_open = true,
                "tabPunch" => state.entries_open = false,
                "btnRefresh" => {
                    state.active_period =
                        format!("{}-{}", state.field("txtStartDate"), state.field("txtEndDate"));
                }
                "btnAddPunch" => {
                    state.punches += 1;
                    state.confirm_visible = true;
                    let key = state.active_period.clone();
                    state.entries.entry(key).or_default().push(vec![
                        "01/10/2023".into(),
                        "09:00".into(),
                        String::new(),
                        String::new(),
                    ]);
                }
                "btnPunchConfirmOk" => state.confirm_visible = false,
                "lnkChangePassword" => {
                    state.dialog_open = true;
                    state.password_error = None;
                }
                "btnChangePassword" => {
                    let new = state.field("txtNewPassword");
                    if state.field("txtOldPassword") != state.passwd {
                        state.password_error = Some("The old password is incorrect.".into());
                    } else if new != state.field("txtConfirmPassword") {
                        state.password_error = Some("Passwords do not match.".into());
                    } else {
                        state.passwd = new;
                        state.dialog_open = false;
                    }
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AutomationError> {
        if let Some(id) = self.id() {
            self.state
                .lock()
                .unwrap()
                .fields
                .insert(id.to_string(), String::new());
        }
        Ok(())
    }

    fn send_text(&self, text: &str) -> Result<(), AutomationError> {
        let id = self.id().ok_or_else(|| {
            AutomationError::ElementNotInteractable(format!("{:?} takes no input", self.node))
        })?;
        self.state
            .lock()
            .unwrap()
            .fields
            .entry(id.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    fn find_element(&self, selector: &Selector) -> Result<Element, AutomationError> {
        self.find_elements(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::ElementNotFound(selector.to_string()))
    }

    fn find_elements(&self, selector: &Selector) -> Result<Vec<Element>, AutomationError> {
        query(&self.state, selector, Some(&self.node))
    }

    fn clone_box(&self) -> Box<dyn ElementImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct FakeBrowser {
    state: Shared,
    wait_ms: AtomicU64,
    closed: AtomicBool,
}

impl FakeBrowser {
    pub fn new(state: Shared) -> Self {
        Self {
            state,
            wait_ms: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }
}

impl AutomationEngine for FakeBrowser {
    fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        if state.broken_navigation {
            return Err(AutomationError::PlatformError(format!(
                "could not resolve {url}"
            )));
        }
        state.navigated.push(url.to_string());
        Ok(())
    }

    fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .navigated
            .last()
            .cloned()
            .unwrap_or_default())
    }

    fn query_elements(
        &self,
        selector: &Selector,
        root: Option<&Element>,
    ) -> Result<Vec<Element>, AutomationError> {
        if self.is_closed() {
            return Err(AutomationError::SessionClosed("fake browser quit".into()));
        }
        let root = match root {
            Some(el) => Some(
                el.as_any()
                    .downcast_ref::<FakeElement>()
                    .ok_or_else(|| AutomationError::InvalidArgument("foreign element".into()))?
                    .node
                    .clone(),
            ),
            None => None,
        };
        query(&self.state, selector, root.as_ref())
    }

    fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, AutomationError> {
        let mut state = self.state.lock().unwrap();
        if script.contains("__doPostBack") {
            if let Some(index) = args
                .get(1)
                .and_then(Value::as_str)
                .and_then(|a| a.strip_prefix("Select$"))
                .and_then(|i| i.parse::<usize>().ok())
            {
                state.job_selected = index;
            }
        }
        state.scripts.push((script.to_string(), args));
        Ok(Value::Null)
    }

    fn implicit_wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms.load(Ordering::SeqCst))
    }

    fn set_implicit_wait(&self, wait: Duration) {
        self.wait_ms.store(wait.as_millis() as u64, Ordering::SeqCst);
    }

    fn quit(&self) -> Result<(), AutomationError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.lock().unwrap().quits += 1;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        implicit_wait_ms: 10,
        login_timeout_ms: 10,
        ..SessionConfig::new(ServiceEndpoint::new(
            "https://timesaver.example.com",
            "v2",
            "KEY",
            "TS",
            "Login.aspx",
        ))
    }
}

/// A fresh fake application and a session opened on it
pub fn open_session() -> (Session, Shared) {
    init_tracing();
    let state: Shared = Arc::new(Mutex::new(FakeState::new()));
    let engine = Arc::new(FakeBrowser::new(state.clone()));
    let session = Session::with_engine(engine, test_config()).expect("session should open");
    (session, state)
}

/// A session that has already logged in with valid credentials
pub fn logged_in_session() -> (Session, Shared) {
    let (mut session, state) = open_session();
    session.set_credentials(VALID_UID, VALID_PASSWD);
    session.authenticate().expect("valid credentials should log in");
    (session, state)
}
