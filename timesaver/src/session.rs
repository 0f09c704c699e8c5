use crate::auth::{AuthState, Credentials};
use crate::cache::{Mutation, View, ViewCache};
use crate::config::SessionConfig;
use crate::element::Element;
use crate::locator::Locator;
use crate::models::{ApprovalStatus, JobCodes, Period, PeriodOptions, Sites, Totals};
use crate::pages::{self, login, password, punch, timecard};
use crate::platforms::{self, AutomationEngine};
use crate::table::{normalize_text, scrape_table, scrape_table_marked, Table};
use crate::{AutomationError, SelectionKind, TimesaverError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A logged-in (or about to be) conversation with the timekeeping application.
///
/// The session owns exactly one automation engine for its whole lifetime and
/// releases it in [`Session::close`], which also runs on drop. Every read is
/// memoized until an action that affects it is performed.
pub struct Session {
    engine: Option<Arc<dyn AutomationEngine>>,
    config: SessionConfig,
    base_url: String,
    credentials: Option<Credentials>,
    state: AuthState,
    period: Period,
    cache: ViewCache,
}

impl Session {
    /// Start a browser through the configured WebDriver server and load the
    /// application's entry page.
    #[instrument(skip(config), fields(endpoint = %config.endpoint))]
    pub fn open(config: SessionConfig) -> Result<Self, TimesaverError> {
        config.validate()?;
        let engine = platforms::create_engine(&config).map_err(|e| {
            TimesaverError::Resource(format!(
                "could not start a browser via {}: {e}",
                config.webdriver_url
            ))
        })?;
        Self::with_engine(engine, config)
    }

    /// Build a session over an already acquired engine. The engine is
    /// released again if loading the entry page fails.
    pub fn with_engine(
        engine: Arc<dyn AutomationEngine>,
        config: SessionConfig,
    ) -> Result<Self, TimesaverError> {
        engine.set_implicit_wait(Duration::from_millis(config.implicit_wait_ms));
        let base_url = config.endpoint.url();
        let session = Self {
            engine: Some(engine),
            config,
            base_url,
            credentials: None,
            state: AuthState::Unauthenticated,
            period: Period::Current,
            cache: ViewCache::default(),
        };
        session.engine()?.navigate(&session.base_url)?;
        info!(url = %session.base_url, "Session opened");
        Ok(session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn is_closed(&self) -> bool {
        self.engine.as_ref().map_or(true, |e| e.is_closed())
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The period the views are currently scoped to
    pub fn selected_period(&self) -> Period {
        self.period
    }

    /// How many times a view has been read from the remote UI
    pub fn fetch_count(&self, view: View) -> u64 {
        self.cache.fetches(view)
    }

    fn engine(&self) -> Result<&Arc<dyn AutomationEngine>, TimesaverError> {
        match &self.engine {
            Some(engine) if !engine.is_closed() => Ok(engine),
            _ => Err(TimesaverError::Resource(
                "the session has been closed".to_string(),
            )),
        }
    }

    fn locator(&self, selector: &str) -> Result<Locator, TimesaverError> {
        Ok(Locator::new(self.engine()?.clone(), selector))
    }

    fn find(&self, selector: &str) -> Result<Element, TimesaverError> {
        Ok(self.locator(selector)?.first()?)
    }

    fn click(&self, selector: &str) -> Result<(), TimesaverError> {
        Ok(self.find(selector)?.click()?)
    }

    fn fill(&self, selector: &str, text: &str) -> Result<(), TimesaverError> {
        Ok(self.find(selector)?.fill(text)?)
    }

    /// Options of the select-list at `select`, waiting for them to render
    fn options_of(&self, select: &str) -> Result<Vec<Element>, TimesaverError> {
        Ok(self.locator(select)?.locator(pages::OPTION)?.all()?)
    }

    fn read_text(&self, selector: &str) -> Result<String, TimesaverError> {
        Ok(normalize_text(&self.find(selector)?.text()?))
    }

    fn ensure_authenticated(&self) -> Result<(), TimesaverError> {
        self.engine()?;
        if !self.state.is_authenticated() {
            return Err(TimesaverError::Authentication(format!(
                "the session is {}; log in first",
                self.state
            )));
        }
        Ok(())
    }

    // ---- authentication ----

    /// Store the credentials used by the next [`Session::authenticate`].
    /// Nothing is sent to the remote system.
    #[instrument(skip(self, uid, passwd))]
    pub fn set_credentials(&mut self, uid: impl Into<String>, passwd: impl Into<String>) {
        let credentials = Credentials::new(uid, passwd);
        debug!(uid = credentials.uid(), "Credentials set");
        self.credentials = Some(credentials);
    }

    /// Submit the stored credentials and verify that the login took.
    #[instrument(skip(self))]
    pub fn authenticate(&mut self) -> Result<(), TimesaverError> {
        self.engine()?;
        if !self.state.can_authenticate() {
            return Err(TimesaverError::InvalidState(format!(
                "cannot log in while {}",
                self.state
            )));
        }
        let credentials = self.credentials.clone().ok_or_else(|| {
            TimesaverError::Authentication("no credentials have been set".to_string())
        })?;

        self.state = AuthState::Authenticating;
        let outcome = self
            .submit_login(&credentials)
            .and_then(|_| self.verify_login());

        match outcome {
            Ok(true) => {
                self.state = AuthState::Authenticated;
                info!(uid = credentials.uid(), "Logged in");
                Ok(())
            }
            Ok(false) => {
                self.state = AuthState::Failed;
                warn!(uid = credentials.uid(), "Login was not accepted");
                Err(TimesaverError::Authentication(format!(
                    "login was not accepted for user '{}'",
                    credentials.uid()
                )))
            }
            Err(e) => {
                self.state = AuthState::Failed;
                warn!(uid = credentials.uid(), "Login failed: {}", e);
                Err(match e {
                    TimesaverError::Automation(inner) => TimesaverError::Authentication(
                        format!("could not submit the login form: {inner}"),
                    ),
                    other => other,
                })
            }
        }
    }

    fn submit_login(&self, credentials: &Credentials) -> Result<(), TimesaverError> {
        self.fill(login::USERNAME, credentials.uid())?;
        self.fill(login::PASSWORD, credentials.passwd())?;
        self.click(login::SUBMIT)
    }

    /// Whether the page shows the logged-in marker.
    ///
    /// An absent or empty marker is `Ok(false)`. Only a failure to read the
    /// page at all is an error.
    #[instrument(skip(self))]
    pub fn verify_login(&self) -> Result<bool, TimesaverError> {
        let marker = self
            .config
            .login_marker
            .as_deref()
            .unwrap_or(login::LOGGED_IN_MARKER);
        let locator = self
            .locator(marker)?
            .set_default_timeout(Duration::from_millis(self.config.login_timeout_ms));

        let element = match locator.first() {
            Ok(element) => element,
            Err(e) if e.is_not_found() => {
                debug!(marker, "Login marker absent");
                return Ok(false);
            }
            Err(e) => return Err(marker_error(e)),
        };
        match element.text() {
            Ok(text) => Ok(!text.trim().is_empty()),
            Err(AutomationError::ElementDetached(_)) => Ok(false),
            Err(e) => Err(marker_error(e)),
        }
    }

    /// Log off. Does nothing unless logged in.
    #[instrument(skip(self))]
    pub fn logoff(&mut self) -> Result<(), TimesaverError> {
        if !self.state.is_authenticated() {
            debug!(state = %self.state, "Not logged in, nothing to log off");
            return Ok(());
        }
        self.click(login::LOGOFF)?;
        self.state = AuthState::Unauthenticated;
        self.period = Period::Current;
        self.cache.apply(Mutation::Logoff);
        info!("Logged off");
        Ok(())
    }

    /// Log off (best effort) and release the browser. Safe to call twice.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<(), TimesaverError> {
        if self.engine.is_none() {
            return Ok(());
        }
        if let Err(e) = self.logoff() {
            warn!("Logoff during close failed: {}", e);
        }
        self.state = AuthState::Unauthenticated;
        self.cache.apply(Mutation::Logoff);

        let Some(engine) = self.engine.take() else {
            return Ok(());
        };
        engine
            .quit()
            .map_err(|e| TimesaverError::Resource(format!("failed to release the browser: {e}")))?;
        info!("Session closed");
        Ok(())
    }

    // ---- cached views ----

    /// Work sites offered by the site selector
    #[instrument(skip(self))]
    pub fn sites(&mut self) -> Result<Arc<Sites>, TimesaverError> {
        self.ensure_authenticated()?;
        if let Some(sites) = self.cache.sites.peek() {
            return Ok(sites);
        }
        let sites = self.read_sites()?;
        Ok(self.cache.sites.store(sites))
    }

    fn read_sites(&self) -> Result<Sites, TimesaverError> {
        let options = self.options_of(timecard::SITE_SELECT)?;
        let mut labels = Vec::with_capacity(options.len());
        let mut selected = None;
        for (i, option) in options.iter().enumerate() {
            labels.push(normalize_text(&option.text()?));
            if selected.is_none() && option.is_selected()? {
                selected = Some(i);
            }
        }
        // A single-select list with nothing marked shows its first option.
        Ok(Sites::new(labels, selected.unwrap_or(0)))
    }

    /// Job codes offered by the job-code grid
    #[instrument(skip(self))]
    pub fn job_codes(&mut self) -> Result<Arc<JobCodes>, TimesaverError> {
        self.ensure_authenticated()?;
        if let Some(codes) = self.cache.job_codes.peek() {
            return Ok(codes);
        }
        let codes = self.read_job_codes()?;
        Ok(self.cache.job_codes.store(codes))
    }

    fn read_job_codes(&self) -> Result<JobCodes, TimesaverError> {
        let grid = self.find(timecard::JOB_CODE_GRID)?;
        let (table, selected) =
            scrape_table_marked(&grid, &timecard::JOB_CODE_LAYOUT, |row| {
                Ok(row.attribute("class")?.is_some_and(|class| {
                    class
                        .to_lowercase()
                        .contains(timecard::JOB_CODE_SELECTED_CLASS)
                }))
            })?;
        Ok(JobCodes::new(table, selected.unwrap_or(0)))
    }

    /// Options of the period selector
    #[instrument(skip(self))]
    pub fn periods(&mut self) -> Result<Arc<PeriodOptions>, TimesaverError> {
        self.ensure_authenticated()?;
        if let Some(periods) = self.cache.periods.peek() {
            return Ok(periods);
        }
        let periods = self.read_periods()?;
        Ok(self.cache.periods.store(periods))
    }

    fn read_periods(&self) -> Result<PeriodOptions, TimesaverError> {
        let options = self.options_of(timecard::PERIOD_SELECT)?;
        let mut labels = Vec::with_capacity(options.len());
        let mut selected = None;
        for option in &options {
            let label = normalize_text(&option.text()?);
            if selected.is_none() && option.is_selected()? {
                selected = Some(label.clone());
            }
            labels.push(label);
        }
        Ok(PeriodOptions { labels, selected })
    }

    /// Time entries of the selected period. May be empty.
    #[instrument(skip(self))]
    pub fn timetable(&mut self) -> Result<Arc<Table>, TimesaverError> {
        self.ensure_authenticated()?;
        if let Some(table) = self.cache.timetable.peek() {
            return Ok(table);
        }
        self.open_time_entries()?;
        let grid = self.find(timecard::TIME_ENTRIES_TABLE)?;
        let table = scrape_table(&grid, &timecard::TIME_ENTRIES_LAYOUT)?;
        info!(period = %self.period, rows = table.len(), "Read timetable");
        Ok(self.cache.timetable.store(table))
    }

    /// Hour and pay totals of the selected period
    #[instrument(skip(self))]
    pub fn totals(&mut self) -> Result<Arc<Totals>, TimesaverError> {
        self.ensure_authenticated()?;
        if let Some(totals) = self.cache.totals.peek() {
            return Ok(totals);
        }
        self.open_time_entries()?;
        let totals = Totals {
            total_hours: self.read_text(timecard::TOTAL_HOURS)?,
            hour_pay_code_total: self.read_text(timecard::HOUR_PAY_CODE_TOTAL)?,
            dollar_pay_code_total: self.read_text(timecard::DOLLAR_PAY_CODE_TOTAL)?,
            project_total: self.read_text(timecard::PROJECT_TOTAL)?,
        };
        Ok(self.cache.totals.store(totals))
    }

    /// Approval state of the timecard for the selected period
    #[instrument(skip(self))]
    pub fn approval_status(&mut self) -> Result<Arc<ApprovalStatus>, TimesaverError> {
        self.ensure_authenticated()?;
        if let Some(status) = self.cache.approval.peek() {
            return Ok(status);
        }
        self.open_time_entries()?;
        let status = ApprovalStatus {
            label: self.read_text(timecard::APPROVAL_STATUS)?,
        };
        Ok(self.cache.approval.store(status))
    }

    fn open_time_entries(&self) -> Result<(), TimesaverError> {
        self.click(timecard::TIME_ENTRIES_TAB)
    }

    // ---- selection and mutation ----

    /// Pick the work site at `index` in the site list.
    #[instrument(skip(self))]
    pub fn select_site(&mut self, index: usize) -> Result<(), TimesaverError> {
        let sites = self.sites()?;
        if index >= sites.len() {
            return Err(TimesaverError::SelectionRange {
                kind: SelectionKind::Site,
                index,
                len: sites.len(),
            });
        }
        let options = self.options_of(timecard::SITE_SELECT)?;
        let option = options.get(index).ok_or_else(|| {
            AutomationError::ElementNotFound(format!(
                "site option {index} vanished from {}",
                timecard::SITE_SELECT
            ))
        })?;
        option.click()?;

        self.cache.sites.replace(sites.with_selected(index));
        self.cache.apply(Mutation::SelectSite);
        info!(index, site = sites.labels()[index].as_str(), "Selected site");
        Ok(())
    }

    /// Pick the job code at `index` through the grid's row postback.
    #[instrument(skip(self))]
    pub fn select_job_code(&mut self, index: usize) -> Result<(), TimesaverError> {
        let codes = self.job_codes()?;
        if index >= codes.len() {
            return Err(TimesaverError::SelectionRange {
                kind: SelectionKind::JobCode,
                index,
                len: codes.len(),
            });
        }
        self.engine()?.execute_script(
            timecard::JOB_CODE_SELECT_SCRIPT,
            vec![
                timecard::JOB_CODE_POSTBACK_TARGET.into(),
                timecard::job_code_postback_argument(index).into(),
            ],
        )?;

        self.cache.job_codes.replace(codes.with_selected(index));
        self.cache.apply(Mutation::SelectJobCode);
        info!(index, "Selected job code");
        Ok(())
    }

    /// Scope the views to `period`. Timetable and totals are re-read on the
    /// next access, whether or not the selection went through.
    #[instrument(skip(self))]
    pub fn select_period(&mut self, period: Period) -> Result<(), TimesaverError> {
        self.ensure_authenticated()?;
        let outcome = self.apply_period(&period);
        self.cache.apply(Mutation::SelectPeriod);
        outcome?;
        self.period = period;
        info!(%period, "Selected period");
        Ok(())
    }

    fn apply_period(&self, period: &Period) -> Result<(), TimesaverError> {
        let select = self.find(timecard::PERIOD_SELECT)?;
        let options = self.locator(pages::OPTION)?.within(select).all()?;
        choose_option(&options, timecard::period_label(period))?;
        if let Period::Custom(range) = period {
            self.fill(
                timecard::START_DATE,
                &range.start().format(timecard::DATE_FORMAT).to_string(),
            )?;
            self.fill(
                timecard::END_DATE,
                &range.end().format(timecard::DATE_FORMAT).to_string(),
            )?;
            self.click(timecard::REFRESH)?;
        }
        Ok(())
    }

    /// Record a clock punch now. The new punch shows up in the next timetable read.
    #[instrument(skip(self))]
    pub fn submit_punch(&mut self) -> Result<(), TimesaverError> {
        self.ensure_authenticated()?;
        let outcome = self
            .click(punch::PUNCH_TAB)
            .and_then(|_| self.click(punch::ADD_PUNCH))
            .and_then(|_| self.click(punch::CONFIRM_OK));
        self.cache.apply(Mutation::SubmitPunch);
        outcome?;
        info!("Punch submitted");
        Ok(())
    }

    /// Change the account password.
    ///
    /// The stored credentials are left untouched: call
    /// [`Session::set_credentials`] with the new password before logging in
    /// again, or the next login will use the old one.
    #[instrument(skip(self, new_passwd))]
    pub fn change_password(&mut self, new_passwd: &str) -> Result<(), TimesaverError> {
        self.ensure_authenticated()?;
        let old = self
            .credentials
            .as_ref()
            .map(|c| c.passwd().to_string())
            .ok_or_else(|| {
                TimesaverError::Authentication("no credentials have been set".to_string())
            })?;

        self.click(password::OPEN_DIALOG)?;
        self.fill(password::OLD, &old)?;
        self.fill(password::NEW, new_passwd)?;
        self.fill(password::CONFIRM, new_passwd)?;
        self.click(password::SUBMIT)?;
        self.cache.apply(Mutation::ChangePassword);

        let errors = self.locator(password::ERROR)?.now()?;
        if let Some(error) = errors.first() {
            let message = normalize_text(&error.text()?);
            if !message.is_empty() {
                warn!("Password change rejected: {}", message);
                return Err(TimesaverError::PasswordRejected(message));
            }
        }
        info!("Password changed");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close session on drop: {}", e);
        }
    }
}

fn marker_error(e: AutomationError) -> TimesaverError {
    TimesaverError::Authentication(format!("could not read the login marker: {e}"))
}

/// Click the option whose text matches `label`
fn choose_option(options: &[Element], label: &str) -> Result<(), TimesaverError> {
    for option in options {
        if normalize_text(&option.text()?).eq_ignore_ascii_case(label) {
            option.click()?;
            return Ok(());
        }
    }
    Err(AutomationError::ElementNotFound(format!("no option labeled '{label}'")).into())
}
