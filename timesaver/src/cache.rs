//! Session-scoped memoization of everything read from the remote UI.
//!
//! Each view lives in its own [`Slot`]. Slots never expire by time; they are
//! cleared only when a [`Mutation`] listed against them in [`INVALIDATIONS`]
//! is applied.

use crate::models::{ApprovalStatus, JobCodes, PeriodOptions, Sites, Totals};
use crate::table::Table;
use std::sync::Arc;
use tracing::debug;

/// Cached views of the remote application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Sites,
    JobCodes,
    Periods,
    Timetable,
    Totals,
    Approval,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Sites,
        View::JobCodes,
        View::Periods,
        View::Timetable,
        View::Totals,
        View::Approval,
    ];
}

/// State-changing actions that can make cached views stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    SelectSite,
    SelectJobCode,
    SelectPeriod,
    SubmitPunch,
    ChangePassword,
    Logoff,
}

/// Which views each mutation makes stale. Site and job code are independent
/// of the period, so selecting a period never touches them.
pub const INVALIDATIONS: &[(Mutation, &[View])] = &[
    (Mutation::SelectSite, &[]),
    (Mutation::SelectJobCode, &[]),
    (
        Mutation::SelectPeriod,
        &[View::Timetable, View::Totals, View::Approval, View::Periods],
    ),
    (
        Mutation::SubmitPunch,
        &[View::Timetable, View::Totals, View::Approval],
    ),
    (Mutation::ChangePassword, &[]),
    (Mutation::Logoff, &View::ALL),
];

pub fn invalidated_by(mutation: Mutation) -> &'static [View] {
    INVALIDATIONS
        .iter()
        .find(|(m, _)| *m == mutation)
        .map(|(_, views)| *views)
        .unwrap_or(&[])
}

/// One lazily filled value plus a count of how often it was fetched
#[derive(Debug)]
pub struct Slot<T> {
    value: Option<Arc<T>>,
    fetches: u64,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            fetches: 0,
        }
    }
}

impl<T> Slot<T> {
    pub fn peek(&self) -> Option<Arc<T>> {
        self.value.clone()
    }

    /// Record a freshly fetched value
    pub fn store(&mut self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.value = Some(value.clone());
        self.fetches += 1;
        value
    }

    /// Replace the value without counting a fetch (local bookkeeping after an action)
    pub fn replace(&mut self, value: T) {
        self.value = Some(Arc::new(value));
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }
}

#[derive(Debug, Default)]
pub struct ViewCache {
    pub sites: Slot<Sites>,
    pub job_codes: Slot<JobCodes>,
    pub periods: Slot<PeriodOptions>,
    pub timetable: Slot<Table>,
    pub totals: Slot<Totals>,
    pub approval: Slot<ApprovalStatus>,
}

impl ViewCache {
    pub fn invalidate(&mut self, view: View) {
        match view {
            View::Sites => self.sites.clear(),
            View::JobCodes => self.job_codes.clear(),
            View::Periods => self.periods.clear(),
            View::Timetable => self.timetable.clear(),
            View::Totals => self.totals.clear(),
            View::Approval => self.approval.clear(),
        }
    }

    /// Clear every view the mutation makes stale
    pub fn apply(&mut self, mutation: Mutation) {
        let views = invalidated_by(mutation);
        if !views.is_empty() {
            debug!(?mutation, ?views, "Invalidating cached views");
        }
        for view in views {
            self.invalidate(*view);
        }
    }

    pub fn is_cached(&self, view: View) -> bool {
        match view {
            View::Sites => self.sites.is_filled(),
            View::JobCodes => self.job_codes.is_filled(),
            View::Periods => self.periods.is_filled(),
            View::Timetable => self.timetable.is_filled(),
            View::Totals => self.totals.is_filled(),
            View::Approval => self.approval.is_filled(),
        }
    }

    /// How many times the view has been read from the remote UI
    pub fn fetches(&self, view: View) -> u64 {
        match view {
            View::Sites => self.sites.fetches(),
            View::JobCodes => self.job_codes.fetches(),
            View::Periods => self.periods.fetches(),
            View::Timetable => self.timetable.fetches(),
            View::Totals => self.totals.fetches(),
            View::Approval => self.approval.fetches(),
        }
    }
}
