use crate::errors::TimesaverError;
use crate::table::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive calendar date range for a custom period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = TimesaverError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TimesaverError> {
        if end < start {
            return Err(TimesaverError::InvalidArgument(format!(
                "date range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// The payroll/attendance window a view is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Current,
    Previous,
    Next,
    Custom(DateRange),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Current => write!(f, "current"),
            Period::Previous => write!(f, "previous"),
            Period::Next => write!(f, "next"),
            Period::Custom(range) => write!(f, "{}..{}", range.start, range.end),
        }
    }
}

impl FromStr for Period {
    type Err = TimesaverError;

    /// Accepts `current`, `previous`, `next` or `YYYY-MM-DD..YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "current" => return Ok(Period::Current),
            "previous" | "prev" => return Ok(Period::Previous),
            "next" => return Ok(Period::Next),
            _ => {}
        }
        let (start, end) = s.split_once("..").ok_or_else(|| {
            TimesaverError::InvalidArgument(format!(
                "unknown period '{s}', expected current, previous, next or START..END"
            ))
        })?;
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                TimesaverError::InvalidArgument(format!("invalid date '{raw}': {e}"))
            })
        };
        Ok(Period::Custom(DateRange::new(parse(start)?, parse(end)?)?))
    }
}

/// Work locations offered by the site selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sites {
    labels: Vec<String>,
    selected: usize,
}

impl Sites {
    pub fn new(labels: Vec<String>, selected: usize) -> Self {
        Self { labels, selected }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_label(&self) -> Option<&str> {
        self.labels.get(self.selected).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub(crate) fn with_selected(&self, selected: usize) -> Self {
        Self {
            labels: self.labels.clone(),
            selected,
        }
    }
}

/// Job codes offered by the multi-column job-code widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobCodes {
    table: Table,
    selected: usize,
}

impl JobCodes {
    pub fn new(table: Table, selected: usize) -> Self {
        Self { table, selected }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub(crate) fn with_selected(&self, selected: usize) -> Self {
        Self {
            table: self.table.clone(),
            selected,
        }
    }
}

/// Aggregated figures for the active period, as displayed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_hours: String,
    pub hour_pay_code_total: String,
    pub dollar_pay_code_total: String,
    pub project_total: String,
}

/// Choices offered by the period selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodOptions {
    pub labels: Vec<String>,
    pub selected: Option<String>,
}

/// Approval state of the timecard for the active period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalStatus {
    pub label: String,
}

impl ApprovalStatus {
    pub fn is_approved(&self) -> bool {
        let label = self.label.to_lowercase();
        if label.contains("not approved") || label.contains("unapproved") {
            return false;
        }
        label.contains("approved")
    }
}
