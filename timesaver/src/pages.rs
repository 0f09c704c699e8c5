//! Element identifiers of the remote timekeeping application.
//!
//! This is the only place that knows how the application's pages are
//! built. When the remote side renames a control, fix it here.

use crate::table::TableLayout;

/// Generic option elements inside a select-list
pub const OPTION: &str = "tag:option";

/// Layout of the application's grid tables. The header row carries `th`
/// cells only, so it scrapes as an all-empty row and is dropped.
const GRID: TableLayout = TableLayout {
    name: "grid",
    header_cells: "css:tr th",
    rows: "css:tr",
    cells: "tag:td",
};

pub mod login {
    pub const USERNAME: &str = "#username";
    pub const PASSWORD: &str = "#password";
    pub const SUBMIT: &str = "#bttSubmit";
    /// Employee banner rendered only after a successful login
    pub const LOGGED_IN_MARKER: &str = "#lblEmployeeName";
    pub const LOGOFF: &str = "#lnkLogoff";
}

pub mod timecard {
    use super::GRID;
    use crate::models::Period;
    use crate::table::TableLayout;

    pub const SITE_SELECT: &str = "#ddlSite";

    pub const JOB_CODE_GRID: &str = "#gvJobCodes";
    pub const JOB_CODE_LAYOUT: TableLayout = TableLayout {
        name: "job codes",
        ..GRID
    };
    /// Class fragment carried by the highlighted job-code row
    pub const JOB_CODE_SELECTED_CLASS: &str = "selected";
    /// Postback the grid fires when a row is picked: `(target, "Select$<index>")`
    pub const JOB_CODE_SELECT_SCRIPT: &str = "__doPostBack(arguments[0], arguments[1]);";
    pub const JOB_CODE_POSTBACK_TARGET: &str = "gvJobCodes";

    pub fn job_code_postback_argument(index: usize) -> String {
        format!("Select${index}")
    }

    pub const PERIOD_SELECT: &str = "#ddlPeriod";
    pub const START_DATE: &str = "#txtStartDate";
    pub const END_DATE: &str = "#txtEndDate";
    pub const REFRESH: &str = "#btnRefresh";
    /// The date fields expect US month/day/year
    pub const DATE_FORMAT: &str = "%m/%d/%Y";
    pub const DATE_RANGE_LABEL: &str = "Date Range";

    /// Option text of the period select-list for each period
    pub fn period_label(period: &Period) -> &'static str {
        match period {
            Period::Current => "Current Pay Period",
            Period::Previous => "Previous Pay Period",
            Period::Next => "Next Pay Period",
            Period::Custom(_) => DATE_RANGE_LABEL,
        }
    }

    pub const TIME_ENTRIES_TAB: &str = "#tabTimeEntries";
    pub const TIME_ENTRIES_TABLE: &str = "#gvTimeEntries";
    pub const TIME_ENTRIES_LAYOUT: TableLayout = TableLayout {
        name: "timetable",
        ..GRID
    };

    pub const TOTAL_HOURS: &str = "#lblTotalHours";
    pub const HOUR_PAY_CODE_TOTAL: &str = "#lblHourPayCodeTotal";
    pub const DOLLAR_PAY_CODE_TOTAL: &str = "#lblDollarPayCodeTotal";
    pub const PROJECT_TOTAL: &str = "#lblProjectTotal";

    pub const APPROVAL_STATUS: &str = "#lblApprovalStatus";
}

pub mod punch {
    pub const PUNCH_TAB: &str = "#tabPunch";
    pub const ADD_PUNCH: &str = "#btnAddPunch";
    pub const CONFIRM_OK: &str = "#btnPunchConfirmOk";
}

pub mod password {
    pub const OPEN_DIALOG: &str = "#lnkChangePassword";
    pub const OLD: &str = "#txtOldPassword";
    pub const NEW: &str = "#txtNewPassword";
    pub const CONFIRM: &str = "#txtConfirmPassword";
    pub const SUBMIT: &str = "#btnChangePassword";
    pub const ERROR: &str = "#lblPasswordError";
}
