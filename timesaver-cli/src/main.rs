//! Timesaver CLI
//!
//! Logs in to the timekeeping application, applies the requested selections
//! and prints one view.
//!
//! Usage:
//!   timesaver --user jdoe timetable --period previous
//!   timesaver --user jdoe totals --from 2023-01-01 --to 2023-01-15 --json
//!   timesaver --user jdoe punch --site 2 --job-code 1
//!
//! Connection settings come from `--config <file.json>` and/or the
//! `TIMESAVER_*` environment variables (a `.env` file is honoured).

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use timesaver::{DateRange, Period, Session, SessionConfig, Table};
use tracing::info;

#[derive(Parser)]
#[command(name = "timesaver")]
#[command(about = "Read and punch a browser-rendered timecard from the terminal")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// JSON configuration file; TIMESAVER_* variables override its values
    #[arg(long, global = true, env = "TIMESAVER_CONFIG")]
    config: Option<PathBuf>,

    /// Login name
    #[arg(long, short = 'u', global = true, env = "TIMESAVER_USER")]
    user: Option<String>,

    /// Login password
    #[arg(long, global = true, env = "TIMESAVER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Pay period to show: current, previous, next or START..END
    #[arg(long, global = true, conflicts_with_all = ["from", "to"])]
    period: Option<Period>,

    /// Start of a custom date range (YYYY-MM-DD)
    #[arg(long, global = true, requires = "to")]
    from: Option<NaiveDate>,

    /// End of a custom date range (YYYY-MM-DD)
    #[arg(long, global = true, requires = "from")]
    to: Option<NaiveDate>,

    /// Select the site at this position before running the command
    #[arg(long, global = true)]
    site: Option<usize>,

    /// Select the job code at this position before running the command
    #[arg(long, global = true)]
    job_code: Option<usize>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show login state, current selections and approval status
    Status,
    /// Print the time entries of the selected period
    Timetable,
    /// Print the period totals
    Totals,
    /// List work locations
    Sites,
    /// List job codes
    JobCodes,
    /// List the pay periods offered by the application
    Periods,
    /// Record a punch with the current site and job code
    Punch,
    /// Change the login password
    ChangePassword {
        /// The new password
        #[arg(long, env = "TIMESAVER_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let config = load_config(&cli.global)?;
    let mut session = Session::open(config).context("Failed to start a browser session")?;

    let outcome = run(&mut session, &cli.global, &cli.command);
    let closed = session.close().context("Failed to release the browser session");
    outcome?;
    closed
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_config(args: &GlobalArgs) -> Result<SessionConfig> {
    let config = match &args.config {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?
            .with_env()?,
        None => SessionConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn requested_period(args: &GlobalArgs) -> Result<Option<Period>> {
    match (args.from, args.to, args.period) {
        (Some(from), Some(to), _) => Ok(Some(Period::Custom(DateRange::new(from, to)?))),
        (None, None, period) => Ok(period),
        _ => bail!("--from and --to must be given together"),
    }
}

fn run(session: &mut Session, args: &GlobalArgs, command: &Commands) -> Result<()> {
    let user = args
        .user
        .as_deref()
        .context("A login name is required (--user or TIMESAVER_USER)")?;
    let password = args
        .password
        .as_deref()
        .context("A password is required (--password or TIMESAVER_PASSWORD)")?;
    session.set_credentials(user, password);
    session.authenticate().context("Login failed")?;

    if let Some(index) = args.site {
        session.select_site(index)?;
    }
    if let Some(index) = args.job_code {
        session.select_job_code(index)?;
    }
    if let Some(period) = requested_period(args)? {
        session.select_period(period)?;
    }

    match command {
        Commands::Status => show_status(session, args.json),
        Commands::Timetable => {
            let table = session.timetable()?;
            emit(args.json, &*table, || print_table(&table, None))
        }
        Commands::Totals => {
            let totals = session.totals()?;
            emit(args.json, &*totals, || {
                println!("Total hours:        {}", totals.total_hours);
                println!("Hour pay codes:     {}", totals.hour_pay_code_total);
                println!("Dollar pay codes:   {}", totals.dollar_pay_code_total);
                println!("Projects:           {}", totals.project_total);
            })
        }
        Commands::Sites => {
            let sites = session.sites()?;
            emit(args.json, &*sites, || {
                for (i, label) in sites.labels().iter().enumerate() {
                    let marker = if i == sites.selected() { '*' } else { ' ' };
                    println!("{marker} {i:>3}  {label}");
                }
            })
        }
        Commands::JobCodes => {
            let codes = session.job_codes()?;
            emit(args.json, &*codes, || {
                print_table(codes.table(), Some(codes.selected()))
            })
        }
        Commands::Periods => {
            let periods = session.periods()?;
            emit(args.json, &*periods, || {
                for label in &periods.labels {
                    let marker = if periods.selected.as_deref() == Some(label.as_str()) {
                        '*'
                    } else {
                        ' '
                    };
                    println!("{marker} {label}");
                }
            })
        }
        Commands::Punch => {
            session.submit_punch()?;
            info!("Punch submitted");
            let table = session.timetable()?;
            emit(args.json, &*table, || {
                println!("Punch recorded.");
                print_table(&table, None);
            })
        }
        Commands::ChangePassword { new_password } => {
            session
                .change_password(new_password)
                .context("Password change failed")?;
            // Keep the session usable for anything that follows.
            session.set_credentials(user, new_password.as_str());
            emit(args.json, &json!({ "changed": true }), || {
                println!("Password changed.")
            })
        }
    }
}

fn show_status(session: &mut Session, as_json: bool) -> Result<()> {
    let sites = session.sites()?;
    let codes = session.job_codes()?;
    let approval = session.approval_status()?;
    let status = json!({
        "url": session.base_url(),
        "state": session.state().to_string(),
        "user": session.credentials().map(|c| c.uid()),
        "period": session.selected_period().to_string(),
        "site": sites.selected_label(),
        "jobCode": codes.selected(),
        "approval": approval.label,
        "approved": approval.is_approved(),
    });
    emit(as_json, &status, || {
        println!("URL:        {}", session.base_url());
        println!("State:      {}", session.state());
        println!("Period:     {}", session.selected_period());
        println!("Site:       {}", sites.selected_label().unwrap_or("-"));
        println!("Job code:   {}", codes.selected());
        println!("Approval:   {}", approval.label);
    })
}

fn emit<T, F>(as_json: bool, value: &T, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(),
{
    if as_json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

fn print_table(table: &Table, marked: Option<usize>) {
    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.chars().count()).collect();
    for row in table.rows() {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("  {}", line(table.columns()));
    for (i, row) in table.rows().iter().enumerate() {
        let marker = if marked == Some(i) { '*' } else { ' ' };
        println!("{marker} {}", line(row));
    }
    if table.is_empty() {
        println!("  (no entries)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["timesaver", "timetable", "--period", "previous", "--site", "2"]);
        assert_eq!(cli.global.period, Some(Period::Previous));
        assert_eq!(cli.global.site, Some(2));
        assert!(matches!(cli.command, Commands::Timetable));
    }

    #[test]
    fn test_custom_range_from_flags() {
        let cli = parse(&["timesaver", "totals", "--from", "2023-01-01", "--to", "2023-01-15"]);
        let period = requested_period(&cli.global).unwrap().unwrap();
        assert_eq!(period.to_string(), "2023-01-01..2023-01-15");
    }

    #[test]
    fn test_period_conflicts_with_range() {
        assert!(Cli::try_parse_from([
            "timesaver",
            "totals",
            "--period",
            "current",
            "--from",
            "2023-01-01",
            "--to",
            "2023-01-15",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["timesaver", "totals", "--from", "2023-01-01"]).is_err());
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let cli = parse(&["timesaver", "totals", "--from", "2023-02-01", "--to", "2023-01-01"]);
        assert!(requested_period(&cli.global).is_err());
    }

    #[test]
    fn test_change_password_takes_new_password() {
        let cli = parse(&["timesaver", "change-password", "--new-password", "s3cret"]);
        match cli.command {
            Commands::ChangePassword { new_password } => assert_eq!(new_password, "s3cret"),
            _ => panic!("expected change-password"),
        }
    }
}
