pub mod dates;
pub mod init;
pub mod login;
pub mod logout;
pub mod range;
pub mod report;
pub mod watch;
pub mod week;

use crate::libs::ledger::UsageLedger;
use crate::libs::messages::Message;
use crate::libs::migrations::MigrationContext;
use crate::msg_error_anyhow;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Log in to ThingsBoard and cache the session token")]
    Login,
    #[command(about = "Remove the cached ThingsBoard session token")]
    Logout,
    #[command(about = "Run the presence-aware focus timer and record application usage")]
    Watch,
    #[command(about = "Show application usage for a day")]
    Report(report::ReportArgs),
    #[command(about = "Show the weekly usage summary")]
    Week(week::WeekArgs),
    #[command(about = "Show daily usage totals for a date range")]
    Range(range::RangeArgs),
    #[command(about = "List the dates with recorded usage")]
    Dates,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            Commands::Login => login::cmd().await,
            Commands::Logout => logout::cmd(),
            Commands::Watch => watch::cmd().await,
            Commands::Report(args) => report::cmd(args),
            Commands::Week(args) => week::cmd(args),
            Commands::Range(args) => range::cmd(args),
            Commands::Dates => dates::cmd(),
        }
    }
}

/// Parses `YYYY-MM-DD` or `today`; `None` means today.
pub fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    match input.map(str::trim) {
        None | Some("today") => Ok(Local::now().date_naive()),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| msg_error_anyhow!(Message::InvalidDateFormat(value.to_string()))),
    }
}

/// Loads the usage ledger from the data directory.
pub fn open_ledger() -> Result<UsageLedger> {
    Ok(UsageLedger::load(&UsageLedger::default_path()?, &MigrationContext::now()))
}
