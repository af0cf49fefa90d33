use super::{open_ledger, parse_date};
use crate::libs::formatter::{format_date, format_duration};
use crate::libs::messages::Message;
use crate::libs::report::{category_totals, sorted_usage, stats_for_date, total_seconds};
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Date to report on: YYYY-MM-DD or 'today'
    #[arg(short, long)]
    date: Option<String>,
    /// Also show the per-hour breakdown
    #[arg(long)]
    hourly: bool,
}

pub fn cmd(report_args: ReportArgs) -> Result<()> {
    let date = parse_date(report_args.date.as_deref())?;
    let ledger = open_ledger()?;
    let totals = stats_for_date(&ledger, &date);

    if totals.is_empty() {
        msg_info!(Message::NoUsageForDate(format_date(&date)));
        return Ok(());
    }

    msg_print!(Message::ReportHeader(format_date(&date)), true);
    View::usage(&sorted_usage(&totals));

    msg_print!(Message::CategoriesHeader, true);
    View::categories(&category_totals(totals.values()));

    if report_args.hourly {
        if let Some(day) = ledger.day(&date) {
            msg_print!(Message::HourlyReportHeader(format_date(&date)), true);
            View::hourly(day);
        }
    }

    msg_print!(Message::TotalTracked(format_duration(total_seconds(&totals))), true);
    Ok(())
}
