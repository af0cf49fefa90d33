use super::{open_ledger, parse_date};
use crate::libs::formatter::{format_date, format_duration};
use crate::libs::messages::Message;
use crate::libs::report::{week_start, weekly_summary};
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct WeekArgs {
    /// Any date inside the week: YYYY-MM-DD or 'today'
    #[arg(short, long)]
    date: Option<String>,
}

pub fn cmd(week_args: WeekArgs) -> Result<()> {
    let monday = week_start(parse_date(week_args.date.as_deref())?);
    let ledger = open_ledger()?;
    let summary = weekly_summary(&ledger, &monday);

    let from = format_date(&monday);
    let to = summary.dates.last().map(format_date).unwrap_or_else(|| from.clone());

    if summary.total_seconds == 0 {
        msg_info!(Message::NoUsageForRange { from, to });
        return Ok(());
    }

    msg_print!(Message::WeeklyReportHeader { from, to }, true);
    View::weekly(&summary);

    msg_print!(Message::TopAppsHeader, true);
    View::top_apps(&summary);

    msg_print!(Message::CategoriesHeader, true);
    View::categories(&summary.categories);

    msg_print!(Message::TotalTracked(format_duration(summary.total_seconds)), true);
    Ok(())
}
