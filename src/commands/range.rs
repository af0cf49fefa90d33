use super::{open_ledger, parse_date};
use crate::libs::formatter::format_date;
use crate::libs::messages::Message;
use crate::libs::report::stats_for_date_range;
use crate::libs::view::View;
use crate::{msg_bail_anyhow, msg_info, msg_print};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// First day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    from: String,
    /// Last day, inclusive (YYYY-MM-DD or 'today')
    #[arg(long)]
    to: String,
}

pub fn cmd(range_args: RangeArgs) -> Result<()> {
    let from = parse_date(Some(&range_args.from))?;
    let to = parse_date(Some(&range_args.to))?;

    if from > to {
        msg_bail_anyhow!(Message::InvalidDateRange {
            from: format_date(&from),
            to: format_date(&to),
        });
    }

    let stats = stats_for_date_range(&open_ledger()?, &from, &to);
    if stats.is_empty() {
        msg_info!(Message::NoUsageForRange {
            from: format_date(&from),
            to: format_date(&to),
        });
        return Ok(());
    }

    msg_print!(
        Message::RangeReportHeader {
            from: format_date(&from),
            to: format_date(&to),
        },
        true
    );
    View::range(&stats);
    Ok(())
}
