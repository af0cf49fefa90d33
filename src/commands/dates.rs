use super::open_ledger;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;

pub fn cmd() -> Result<()> {
    let dates = open_ledger()?.dates();

    if dates.is_empty() {
        msg_info!(Message::LedgerEmpty);
        return Ok(());
    }

    msg_print!(Message::LedgerDatesHeader, true);
    View::dates(&dates);
    Ok(())
}
