use crate::api::{Session, ThingsBoard};
use crate::libs::{config::Config, messages::Message};
use crate::msg_success;
use anyhow::Result;

pub fn cmd() -> Result<()> {
    let config = Config::read()?;
    let thingsboard = config.thingsboard.clone().unwrap_or_default();

    ThingsBoard::new(&thingsboard, config.monitor().timeout())?.delete_token()?;

    msg_success!(Message::LoggedOut);
    Ok(())
}
