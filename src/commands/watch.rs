use crate::api::{Session, ThingsBoard};
use crate::libs::{activity::SystemActivitySource, config::Config, daemon, messages::Message};
use crate::{msg_bail_anyhow, msg_warning};
use anyhow::Result;
use std::sync::Arc;

pub async fn cmd() -> Result<()> {
    let config = Config::read()?;
    let Some(thingsboard) = config.thingsboard.clone() else {
        msg_bail_anyhow!(Message::ThingsBoardNotConfigured);
    };

    let gateway = ThingsBoard::new(&thingsboard, config.monitor().timeout())?;
    if gateway.read_token().is_err() {
        // Presence reads fail until login; the user counts as absent.
        msg_warning!(Message::NotLoggedIn);
    }

    daemon::run_with_signal_handling(Arc::new(gateway), SystemActivitySource::new(), config).await
}
