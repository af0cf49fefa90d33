//! `truefocus login`
//!
//! Credentials come from `TRUEFOCUS_EMAIL` / `TRUEFOCUS_PASSWORD` (a `.env`
//! file works too) and fall back to interactive prompts.

use crate::api::ThingsBoard;
use crate::libs::{config::Config, messages::Message};
use crate::{msg_bail_anyhow, msg_error_anyhow, msg_success};
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use std::env;

pub const EMAIL_ENV: &str = "TRUEFOCUS_EMAIL";
pub const PASSWORD_ENV: &str = "TRUEFOCUS_PASSWORD";

pub async fn cmd() -> Result<()> {
    let config = Config::read()?;
    let Some(thingsboard) = config.thingsboard.clone() else {
        msg_bail_anyhow!(Message::ThingsBoardNotConfigured);
    };

    let email = match env::var(EMAIL_ENV).ok().filter(|email| !email.is_empty()) {
        Some(email) => email,
        None if !thingsboard.email.is_empty() => thingsboard.email.clone(),
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptThingsBoardEmail.to_string())
            .interact_text()?,
    };

    let password = match env::var(PASSWORD_ENV).ok().filter(|password| !password.is_empty()) {
        Some(password) => password,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptPassword(email.clone()).to_string())
            .interact()?,
    };

    let client = ThingsBoard::new(&thingsboard, config.monitor().timeout())?;
    client
        .authenticate(&email, &password)
        .await
        .map_err(|e| msg_error_anyhow!(Message::LoginFailed(e.to_string())))?;

    msg_success!(Message::LoginSucceeded(email));
    Ok(())
}
