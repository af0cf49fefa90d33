//! Configuration management for truefocus.
//!
//! Settings are stored as a single JSON document (`config.json`) in the
//! application data directory resolved by [`DataStorage`]. Every section is
//! optional, so a fresh installation runs with built-in defaults until the
//! user walks through `truefocus init`.
//!
//! ## Modules
//!
//! - **ThingsBoard**: remote platform host, account email and the presence
//!   device identifiers
//! - **Pomodoro**: work, short break and long break durations in minutes
//! - **Monitor**: polling cadences for presence, activity sampling, ledger
//!   flushing and the remote request timeout
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use truefocus::libs::config::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::read()?;
//! let settings = config.pomodoro.clone().unwrap_or_default().settings();
//! println!("work for {} minutes", settings.work_duration);
//! # Ok(())
//! # }
//! ```

use super::data_storage::DataStorage;
use super::session::Settings;
use crate::api::thingsboard::ThingsBoardConfig;
use crate::libs::messages::Message;
use crate::msg_print;
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::time::Duration;

/// Configuration file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// A configurable module offered by the setup wizard.
#[derive(Debug, Clone)]
pub struct ConfigModule {
    /// Routing key used by [`Config::init`]
    pub key: String,
    /// Display name shown to the user
    pub name: String,
}

/// Pomodoro interval lengths, in minutes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PomodoroConfig {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        PomodoroConfig {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
        }
    }
}

impl PomodoroConfig {
    pub fn module() -> ConfigModule {
        ConfigModule {
            key: "pomodoro".to_string(),
            name: Message::ConfigModulePomodoro.to_string(),
        }
    }

    /// Session settings derived from this section.
    pub fn settings(&self) -> Settings {
        Settings {
            work_duration: self.work_duration,
            short_break_duration: self.short_break_duration,
            long_break_duration: self.long_break_duration,
        }
    }

    pub fn init(config: &Option<Self>) -> Result<Self> {
        let default = config.clone().unwrap_or_default();
        msg_print!(Message::ConfigModulePomodoro);
        Ok(Self {
            work_duration: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptWorkDuration.to_string())
                .default(default.work_duration)
                .interact_text()?,
            short_break_duration: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptShortBreakDuration.to_string())
                .default(default.short_break_duration)
                .interact_text()?,
            long_break_duration: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptLongBreakDuration.to_string())
                .default(default.long_break_duration)
                .interact_text()?,
        })
    }
}

/// Cadences of the watch loop.
///
/// The defaults follow the desktop build of the app: presence is polled
/// every two seconds, the foreground window once per second and the usage
/// ledger is written out every ten seconds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Presence poll interval in milliseconds.
    pub presence_poll_interval: u64,
    /// Activity sample interval in milliseconds.
    pub sample_interval: u64,
    /// Ledger flush interval in seconds. Configuration is re-read on the
    /// same cadence.
    pub flush_interval: u64,
    /// Upper bound for a single remote request in milliseconds.
    pub request_timeout: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            presence_poll_interval: 2000,
            sample_interval: 1000,
            flush_interval: 10,
            request_timeout: 1500,
        }
    }
}

impl MonitorConfig {
    pub fn module() -> ConfigModule {
        ConfigModule {
            key: "monitor".to_string(),
            name: Message::ConfigModuleMonitor.to_string(),
        }
    }

    pub fn presence_poll(&self) -> Duration {
        Duration::from_millis(self.presence_poll_interval.max(1))
    }

    pub fn sample(&self) -> Duration {
        Duration::from_millis(self.sample_interval.max(1))
    }

    pub fn flush(&self) -> Duration {
        Duration::from_secs(self.flush_interval.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout.max(1))
    }

    pub fn init(config: &Option<Self>) -> Result<Self> {
        let default = config.clone().unwrap_or_default();
        msg_print!(Message::ConfigModuleMonitor);
        Ok(Self {
            presence_poll_interval: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptPresencePollInterval.to_string())
                .default(default.presence_poll_interval)
                .interact_text()?,
            sample_interval: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptSampleInterval.to_string())
                .default(default.sample_interval)
                .interact_text()?,
            flush_interval: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptFlushInterval.to_string())
                .default(default.flush_interval)
                .interact_text()?,
            request_timeout: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptRequestTimeout.to_string())
                .default(default.request_timeout)
                .interact_text()?,
        })
    }
}

/// Root configuration document.
///
/// Unconfigured sections are omitted from the JSON output.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thingsboard: Option<ThingsBoardConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pomodoro: Option<PomodoroConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,
}

impl Config {
    /// Reads the configuration, returning defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read() -> Result<Config> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;

        if !config_file_path.exists() {
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(config_file_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON, replacing the file.
    pub fn save(&self) -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    /// Removes the configuration file. A missing file is not an error.
    pub fn delete() -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        if config_file_path.exists() {
            fs::remove_file(config_file_path)?;
        }
        Ok(())
    }

    /// Effective Pomodoro settings, falling back to the defaults.
    pub fn settings(&self) -> Settings {
        self.pomodoro.clone().unwrap_or_default().settings()
    }

    /// Effective monitor cadences, falling back to the defaults.
    pub fn monitor(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }

    /// Runs the interactive setup wizard.
    ///
    /// Existing values pre-fill every prompt; modules the user does not
    /// select are left untouched.
    pub fn init() -> Result<Self> {
        let mut config = Self::read().unwrap_or_default();

        let node_descriptions = vec![ThingsBoardConfig::module(), PomodoroConfig::module(), MonitorConfig::module()];

        let selected_nodes = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptSelectModules.to_string())
            .items(&node_descriptions.iter().map(|module| &module.name).collect::<Vec<_>>())
            .interact()?;

        for &selection in &selected_nodes {
            match node_descriptions[selection].key.as_str() {
                "thingsboard" => config.thingsboard = Some(ThingsBoardConfig::init(&config.thingsboard)?),
                "pomodoro" => config.pomodoro = Some(PomodoroConfig::init(&config.pomodoro)?),
                "monitor" => config.monitor = Some(MonitorConfig::init(&config.monitor)?),
                _ => {}
            }
        }

        Ok(config)
    }
}
