//! Display implementation for truefocus application messages.
//!
//! This module is the single place where message text is written. Call sites
//! construct a [`Message`] variant and hand it to one of the output macros;
//! the wording, emoji and parameter interpolation happen here.
//!
//! Notification texts (the `Notify*` variants) are the short strings shown
//! to the user at WORK/BREAK boundaries and on presence transitions.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let s = match self {
            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigDeleted => "Configuration removed".to_string(),
            Message::ConfigReloadFailed(e) => format!("Failed to reload configuration: {}", e),
            Message::ConfigModuleThingsBoard => "ThingsBoard settings".to_string(),
            Message::ConfigModulePomodoro => "Pomodoro settings".to_string(),
            Message::ConfigModuleMonitor => "Monitor settings".to_string(),
            Message::ThingsBoardNotConfigured => "ThingsBoard is not configured. Run 'truefocus init' first".to_string(),
            Message::SettingsReloaded {
                work,
                short_break,
                long_break,
            } => format!(
                "Pomodoro settings changed: work {} min, short break {} min, long break {} min",
                work, short_break, long_break
            ),

            // === PROMPTS ===
            Message::PromptSelectModules => "Select the modules to configure".to_string(),
            Message::PromptThingsBoardHost => "Enter the ThingsBoard host URL".to_string(),
            Message::PromptThingsBoardEmail => "Enter your ThingsBoard email".to_string(),
            Message::PromptThingsBoardDeviceId => "Enter the presence device ID".to_string(),
            Message::PromptThingsBoardDeviceToken => "Enter the device access token".to_string(),
            Message::PromptPassword(email) => format!("Enter the ThingsBoard password for {}", email),
            Message::PromptWorkDuration => "Work duration (minutes)".to_string(),
            Message::PromptShortBreakDuration => "Short break duration (minutes)".to_string(),
            Message::PromptLongBreakDuration => "Long break duration (minutes)".to_string(),
            Message::PromptPresencePollInterval => "Presence poll interval (milliseconds)".to_string(),
            Message::PromptSampleInterval => "Activity sample interval (milliseconds)".to_string(),
            Message::PromptFlushInterval => "Usage ledger flush interval (seconds)".to_string(),
            Message::PromptRequestTimeout => "Remote request timeout (milliseconds)".to_string(),

            // === AUTHENTICATION MESSAGES ===
            Message::LoginSucceeded(email) => format!("Logged in to ThingsBoard as {}", email),
            Message::LoginFailed(e) => format!("ThingsBoard login failed: {}", e),
            Message::LoggedOut => "Session token removed".to_string(),
            Message::NotLoggedIn => "No cached session token. Run 'truefocus login' first".to_string(),
            Message::SessionTokenRejected => "ThingsBoard rejected the session token; it has been discarded".to_string(),

            // === GATEWAY MESSAGES ===
            Message::PresenceFetchFailed(e) => format!("Presence fetch failed, treating as absent: {}", e),
            Message::PresenceFetchTimedOut(ms) => format!("Presence fetch took longer than {}ms, treating as absent", ms),
            Message::TelemetryPushed { status, time_left } => format!("Telemetry sent: {} ({}s left)", status, time_left),
            Message::TelemetryPushFailed(e) => format!("Telemetry push failed: {}", e),
            Message::DeviceCommandSent { status, duration_sec } => {
                format!("Device command sent: {} ({}s)", status, duration_sec)
            }
            Message::DeviceCommandFailed { method, error } => format!("Device command '{}' failed: {}", method, error),

            // === SESSION NOTIFICATIONS ===
            Message::NotifyAbsencePaused => "Absence detected. Timer paused automatically.".to_string(),
            Message::NotifyPresenceResumed => "Presence detected. Timer resumed.".to_string(),
            Message::NotifyLongBreak => "Great work! Time for a long break.".to_string(),
            Message::NotifyShortBreak => "Short break.".to_string(),
            Message::NotifyBackToWork => "Back to work!".to_string(),
            Message::NotifyBreakWarning => "You are on a break. Step away from the computer to make the most of it.".to_string(),
            Message::NotifyBreakPaused => {
                "Break paused. Remember: breaks matter for your productivity, go recuperate.".to_string()
            }
            Message::NotifyBreakResumed => "Absence detected. Break resumed.".to_string(),
            Message::StartBlockedWhileAbsent => "You are marked absent; a work session cannot be started".to_string(),

            // === PRESENCE MESSAGES ===
            Message::PresenceChanged { is_present, distance_cm } => {
                let state = if *is_present { "present" } else { "absent" };
                match distance_cm {
                    Some(cm) => format!("Presence changed: {} ({:.0} cm)", state, cm),
                    None => format!("Presence changed: {}", state),
                }
            }

            // === LEDGER MESSAGES ===
            Message::LedgerLoadFailed(e) => format!("Failed to load the usage ledger, starting empty: {}", e),
            Message::LedgerSaveFailed(e) => format!("Failed to save the usage ledger: {}", e),
            Message::LedgerSaved(days) => format!("Usage ledger saved ({} days)", days),
            Message::LedgerMigrated { from, to } => format!("Usage ledger upgraded from schema v{} to v{}", from, to),
            Message::LedgerMigrationApplied { version, name } => format!("Applied ledger migration v{}: {}", version, name),
            Message::NewDayDetected(date) => format!("New day detected: {}", date),
            Message::LedgerEntrySkipped { app, error } => format!("Skipping unreadable ledger entry '{}': {}", app, error),

            // === ACTIVITY MESSAGES ===
            Message::ForegroundWindowFailed(e) => format!("Could not read the foreground window: {}", e),
            Message::IconResolveFailed { app, error } => format!("Could not resolve the icon for {}: {}", app, error),

            // === WATCH MESSAGES ===
            Message::WatchStarted {
                work,
                short_break,
                long_break,
            } => format!(
                "TrueFocus is running (work {} min, short break {} min, long break {} min)",
                work, short_break, long_break
            ),
            Message::WatchStopped => "TrueFocus stopped".to_string(),
            Message::WatchCommandsHelp => {
                "Commands: [t]oggle, [r]eset, [s]kip, [w]ork, [b]reak, [q]uit".to_string()
            }
            Message::UnknownCommand(input) => format!("Unknown command '{}'", input),
            Message::StdinClosed => "Standard input closed; controls are no longer available".to_string(),
            Message::WatcherReceivedSigterm => "Received SIGTERM, shutting down".to_string(),
            Message::WatcherReceivedSigint => "Received SIGINT, shutting down".to_string(),
            Message::WatcherReceivedCtrlC => "Received Ctrl+C, shutting down".to_string(),
            Message::WatcherCtrlCListenFailed(e) => format!("Unable to listen for Ctrl+C: {}", e),
            Message::FailedToCreateSignalHandler(e) => format!("Failed to create signal handler: {}", e),
            Message::DispatcherStopped => "Outbound dispatcher stopped".to_string(),
            Message::PresencePollInFlight => "Previous presence request still running, skipping this poll".to_string(),

            // === REPORT MESSAGES ===
            Message::ReportHeader(date) => format!("Application usage for {}", date),
            Message::HourlyReportHeader(date) => format!("Hourly breakdown for {}", date),
            Message::WeeklyReportHeader { from, to } => format!("Weekly summary {} - {}", from, to),
            Message::RangeReportHeader { from, to } => format!("Daily totals {} - {}", from, to),
            Message::CategoriesHeader => "Categories".to_string(),
            Message::TopAppsHeader => "Top applications".to_string(),
            Message::NoUsageForDate(date) => format!("No usage recorded for {}", date),
            Message::NoUsageForRange { from, to } => format!("No usage recorded between {} and {}", from, to),
            Message::TotalTracked(total) => format!("Total tracked: {}", total),
            Message::LedgerDatesHeader => "Dates with recorded usage".to_string(),
            Message::LedgerEmpty => "The usage ledger is empty".to_string(),
            Message::InvalidDateFormat(input) => format!("Invalid date '{}', expected YYYY-MM-DD or 'today'", input),
            Message::InvalidDateRange { from, to } => format!("Invalid range: {} is after {}", from, to),
        };
        write!(f, "{}", s)
    }
}
