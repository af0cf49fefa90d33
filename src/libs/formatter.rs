//! Time formatting utilities for user-friendly display.
//!
//! ## Format Specifications
//!
//! - **Countdown** (`format_countdown`): `MM:SS`, minutes grow past 59 for
//!   long intervals (`90:00`)
//! - **Usage duration** (`format_duration`): `HH:MM:SS`, used in reports
//! - **Progress** (`progress_percent`): share of the current interval that
//!   has already elapsed, rounded down to a whole percent
//!
//! ## Examples
//!
//! ```rust
//! use truefocus::libs::formatter::{format_countdown, format_duration, progress_percent};
//!
//! assert_eq!(format_countdown(1500), "25:00");
//! assert_eq!(format_duration(3725), "01:02:05");
//! assert_eq!(progress_percent(900, 1500), 40);
//! ```

use chrono::NaiveDate;

/// Formats a countdown in seconds as `MM:SS`.
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Formats an accumulated duration in seconds as `HH:MM:SS`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Percentage of `target` already elapsed given `time_left`.
///
/// A zero target reads as complete.
pub fn progress_percent(time_left: u64, target: u64) -> u8 {
    if target == 0 {
        return 100;
    }
    let elapsed = target.saturating_sub(time_left.min(target));
    ((elapsed * 100) / target) as u8
}

/// Ledger date key, `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
