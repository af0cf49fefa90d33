//! Activity sampler.
//!
//! Once per sample interval the sampler asks the [`ActivitySource`] for the
//! focused application and credits one second to it in the ledger bucket for
//! the current date and hour. Nothing is recorded while the user is absent or
//! when no window is available.
//!
//! Icons are looked up in this order and stored at most once per entry:
//!
//! 1. the in-memory cache keyed by application identity
//! 2. the icon already stored in the current hour bucket (warms the cache)
//! 3. [`ActivitySource::resolve_icon`]
//!
//! A failed lookup is simply retried on a later sample.

use super::activity::ActivitySource;
use super::ledger::{UsageEntry, UsageLedger};
use super::report::{sorted_usage, stats_for_date};
use crate::libs::formatter::format_date;
use crate::libs::messages::Message;
use crate::msg_info;
use chrono::{DateTime, Local, NaiveDate, Timelike};
use std::collections::HashMap;

/// Today's usage as of the latest recorded sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSnapshot {
    /// Per-application totals, most used first.
    pub apps: Vec<UsageEntry>,
    pub total_seconds: u64,
}

impl UsageSnapshot {
    pub fn new(apps: Vec<UsageEntry>) -> Self {
        let total_seconds = apps.iter().map(|entry| entry.seconds).sum();
        Self { apps, total_seconds }
    }

    pub fn top(&self) -> Option<&UsageEntry> {
        self.apps.first()
    }
}

pub struct ActivitySampler {
    icon_cache: HashMap<String, String>,
    current_date: NaiveDate,
}

impl ActivitySampler {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            icon_cache: HashMap::new(),
            current_date: today,
        }
    }

    /// Date samples are currently attributed to.
    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn cached_icon(&self, app_id: &str) -> Option<&String> {
        self.icon_cache.get(app_id)
    }

    /// Moves to the date of `now` if the day has changed.
    fn check_rollover(&mut self, now: &DateTime<Local>) {
        let today = now.date_naive();
        if today != self.current_date {
            self.current_date = today;
            msg_info!(Message::NewDayDetected(format_date(&today)));
        }
    }

    /// Takes one sample.
    ///
    /// Returns today's usage when a second was recorded.
    pub async fn sample<S: ActivitySource>(
        &mut self,
        source: &mut S,
        ledger: &mut UsageLedger,
        is_present: bool,
        now: DateTime<Local>,
    ) -> Option<UsageSnapshot> {
        self.check_rollover(&now);

        if !is_present {
            return None;
        }

        let window = source.foreground_window().await?;
        let date = self.current_date;
        let hour = now.hour();

        let icon = match self.icon_cache.get(&window.app_id) {
            Some(icon) => Some(icon.clone()),
            None => {
                let found = match ledger.stored_icon(&date, hour, &window.app_name) {
                    Some(stored) => Some(stored),
                    None => source.resolve_icon(&window.app_id).await,
                };
                if let Some(icon) = &found {
                    self.icon_cache.insert(window.app_id.clone(), icon.clone());
                }
                found
            }
        };

        ledger.credit_second(
            date,
            hour,
            &window.app_name,
            &window.window_title,
            icon.as_deref(),
            now.timestamp_millis(),
        );

        Some(UsageSnapshot::new(sorted_usage(&stats_for_date(ledger, &date))))
    }
}
