//! Read-side aggregation over the usage ledger.
//!
//! Everything here is a pure function of a borrowed [`UsageLedger`]; nothing
//! is cached and the ledger is never modified.
//!
//! - [`stats_for_date`]: per-application totals for one day
//! - [`stats_for_date_range`]: the same, for every ledger day in a range
//! - [`weekly_summary`]: seven-day totals, daily totals, top applications
//!   and category totals
//! - [`category_totals`]: seconds per [`Category`] for a set of entries

use super::category::Category;
use super::ledger::{DayBuckets, UsageEntry, UsageLedger};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

/// Per-application totals keyed by application name.
pub type AppTotals = BTreeMap<String, UsageEntry>;

#[derive(Debug, Clone, PartialEq)]
pub struct TopApp {
    pub name: String,
    pub icon: Option<String>,
    pub seconds: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    /// Seven consecutive days starting at the requested date.
    pub dates: Vec<NaiveDate>,
    pub total_seconds: u64,
    /// Total for every date in `dates`, zero when nothing was recorded.
    pub daily_totals: BTreeMap<NaiveDate, u64>,
    pub top_apps: BTreeMap<String, TopApp>,
    pub categories: BTreeMap<Category, u64>,
}

impl WeeklySummary {
    /// Top applications, most used first.
    pub fn ranked_apps(&self) -> Vec<&TopApp> {
        let mut apps: Vec<&TopApp> = self.top_apps.values().collect();
        apps.sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.name.cmp(&b.name)));
        apps
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Folds every hour of a day into one entry per application.
///
/// Seconds are summed. Title and last-active time come from the most recent
/// observation; the icon is the first one found.
fn aggregate_day(day: &DayBuckets) -> AppTotals {
    let mut totals = AppTotals::new();

    for bucket in day.values() {
        for (app, entry) in bucket {
            let total = totals.entry(app.clone()).or_insert_with(|| UsageEntry {
                seconds: 0,
                ..entry.clone()
            });

            total.seconds += entry.seconds;
            if entry.last_active > total.last_active {
                total.last_active = entry.last_active;
                total.title = entry.title.clone();
            }
            if total.icon.is_none() {
                total.icon = entry.icon.clone();
            }
        }
    }

    totals
}

pub fn stats_for_date(ledger: &UsageLedger, date: &NaiveDate) -> AppTotals {
    ledger.day(date).map(aggregate_day).unwrap_or_default()
}

/// Per-day totals for every ledger date in `start..=end`.
///
/// Dates without recorded usage are absent from the result.
pub fn stats_for_date_range(ledger: &UsageLedger, start: &NaiveDate, end: &NaiveDate) -> BTreeMap<NaiveDate, AppTotals> {
    ledger
        .dates()
        .into_iter()
        .filter(|date| date >= start && date <= end)
        .filter_map(|date| ledger.day(&date).map(|day| (date, aggregate_day(day))))
        .collect()
}

/// Entries sorted by seconds, most used first.
pub fn sorted_usage(totals: &AppTotals) -> Vec<UsageEntry> {
    let mut entries: Vec<UsageEntry> = totals.values().cloned().collect();
    entries.sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.name.cmp(&b.name)));
    entries
}

pub fn total_seconds(totals: &AppTotals) -> u64 {
    totals.values().map(|entry| entry.seconds).sum()
}

pub fn category_totals<'a>(entries: impl IntoIterator<Item = &'a UsageEntry>) -> BTreeMap<Category, u64> {
    let mut totals = Category::empty_totals();
    for entry in entries {
        *totals.entry(Category::of(&entry.name, &entry.title)).or_insert(0) += entry.seconds;
    }
    totals
}

pub fn weekly_summary(ledger: &UsageLedger, start: &NaiveDate) -> WeeklySummary {
    let dates: Vec<NaiveDate> = (0..7).filter_map(|offset| start.checked_add_days(Days::new(offset))).collect();

    let mut summary = WeeklySummary {
        dates: dates.clone(),
        total_seconds: 0,
        daily_totals: dates.iter().map(|date| (*date, 0)).collect(),
        top_apps: BTreeMap::new(),
        categories: Category::empty_totals(),
    };

    for date in &dates {
        let Some(day) = ledger.day(date) else {
            continue;
        };

        for bucket in day.values() {
            for (app, entry) in bucket {
                summary.total_seconds += entry.seconds;
                *summary.daily_totals.entry(*date).or_insert(0) += entry.seconds;
                *summary
                    .categories
                    .entry(Category::of(&entry.name, &entry.title))
                    .or_insert(0) += entry.seconds;

                let top = summary.top_apps.entry(app.clone()).or_insert_with(|| TopApp {
                    name: entry.name.clone(),
                    icon: None,
                    seconds: 0,
                });
                top.seconds += entry.seconds;
                top.name = entry.name.clone();
                if entry.icon.is_some() {
                    top.icon = entry.icon.clone();
                }
            }
        }
    }

    summary
}
