use super::category::Category;
use super::formatter::{format_countdown, format_date, format_duration, progress_percent};
use super::ledger::{DayBuckets, UsageEntry};
use super::messages::macros::is_debug_mode;
use super::report::{AppTotals, WeeklySummary};
use super::sampler::UsageSnapshot;
use super::session::{BreakLength, Mode, PauseReason, SessionSnapshot, TimerState};
use chrono::NaiveDate;
use prettytable::{row, Table};
use std::collections::BTreeMap;
use std::io::Write;

pub struct View {}

fn share(seconds: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{}%", seconds * 100 / total)
}

impl View {
    /// Per-application usage, most used first.
    pub fn usage(entries: &[UsageEntry]) {
        let total: u64 = entries.iter().map(|entry| entry.seconds).sum();
        let mut table = Table::new();

        table.add_row(row!["#", "APPLICATION", "CATEGORY", "TIME", "SHARE", "LAST TITLE"]);
        for (index, entry) in entries.iter().enumerate() {
            table.add_row(row![
                index + 1,
                entry.name,
                Category::of(&entry.name, &entry.title),
                format_duration(entry.seconds),
                share(entry.seconds, total),
                entry.title
            ]);
        }
        table.add_row(row!["", "TOTAL", "", format_duration(total), "", ""]);
        table.printstd();
    }

    pub fn categories(totals: &BTreeMap<Category, u64>) {
        let total: u64 = totals.values().sum();
        let mut table = Table::new();

        table.add_row(row!["CATEGORY", "TIME", "SHARE"]);
        for (category, seconds) in totals.iter().filter(|(_, seconds)| **seconds > 0) {
            table.add_row(row![
                format!("{} {}", category.icon(), category),
                format_duration(*seconds),
                share(*seconds, total)
            ]);
        }
        table.printstd();
    }

    /// Raw hour buckets of one day.
    pub fn hourly(day: &DayBuckets) {
        let mut table = Table::new();

        table.add_row(row!["HOUR", "APPLICATION", "TIME"]);
        for (hour, bucket) in day {
            let mut apps: Vec<&UsageEntry> = bucket.values().collect();
            apps.sort_by(|a, b| b.seconds.cmp(&a.seconds));
            for entry in apps {
                table.add_row(row![format!("{:02}:00", hour), entry.name, format_duration(entry.seconds)]);
            }
        }
        table.printstd();
    }

    pub fn weekly(summary: &WeeklySummary) {
        let mut days = Table::new();
        days.add_row(row!["DATE", "DAY", "TIME"]);
        for date in &summary.dates {
            let seconds = summary.daily_totals.get(date).copied().unwrap_or(0);
            days.add_row(row![format_date(date), date.format("%a"), format_duration(seconds)]);
        }
        days.add_row(row!["TOTAL", "", format_duration(summary.total_seconds)]);
        days.printstd();
    }

    pub fn top_apps(summary: &WeeklySummary) {
        let mut table = Table::new();
        table.add_row(row!["#", "APPLICATION", "TIME", "SHARE"]);
        for (index, app) in summary.ranked_apps().iter().enumerate() {
            table.add_row(row![
                index + 1,
                app.name,
                format_duration(app.seconds),
                share(app.seconds, summary.total_seconds)
            ]);
        }
        table.printstd();
    }

    /// Daily totals over a range of dates.
    pub fn range(stats: &BTreeMap<NaiveDate, AppTotals>) {
        let mut table = Table::new();
        let mut total = 0;

        table.add_row(row!["DATE", "APPS", "TIME"]);
        for (date, apps) in stats {
            let seconds: u64 = apps.values().map(|entry| entry.seconds).sum();
            total += seconds;
            table.add_row(row![format_date(date), apps.len(), format_duration(seconds)]);
        }
        table.add_row(row!["TOTAL", "", format_duration(total)]);
        table.printstd();
    }

    pub fn dates(dates: &[NaiveDate]) {
        let mut table = Table::new();
        table.add_row(row!["DATE", "DAY"]);
        for date in dates {
            table.add_row(row![format_date(date), date.format("%A")]);
        }
        table.printstd();
    }

    /// Redraws the status line in place.
    pub fn print_status(line: &str) {
        if is_debug_mode() {
            tracing::debug!("{}", line);
            return;
        }
        print!("\r{}\x1b[K", line);
        let _ = std::io::stdout().flush();
    }

    /// One-line timer status for the watch loop, followed by today's most used
    /// application and total once anything has been recorded.
    pub fn status_line(snapshot: &SessionSnapshot, distance_cm: Option<f64>, usage: &UsageSnapshot) -> String {
        let mode = match snapshot.mode {
            Mode::Work => "WORK",
            Mode::Break(BreakLength::Short) => "SHORT BREAK",
            Mode::Break(BreakLength::Long) => "LONG BREAK",
        };
        let state = match snapshot.state {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused(PauseReason::Manual) => "paused",
            TimerState::Paused(PauseReason::Auto) => "auto-paused",
        };
        let presence = match (snapshot.is_present, distance_cm) {
            (true, Some(cm)) => format!("present {:.0} cm", cm),
            (true, None) => "present".to_string(),
            (false, Some(cm)) => format!("absent {:.0} cm", cm),
            (false, None) => "absent".to_string(),
        };

        let mut line = format!(
            "⏱ {} {} [{}] {}% | cycle {} | {}",
            mode,
            format_countdown(snapshot.time_left),
            state,
            progress_percent(snapshot.time_left, snapshot.target),
            snapshot.cycle_count,
            presence
        );
        if let Some(top) = usage.top() {
            line.push_str(&format!(
                " | top {} {} | today {}",
                top.name,
                format_duration(top.seconds),
                format_duration(usage.total_seconds)
            ));
        }
        line
    }
}
