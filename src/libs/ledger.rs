//! Hour-bucketed application usage ledger.
//!
//! The ledger maps `date -> hour -> application -> entry` and is persisted
//! as one pretty-printed JSON document (`truefocus-stats.json`) in the data
//! directory. Every flush rewrites the whole file.
//!
//! Loading never blocks startup: an unreadable or corrupt file is logged and
//! the ledger starts empty. Older document shapes are upgraded in memory by
//! [`MigrationManager`] and reach disk with the next flush.

use super::data_storage::DataStorage;
use super::migrations::{is_date_key, MigrationContext, MigrationManager};
use crate::libs::messages::Message;
use crate::{msg_debug, msg_info, msg_warning};
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE_NAME: &str = "truefocus-stats.json";

/// Accumulated usage of one application inside one hour bucket.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    /// Image data URL, `None` until an icon has been resolved.
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub seconds: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_active: i64,
}

pub type HourBucket = BTreeMap<String, UsageEntry>;
pub type DayBuckets = BTreeMap<u32, HourBucket>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageLedger {
    days: BTreeMap<NaiveDate, DayBuckets>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the ledger file.
    pub fn default_path() -> Result<PathBuf> {
        DataStorage::new().get_path(LEDGER_FILE_NAME)
    }

    /// Loads the ledger from `path`, upgrading old shapes.
    ///
    /// A missing file yields an empty ledger. Any other failure is logged
    /// and also yields an empty ledger.
    pub fn load(path: &Path, ctx: &MigrationContext) -> Self {
        if !path.exists() {
            return Self::new();
        }

        match Self::read(path, ctx) {
            Ok(ledger) => ledger,
            Err(e) => {
                msg_warning!(Message::LedgerLoadFailed(e.to_string()));
                Self::new()
            }
        }
    }

    fn read(path: &Path, ctx: &MigrationContext) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&raw)?;
        Self::from_value(doc, ctx)
    }

    /// Builds a ledger from a raw document of any supported version.
    ///
    /// Keys that are not dates or hours and entries that do not parse are
    /// skipped. A missing entry name falls back to the application key.
    pub fn from_value(doc: Value, ctx: &MigrationContext) -> Result<Self> {
        let (doc, from) = MigrationManager::new().run_migrations(doc, ctx)?;
        if from < super::migrations::CURRENT_VERSION {
            msg_info!(Message::LedgerMigrated {
                from,
                to: super::migrations::CURRENT_VERSION,
            });
        }

        let mut ledger = Self::new();
        let Value::Object(days) = doc else {
            return Ok(ledger);
        };

        for (date_key, day) in days {
            if !is_date_key(&date_key) {
                continue;
            }
            let Ok(date) = NaiveDate::parse_from_str(&date_key, "%Y-%m-%d") else {
                continue;
            };
            let Value::Object(hours) = day else {
                continue;
            };

            let buckets = ledger.days.entry(date).or_default();
            for (hour_key, apps) in hours {
                let Ok(hour) = hour_key.parse::<u32>() else {
                    continue;
                };
                if hour > 23 {
                    continue;
                }
                let Value::Object(apps) = apps else {
                    continue;
                };

                let bucket = buckets.entry(hour).or_default();
                for (app, entry) in apps {
                    match serde_json::from_value::<UsageEntry>(entry) {
                        Ok(mut entry) => {
                            if entry.name.is_empty() {
                                entry.name = app.clone();
                            }
                            bucket.insert(app, entry);
                        }
                        Err(e) => msg_debug!(Message::LedgerEntrySkipped {
                            app,
                            error: e.to_string(),
                        }),
                    }
                }
            }
        }

        Ok(ledger)
    }

    /// Current-schema JSON document.
    pub fn to_value(&self) -> Value {
        let mut days = Map::new();
        for (date, buckets) in &self.days {
            let mut hours = Map::new();
            for (hour, bucket) in buckets {
                let apps = bucket
                    .iter()
                    .map(|(app, entry)| (app.clone(), serde_json::to_value(entry).unwrap_or(Value::Null)))
                    .collect::<Map<String, Value>>();
                hours.insert(hour.to_string(), Value::Object(apps));
            }
            days.insert(date.format("%Y-%m-%d").to_string(), Value::Object(hours));
        }
        Value::Object(days)
    }

    /// Rewrites the ledger file with the full current contents.
    ///
    /// The document is written to a sibling temporary file first and then
    /// renamed over `path`, so an interrupted flush leaves the previous
    /// snapshot intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(&self.to_value())?;
        let staging = Self::staging_path(path);

        let mut file = File::create(&staging)?;
        file.write_all(body.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, path)?;
        Ok(())
    }

    /// Temporary file a flush writes before replacing the ledger.
    pub fn staging_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of dates in the ledger.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn day(&self, date: &NaiveDate) -> Option<&DayBuckets> {
        self.days.get(date)
    }

    pub fn hour_bucket(&self, date: &NaiveDate, hour: u32) -> Option<&HourBucket> {
        self.days.get(date).and_then(|day| day.get(&hour))
    }

    /// Bucket for `date`/`hour`, created on first use.
    pub fn hour_bucket_mut(&mut self, date: NaiveDate, hour: u32) -> &mut HourBucket {
        self.days.entry(date).or_default().entry(hour).or_default()
    }

    /// Stored icon for `app` in the given bucket, if any.
    pub fn stored_icon(&self, date: &NaiveDate, hour: u32, app: &str) -> Option<String> {
        self.hour_bucket(date, hour)
            .and_then(|bucket| bucket.get(app))
            .and_then(|entry| entry.icon.clone())
    }

    /// Credits one second of use to `app`.
    ///
    /// The title always follows the latest observation; the icon is only
    /// written while the entry has none.
    pub fn credit_second(
        &mut self,
        date: NaiveDate,
        hour: u32,
        app: &str,
        title: &str,
        icon: Option<&str>,
        now_ms: i64,
    ) -> &UsageEntry {
        let entry = self
            .hour_bucket_mut(date, hour)
            .entry(app.to_string())
            .or_insert_with(|| UsageEntry {
                name: app.to_string(),
                title: title.to_string(),
                icon: None,
                seconds: 0,
                last_active: now_ms,
            });

        entry.seconds += 1;
        entry.last_active = now_ms;
        entry.title = title.to_string();
        if entry.icon.is_none() {
            entry.icon = icon.map(str::to_string);
        }
        entry
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, date: NaiveDate, hour: u32, entry: UsageEntry) {
        self.hour_bucket_mut(date, hour).insert(entry.name.clone(), entry);
    }

    /// All dates with data, newest first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().rev().copied().collect()
    }
}
