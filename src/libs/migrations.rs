//! Usage ledger schema migrations.
//!
//! The ledger file has gone through three shapes:
//!
//! | Version | Shape                                   |
//! |---------|-----------------------------------------|
//! | 0       | `app -> entry` (no dates)               |
//! | 1       | `date -> app -> entry` (no hours)       |
//! | 2       | `date -> hour -> app -> entry`          |
//!
//! Each upgrade is a pure function over the raw JSON document registered
//! with [`MigrationManager::add_migration`]. Loading detects the version of
//! the document and runs every newer step in order. Entries that predate
//! hourly buckets are attributed to the hour the migration runs in.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use serde_json::json;
//! use truefocus::libs::migrations::{MigrationContext, MigrationManager};
//!
//! let ctx = MigrationContext {
//!     today: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
//!     hour: 9,
//! };
//! let legacy = json!({ "Code": { "name": "Code", "seconds": 120 } });
//! let (upgraded, from) = MigrationManager::new().run_migrations(legacy, &ctx).unwrap();
//!
//! assert_eq!(from, 0);
//! assert_eq!(upgraded["2025-01-06"]["9"]["Code"]["seconds"], 120);
//! ```

use crate::libs::messages::Message;
use crate::msg_debug;
use anyhow::Result;
use chrono::{Local, NaiveDate, Timelike};
use serde_json::{Map, Value};

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 2;

/// Wall-clock facts a migration may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationContext {
    pub today: NaiveDate,
    pub hour: u32,
}

impl MigrationContext {
    /// Context for the current local date and hour.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            today: now.date_naive(),
            hour: now.hour(),
        }
    }
}

type MigrationFn = fn(Value, &MigrationContext) -> Result<Value>;

#[derive(Debug, Clone)]
struct Migration {
    version: u32,
    name: &'static str,
    up: MigrationFn,
}

pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// True for `YYYY-MM-DD` keys.
pub fn is_date_key(key: &str) -> bool {
    key.len() == 10 && NaiveDate::parse_from_str(key, "%Y-%m-%d").is_ok()
}

/// True for one or two digit hour keys.
pub fn is_hour_key(key: &str) -> bool {
    (1..=2).contains(&key.len()) && key.chars().all(|c| c.is_ascii_digit())
}

fn has_hourly_structure(day: &Value) -> bool {
    match day.as_object() {
        Some(map) => map.keys().any(|key| is_hour_key(key)),
        None => false,
    }
}

impl MigrationManager {
    pub fn new() -> Self {
        let mut manager = Self { migrations: Vec::new() };
        manager.register_migrations();
        manager
    }

    fn register_migrations(&mut self) {
        // Version 1: flat per-app map moves under today's date
        self.add_migration(1, "wrap_flat_entries_in_today", |doc, ctx| {
            let mut hours = Map::new();
            hours.insert(ctx.hour.to_string(), doc);
            let mut days = Map::new();
            days.insert(ctx.today.format("%Y-%m-%d").to_string(), Value::Object(hours));
            Ok(Value::Object(days))
        });

        // Version 2: per-day maps gain an hour level
        self.add_migration(2, "split_days_into_hours", |doc, ctx| {
            let Value::Object(days) = doc else {
                anyhow::bail!("ledger document is not an object");
            };

            let mut upgraded = Map::new();
            for (date_key, day) in days {
                if !is_date_key(&date_key) {
                    continue;
                }
                if has_hourly_structure(&day) {
                    upgraded.insert(date_key, day);
                } else {
                    let mut hours = Map::new();
                    hours.insert(ctx.hour.to_string(), day);
                    upgraded.insert(date_key, Value::Object(hours));
                }
            }
            Ok(Value::Object(upgraded))
        });
    }

    fn add_migration(&mut self, version: u32, name: &'static str, up: MigrationFn) {
        self.migrations.push(Migration { version, name, up });
    }

    /// Detects the schema version of a raw ledger document.
    ///
    /// An empty document is considered current.
    ///
    /// # Errors
    ///
    /// Fails when the document is not a JSON object.
    pub fn detect_version(doc: &Value) -> Result<u32> {
        let Some(map) = doc.as_object() else {
            anyhow::bail!("ledger document is not an object");
        };

        if map.is_empty() {
            return Ok(CURRENT_VERSION);
        }

        if !map.keys().any(|key| is_date_key(key)) {
            return Ok(0);
        }

        let all_hourly = map
            .iter()
            .filter(|(key, _)| is_date_key(key))
            .all(|(_, day)| has_hourly_structure(day));

        Ok(if all_hourly { CURRENT_VERSION } else { 1 })
    }

    /// Upgrades `doc` to the current schema.
    ///
    /// Returns the upgraded document and the version it started from.
    pub fn run_migrations(&self, doc: Value, ctx: &MigrationContext) -> Result<(Value, u32)> {
        let from = Self::detect_version(&doc)?;
        let mut doc = doc;

        for migration in self.migrations.iter().filter(|m| m.version > from) {
            doc = (migration.up)(doc, ctx)?;
            msg_debug!(Message::LedgerMigrationApplied {
                version: migration.version,
                name: migration.name.to_string(),
            });
        }

        Ok((doc, from))
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.iter().map(|m| m.version).max().unwrap_or(0)
    }
}
