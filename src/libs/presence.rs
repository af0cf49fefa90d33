//! Presence monitoring.
//!
//! The presence sensor reports a loosely typed value (`"true"`, `"1"`,
//! `true` or `1` all mean somebody is at the desk). [`parse_presence`] is the
//! only place that interprets it.
//!
//! [`PresenceMonitor`] turns the stream of fetch results into
//! [`PresenceUpdate`]s. Every sample is forwarded, because break strikes are
//! counted per confirmed sample, but each update says whether the value
//! differs from the last one seen so that pause and resume logic only reacts
//! to edges. A failed fetch counts as absence.

use chrono::{DateTime, Local};
use serde_json::Value;

/// One successful read from the presence sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceSample {
    pub is_present: bool,
    pub distance_cm: Option<f64>,
}

/// Outcome of feeding one fetch result into the monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceUpdate {
    pub is_present: bool,
    /// True when `is_present` differs from the previously observed value.
    pub changed: bool,
}

/// Normalizes a raw sensor value into a presence flag.
pub fn parse_presence(value: &Value) -> bool {
    match value {
        Value::String(s) => matches!(s.trim(), "true" | "1"),
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Parses a distance reading in centimetres.
pub fn parse_distance(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct PresenceMonitor {
    last: Option<bool>,
    distance_cm: Option<f64>,
    last_changed_at: Option<DateTime<Local>>,
}

impl PresenceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fetch result. Errors are treated as absence and keep the
    /// previous distance reading.
    pub fn observe<E>(&mut self, result: Result<PresenceSample, E>) -> PresenceUpdate {
        let is_present = match result {
            Ok(sample) => {
                if sample.distance_cm.is_some() {
                    self.distance_cm = sample.distance_cm;
                }
                sample.is_present
            }
            Err(_) => false,
        };

        let changed = self.last != Some(is_present);
        if changed {
            self.last = Some(is_present);
            self.last_changed_at = Some(Local::now());
        }

        PresenceUpdate { is_present, changed }
    }

    /// Last observed presence; `None` before the first sample.
    pub fn is_present(&self) -> Option<bool> {
        self.last
    }

    pub fn distance_cm(&self) -> Option<f64> {
        self.distance_cm
    }

    pub fn last_changed_at(&self) -> Option<DateTime<Local>> {
        self.last_changed_at
    }
}
