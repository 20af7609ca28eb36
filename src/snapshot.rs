// Day-over-day tracking of one headline number per scheme.
//
// The store is an explicit value owned by the caller: load it, feed it the
// fresh datasets, save it. Nothing here is global.
use crate::error::Result;
use crate::identity::{is_total_row, is_unit_row, resolve_identity_keys};
use crate::types::Dataset;
use crate::util::{cell_or_zero, parse_cell};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub curr_value: f64,
    pub prev_value: Option<f64>,
    pub curr_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyDelta {
    pub current: f64,
    pub previous: Option<f64>,
    pub change: Option<f64>,
}

impl SnapshotRecord {
    /// Fold today's observation into a record. A new calendar day rolls the
    /// current value into `prev_value`; a repeat refresh on the same day only
    /// replaces the current value.
    pub fn advance(previous: Option<&SnapshotRecord>, value: f64, today: NaiveDate, now: DateTime<Utc>) -> Self {
        let prev_value = match previous {
            Some(p) if p.curr_date < today => Some(p.curr_value),
            Some(p) => p.prev_value,
            None => None,
        };
        SnapshotRecord {
            curr_value: value,
            prev_value,
            curr_date: today,
            last_updated: now,
        }
    }

    pub fn delta(&self) -> DailyDelta {
        DailyDelta {
            current: self.curr_value,
            previous: self.prev_value,
            change: self.prev_value.map(|p| self.curr_value - p),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotStore {
    records: BTreeMap<String, SnapshotRecord>,
}

impl SnapshotStore {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let s = serde_json::to_string_pretty(self)?;
        std::fs::write(path, s)?;
        Ok(())
    }

    pub fn observe(&mut self, scheme: &str, value: f64, today: NaiveDate, now: DateTime<Utc>) -> DailyDelta {
        let record = SnapshotRecord::advance(self.records.get(scheme), value, today, now);
        let delta = record.delta();
        debug!(scheme, current = delta.current, previous = ?delta.previous, "snapshot updated");
        self.records.insert(scheme.to_string(), record);
        delta
    }
}

/// First column whose label carries the marker character.
pub fn headline_column(labels: &[String], marker: char) -> Option<&String> {
    labels.iter().find(|l| l.contains(marker))
}

/// The headline number for a dataset: the Total row's value when it parses,
/// otherwise the sum over unit rows. `None` without a marked column.
pub fn headline_value(dataset: &Dataset, marker: char) -> Option<f64> {
    let labels = dataset.columns();
    let column = headline_column(&labels, marker)?;
    let keys = resolve_identity_keys(&labels);
    let rows = dataset.rows();
    if let Some(v) = rows
        .iter()
        .filter(|r| is_total_row(r, &keys))
        .find_map(|r| parse_cell(r.get(column)))
    {
        return Some(v);
    }
    Some(
        rows.iter()
            .filter(|r| is_unit_row(r, &keys))
            .map(|r| cell_or_zero(r.get(column)))
            .sum(),
    )
}
