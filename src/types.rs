use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// One row as handed over by a cost source, before validation.
///
/// The date is kept as text so that unparsable dates surface as a
/// `ValidationError` from normalization instead of a source-specific failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    #[serde(alias = "dimension", alias = "key")]
    pub dimension_key: String,
    pub amount: f64,
}

#[cfg(test)]
impl RawRecord {
    pub fn new(date: impl Into<String>, dimension_key: impl Into<String>, amount: f64) -> Self {
        Self {
            date: date.into(),
            dimension_key: dimension_key.into(),
            amount,
        }
    }
}

/// A validated cost figure for one dimension on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRecord {
    pub date: NaiveDate,
    pub dimension_key: String,
    pub amount: f64,
}

/// Per-day costs for a single dimension.
///
/// Dates are strictly ascending and unique. Missing days are not filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    dimension_key: String,
    records: Vec<CostRecord>,
}

impl TimeSeries {
    /// Build from a date-keyed map, which already guarantees the ordering invariant.
    pub fn from_daily(dimension_key: impl Into<String>, daily: BTreeMap<NaiveDate, f64>) -> Self {
        let dimension_key = dimension_key.into();
        let records = daily
            .into_iter()
            .map(|(date, amount)| CostRecord {
                date,
                dimension_key: dimension_key.clone(),
                amount,
            })
            .collect();
        Self {
            dimension_key,
            records,
        }
    }

    pub fn dimension_key(&self) -> &str {
        &self.dimension_key
    }

    pub fn records(&self) -> &[CostRecord] {
        &self.records
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// The same series with every record after `end` dropped.
    pub fn until(&self, end: NaiveDate) -> TimeSeries {
        let hi = self.records.partition_point(|r| r.date <= end);
        Self {
            dimension_key: self.dimension_key.clone(),
            records: self.records[..hi].to_vec(),
        }
    }

    /// Records whose date falls inside `window`, found by binary search.
    pub fn in_window(&self, window: &Window) -> &[CostRecord] {
        let lo = self.records.partition_point(|r| r.date < window.start_date);
        let hi = self.records.partition_point(|r| r.date <= window.end_date);
        &self.records[lo..hi.max(lo)]
    }
}

/// A contiguous, inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub length_days: u32,
}

impl Window {
    /// The `length_days`-day window whose last day is `end_date`.
    pub fn ending(end_date: NaiveDate, length_days: i64) -> Result<Self, ValidationError> {
        if length_days <= 0 {
            return Err(ValidationError::NonPositiveWindow {
                name: "length_days",
                value: length_days,
            });
        }
        let out_of_range = || ValidationError::WindowOutOfRange {
            end: end_date.to_string(),
            length_days,
        };
        let length = u32::try_from(length_days).map_err(|_| out_of_range())?;
        let start_date = end_date
            .checked_sub_days(Days::new(u64::from(length - 1)))
            .ok_or_else(out_of_range)?;
        Ok(Self {
            start_date,
            end_date,
            length_days: length,
        })
    }

    /// The window of `length_days` that ends the day before this one starts.
    pub fn preceding(&self, length_days: i64) -> Result<Self, ValidationError> {
        let end = self
            .start_date
            .pred_opt()
            .ok_or_else(|| ValidationError::WindowOutOfRange {
                end: self.start_date.to_string(),
                length_days,
            })?;
        Self::ending(end, length_days)
    }

    /// Same length, immediately before this window.
    pub fn previous(&self) -> Result<Self, ValidationError> {
        self.preceding(i64::from(self.length_days))
    }
}

/// Sum and nominal per-day average of one dimension over one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub dimension_key: String,
    pub window: Window,
    pub total: f64,
    /// Always `total / window.length_days`, even when days are missing.
    pub average_per_day: f64,
    /// Number of days that actually had data inside the window.
    pub sample_count: usize,
}

impl Aggregate {
    /// At least half of the window's days carry data.
    pub fn is_trustworthy(&self) -> bool {
        self.sample_count as u64 * 2 >= u64::from(self.window.length_days)
    }
}

/// Signed percentage change, or the sentinel for spend appearing from nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeltaPercent {
    Finite(f64),
    /// Previous/baseline average was zero and the current one is positive.
    NewSpend,
}

impl DeltaPercent {
    /// Absolute size of the change; `NewSpend` is larger than any finite change.
    pub fn magnitude(&self) -> f64 {
        match self {
            DeltaPercent::Finite(v) => v.abs(),
            DeltaPercent::NewSpend => f64::INFINITY,
        }
    }
}

impl Serialize for DeltaPercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeltaPercent::Finite(v) => serializer.serialize_f64(*v),
            DeltaPercent::NewSpend => serializer.serialize_str("new_spend"),
        }
    }
}

impl std::fmt::Display for DeltaPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeltaPercent::Finite(v) => write!(f, "{v:+.1}%"),
            DeltaPercent::NewSpend => write!(f, "new spend"),
        }
    }
}
