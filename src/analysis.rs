use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::aggregate;
use crate::anomaly::{detect, sort_events, AnomalyEvent};
use crate::error::ValidationError;
use crate::rank::{rank, RankedBreakdown};
use crate::ratio::{classify, RatioClassification};
use crate::summary::{combine, summarize, SeriesSummary};
use crate::trend::{compare, TrendResult};
use crate::types::{Aggregate, TimeSeries, Window};

/// Numeric knobs for one analysis. Nothing here is read from global state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub anomaly_threshold_percent: f64,
    pub healthy_max_ratio: f64,
    pub top_n: usize,
    pub current_window_days: i64,
    pub baseline_window_days: i64,
    pub rolling_window_days: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold_percent: 15.0,
            healthy_max_ratio: 0.3,
            top_n: 10,
            current_window_days: 7,
            baseline_window_days: 28,
            rolling_window_days: 7,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("current_window_days", self.current_window_days),
            ("baseline_window_days", self.baseline_window_days),
            ("rolling_window_days", self.rolling_window_days),
        ] {
            if value <= 0 {
                return Err(ValidationError::NonPositiveWindow { name, value });
            }
        }
        if !self.anomaly_threshold_percent.is_finite() || self.anomaly_threshold_percent <= 0.0 {
            return Err(ValidationError::InvalidThreshold {
                name: "anomaly_threshold_percent",
                value: self.anomaly_threshold_percent,
            });
        }
        if !self.healthy_max_ratio.is_finite() || self.healthy_max_ratio <= 0.0 {
            return Err(ValidationError::InvalidThreshold {
                name: "healthy_max_ratio",
                value: self.healthy_max_ratio,
            });
        }
        let short_baseline = self
            .current_window_days
            .checked_mul(2)
            .map_or(true, |twice| self.baseline_window_days < twice);
        if short_baseline {
            warn!(
                baseline = self.baseline_window_days,
                current = self.current_window_days,
                "baseline window is shorter than twice the current window; anomalies will be noisy"
            );
        }
        Ok(())
    }
}

/// Which dimensions feed each side of the ratio (exact key match).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioRequest {
    pub numerator: Vec<String>,
    pub denominator: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Last day of the current window. Defaults to the latest day in the data.
    pub end_date: Option<NaiveDate>,
    pub config: AnalysisConfig,
    /// Case-insensitive substring a dimension key must contain.
    pub dimension_filter: Option<String>,
    pub ratio: Option<RatioRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Windows {
    pub current: Window,
    pub previous: Window,
    pub baseline: Window,
}

impl Windows {
    pub fn for_end(end: NaiveDate, config: &AnalysisConfig) -> Result<Self, ValidationError> {
        let current = Window::ending(end, config.current_window_days)?;
        Ok(Self {
            current,
            previous: current.previous()?,
            baseline: current.preceding(config.baseline_window_days)?,
        })
    }

    /// Everything from the earliest window start to the current end.
    pub fn lookback(&self) -> Result<Window, ValidationError> {
        let start = self.baseline.start_date.min(self.previous.start_date);
        let days = (self.current.end_date - start).num_days() + 1;
        Window::ending(self.current.end_date, days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioReport {
    pub numerator_keys: Vec<String>,
    pub denominator_keys: Vec<String>,
    pub numerator_total: f64,
    pub denominator_total: f64,
    pub healthy_max_ratio: f64,
    #[serde(flatten)]
    pub classification: RatioClassification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub windows: Windows,
    /// Current-window aggregate of every analysed dimension, by key.
    pub aggregates: Vec<Aggregate>,
    pub breakdown: RankedBreakdown,
    pub overall: TrendResult,
    pub trends: Vec<TrendResult>,
    pub anomalies: Vec<AnomalyEvent>,
    /// Dimensions whose current window is too sparse for trends or anomalies.
    pub insufficient_data: Vec<String>,
    pub summary: SeriesSummary,
    pub ratio: Option<RatioReport>,
}

struct DimensionWindows {
    current: Aggregate,
    previous: Aggregate,
    baseline: Aggregate,
}

/// Case-insensitive substring match; no filter matches everything.
pub fn matches_filter(key: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(needle) => key.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Latest day with data across all series.
pub fn latest_date(series: &BTreeMap<String, TimeSeries>) -> Option<NaiveDate> {
    series.values().filter_map(TimeSeries::last_date).max()
}

fn ratio_report(
    series: &BTreeMap<String, TimeSeries>,
    window: &Window,
    request: &RatioRequest,
    healthy_max_ratio: f64,
) -> RatioReport {
    let side = |keys: &[String]| -> (Vec<String>, f64) {
        let mut found = Vec::new();
        let mut total = 0.0;
        for key in keys {
            if let Some(s) = series.get(key) {
                total += aggregate(s, window).total;
                found.push(key.clone());
            } else {
                debug!(dimension = %key, "ratio dimension has no data");
            }
        }
        (found, total)
    };
    let (numerator_keys, numerator_total) = side(&request.numerator);
    let (denominator_keys, denominator_total) = side(&request.denominator);

    RatioReport {
        numerator_keys,
        denominator_keys,
        numerator_total,
        denominator_total,
        healthy_max_ratio,
        classification: classify(numerator_total, denominator_total, healthy_max_ratio),
    }
}

/// Run the full pipeline over normalized series.
///
/// Returns `Ok(None)` when there is no data and no explicit end date, so
/// there is nothing to anchor the windows on.
pub fn analyze(
    series: &BTreeMap<String, TimeSeries>,
    request: &AnalysisRequest,
) -> Result<Option<Report>, ValidationError> {
    let config = &request.config;
    config.validate()?;

    let Some(end) = request.end_date.or_else(|| latest_date(series)) else {
        return Ok(None);
    };
    let windows = Windows::for_end(end, config)?;

    let selected: Vec<&TimeSeries> = series
        .values()
        .filter(|s| matches_filter(s.dimension_key(), request.dimension_filter.as_deref()))
        .collect();
    debug!(
        dimensions = selected.len(),
        end = %end,
        "aggregating current, previous and baseline windows"
    );

    let per_dimension: Vec<DimensionWindows> = selected
        .par_iter()
        .map(|s| DimensionWindows {
            current: aggregate(s, &windows.current),
            previous: aggregate(s, &windows.previous),
            baseline: aggregate(s, &windows.baseline),
        })
        .collect();

    let mut trends = Vec::new();
    let mut anomalies = Vec::new();
    let mut insufficient_data = Vec::new();
    for dim in &per_dimension {
        if !dim.current.is_trustworthy() {
            insufficient_data.push(dim.current.dimension_key.clone());
            continue;
        }
        trends.push(compare(&dim.current, &dim.previous));
        if let Some(event) = detect(
            &dim.current.dimension_key,
            &dim.current,
            &dim.baseline,
            config.anomaly_threshold_percent,
        ) {
            anomalies.push(event);
        }
    }
    sort_events(&mut anomalies);
    if !insufficient_data.is_empty() {
        debug!(
            count = insufficient_data.len(),
            "skipped trend/anomaly checks for sparse dimensions"
        );
    }

    let aggregates: Vec<Aggregate> = per_dimension.into_iter().map(|d| d.current).collect();
    let breakdown = rank(&aggregates, config.top_n);

    let total = combine(selected.iter().copied());
    let overall = compare(
        &aggregate(&total, &windows.current),
        &aggregate(&total, &windows.previous),
    );
    let summary = summarize(&total, &windows.lookback()?);

    let ratio = request
        .ratio
        .as_ref()
        .map(|r| ratio_report(series, &windows.current, r, config.healthy_max_ratio));

    Ok(Some(Report {
        windows,
        aggregates,
        breakdown,
        overall,
        trends,
        anomalies,
        insufficient_data,
        summary,
        ratio,
    }))
}
