use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{aggregate, rolling_windows, RollingAverage};
use crate::error::ValidationError;
use crate::trend::{delta_percent, direction, Direction};
use crate::types::{Aggregate, DeltaPercent, TimeSeries, Window};

pub const TOTAL_KEY: &str = "Total";

/// Days used to project a per-day average onto a month.
pub const DAYS_PER_MONTH: f64 = 30.0;

const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakDay {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Headline numbers for one series over one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub dimension_key: String,
    pub window: Window,
    pub total: f64,
    pub average_per_day: f64,
    pub monthly_projection: f64,
    /// `(max - min) / mean * 100` over the days that have data.
    pub volatility_percent: f64,
    pub peak: Option<PeakDay>,
    /// 7-day buckets aligned to the window end, oldest first. The oldest
    /// bucket is shorter when the window isn't a whole number of weeks.
    pub weekly: Vec<Aggregate>,
}

/// Fold every dimension into a single per-day total series.
pub fn combine<'a>(series: impl IntoIterator<Item = &'a TimeSeries>) -> TimeSeries {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for s in series {
        for r in s.records() {
            *daily.entry(r.date).or_insert(0.0) += r.amount;
        }
    }
    TimeSeries::from_daily(TOTAL_KEY, daily)
}

fn weekly_windows(window: &Window) -> Vec<Window> {
    let mut out = Vec::new();
    let mut end = window.end_date;
    let mut remaining = window.length_days;
    while remaining > 0 {
        let len = remaining.min(WEEK_DAYS);
        // Sub-windows of a valid window are always representable.
        let Ok(w) = Window::ending(end, i64::from(len)) else {
            break;
        };
        out.push(w);
        remaining -= len;
        match w.start_date.pred_opt() {
            Some(prev) => end = prev,
            None => break,
        }
    }
    out.reverse();
    out
}

pub fn summarize(series: &TimeSeries, window: &Window) -> SeriesSummary {
    let agg = aggregate(series, window);
    let hits = series.in_window(window);

    let (min, max) = hits.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.amount), hi.max(r.amount))
    });
    let volatility_percent = if hits.is_empty() {
        0.0
    } else {
        let mean = agg.total / hits.len() as f64;
        if mean > 0.0 {
            (max - min) / mean * 100.0
        } else {
            0.0
        }
    };

    // Strictly-greater keeps the earliest date on ties.
    let peak = hits.iter().fold(None::<PeakDay>, |best, r| match best {
        Some(b) if b.amount >= r.amount => Some(b),
        _ => Some(PeakDay {
            date: r.date,
            amount: r.amount,
        }),
    });

    let weekly = weekly_windows(window)
        .iter()
        .map(|w| aggregate(series, w))
        .collect();

    SeriesSummary {
        dimension_key: series.dimension_key().to_string(),
        window: *window,
        total: agg.total,
        average_per_day: agg.average_per_day,
        monthly_projection: agg.average_per_day * DAYS_PER_MONTH,
        volatility_percent,
        peak,
        weekly,
    }
}

/// Latest rolling average against the one `lag` points earlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingTrend {
    pub latest: RollingAverage,
    pub earlier: RollingAverage,
    pub delta_percent: DeltaPercent,
    pub direction: Direction,
}

pub fn rolling_trend_change(
    series: &TimeSeries,
    window_length: i64,
    lag: usize,
) -> Result<Option<RollingTrend>, ValidationError> {
    let points: Vec<RollingAverage> = rolling_windows(series, window_length)?.collect();
    if points.len() <= lag {
        return Ok(None);
    }
    let latest = points[points.len() - 1];
    let earlier = points[points.len() - 1 - lag];
    let delta = delta_percent(latest.average_per_day, earlier.average_per_day);

    Ok(Some(RollingTrend {
        latest,
        earlier,
        delta_percent: delta,
        direction: direction(delta),
    }))
}
