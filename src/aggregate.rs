use serde::Serialize;

use crate::error::ValidationError;
use crate::types::{Aggregate, CostRecord, TimeSeries, Window};

/// Sum a series over `window`.
///
/// The per-day average divides by the window's nominal length, so a
/// dimension with three days of data in a seven-day window reports less than
/// one with seven days of identical spend. A window with no data yields a
/// zero aggregate with `sample_count == 0`.
pub fn aggregate(series: &TimeSeries, window: &Window) -> Aggregate {
    let hits = series.in_window(window);
    let total = sum(hits);

    Aggregate {
        dimension_key: series.dimension_key().to_string(),
        window: *window,
        total,
        average_per_day: total / f64::from(window.length_days),
        sample_count: hits.len(),
    }
}

fn sum(records: &[CostRecord]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}

/// Trailing average ending on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingAverage {
    pub end_date: chrono::NaiveDate,
    pub average_per_day: f64,
}

/// Single forward pass over a series yielding one trailing average per
/// recorded day, starting at the `window_length`-th record.
pub struct RollingWindows<'a> {
    records: &'a [CostRecord],
    length_days: i64,
    next: usize,
    tail: usize,
}

/// Trailing `window_length`-day averages for every record from the
/// `window_length`-th onward. Re-request the iterator to walk it again.
pub fn rolling_windows(
    series: &TimeSeries,
    window_length: i64,
) -> Result<RollingWindows<'_>, ValidationError> {
    if window_length <= 0 {
        return Err(ValidationError::NonPositiveWindow {
            name: "window_length",
            value: window_length,
        });
    }
    let first = usize::try_from(window_length - 1).unwrap_or(usize::MAX);
    Ok(RollingWindows {
        records: series.records(),
        length_days: window_length,
        next: first,
        tail: 0,
    })
}

impl Iterator for RollingWindows<'_> {
    type Item = RollingAverage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let end = self.records.get(self.next)?;
            self.next += 1;

            // Dates too close to the calendar minimum can't host the window.
            let Ok(window) = Window::ending(end.date, self.length_days) else {
                continue;
            };

            while self.records[self.tail].date < window.start_date {
                self.tail += 1;
            }
            let total = sum(&self.records[self.tail..self.next]);

            return Some(RollingAverage {
                end_date: end.date,
                average_per_day: total / f64::from(window.length_days),
            });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.next);
        (0, Some(remaining))
    }
}
