use serde::Serialize;

use crate::types::{Aggregate, DeltaPercent};

/// Changes smaller than this many percent either way are reported as flat.
pub const FLAT_BAND_PERCENT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increasing,
    Decreasing,
    Flat,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Increasing => write!(f, "increasing"),
            Direction::Decreasing => write!(f, "decreasing"),
            Direction::Flat => write!(f, "flat"),
        }
    }
}

/// Current window compared against the window immediately before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub dimension_key: String,
    pub current: Aggregate,
    pub previous: Aggregate,
    pub delta_amount: f64,
    pub delta_percent: DeltaPercent,
    pub direction: Direction,
}

/// Percentage change from `previous_avg` to `current_avg`.
///
/// A zero previous average with positive current spend is `NewSpend`;
/// both zero is a 0% change.
pub fn delta_percent(current_avg: f64, previous_avg: f64) -> DeltaPercent {
    if previous_avg > 0.0 {
        DeltaPercent::Finite((current_avg - previous_avg) / previous_avg * 100.0)
    } else if current_avg > 0.0 {
        DeltaPercent::NewSpend
    } else {
        DeltaPercent::Finite(0.0)
    }
}

pub fn direction(delta: DeltaPercent) -> Direction {
    match delta {
        DeltaPercent::NewSpend => Direction::Increasing,
        DeltaPercent::Finite(p) if p > FLAT_BAND_PERCENT => Direction::Increasing,
        DeltaPercent::Finite(p) if p < -FLAT_BAND_PERCENT => Direction::Decreasing,
        DeltaPercent::Finite(_) => Direction::Flat,
    }
}

pub fn compare(current: &Aggregate, previous: &Aggregate) -> TrendResult {
    let delta = delta_percent(current.average_per_day, previous.average_per_day);
    TrendResult {
        dimension_key: current.dimension_key.clone(),
        current: current.clone(),
        previous: previous.clone(),
        delta_amount: current.average_per_day - previous.average_per_day,
        delta_percent: delta,
        direction: direction(delta),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::Window;

    fn agg(end: &str, avg: f64) -> Aggregate {
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap();
        let window = Window::ending(end, 7).unwrap();
        Aggregate {
            dimension_key: "compute".to_string(),
            window,
            total: avg * 7.0,
            average_per_day: avg,
            sample_count: 7,
        }
    }

    #[test]
    fn test_simple_increase() {
        let t = compare(&agg("2024-01-14", 100.0), &agg("2024-01-07", 80.0));
        assert_eq!(t.delta_amount, 20.0);
        assert_eq!(t.delta_percent, DeltaPercent::Finite(25.0));
        assert_eq!(t.direction, Direction::Increasing);
        assert_eq!(t.dimension_key, "compute");
    }

    #[test]
    fn test_decrease() {
        let t = compare(&agg("2024-01-14", 50.0), &agg("2024-01-07", 100.0));
        assert_eq!(t.delta_percent, DeltaPercent::Finite(-50.0));
        assert_eq!(t.direction, Direction::Decreasing);
    }

    #[test]
    fn test_small_change_is_flat() {
        let t = compare(&agg("2024-01-14", 100.4), &agg("2024-01-07", 100.0));
        assert_eq!(t.direction, Direction::Flat);

        let t = compare(&agg("2024-01-14", 99.6), &agg("2024-01-07", 100.0));
        assert_eq!(t.direction, Direction::Flat);
    }

    #[test]
    fn test_zero_previous_is_new_spend() {
        let t = compare(&agg("2024-01-14", 12.0), &agg("2024-01-07", 0.0));
        assert_eq!(t.delta_percent, DeltaPercent::NewSpend);
        assert_eq!(t.direction, Direction::Increasing);
        assert_eq!(t.delta_amount, 12.0);
    }

    #[test]
    fn test_both_zero_is_flat() {
        let t = compare(&agg("2024-01-14", 0.0), &agg("2024-01-07", 0.0));
        assert_eq!(t.delta_percent, DeltaPercent::Finite(0.0));
        assert_eq!(t.direction, Direction::Flat);
    }
}
