//! Short-window vs. baseline spend comparison.
//!
//! The baseline is expected to cover a materially longer window than the
//! current one (at least twice as long); `detect` does not enforce this.

use serde::Serialize;

use crate::trend::delta_percent;
use crate::types::{Aggregate, DeltaPercent};

/// Any change of at least this many percent is critical.
pub const CRITICAL_PERCENT: f64 = 50.0;

/// Minimum absolute dollar impact over the current window for `High`.
pub const HIGH_IMPACT_FLOOR: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Moderate,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Moderate => write!(f, "moderate"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyEvent {
    pub dimension_key: String,
    pub current_avg: f64,
    pub baseline_avg: f64,
    pub delta_percent: DeltaPercent,
    pub severity: Severity,
    /// Per-day change multiplied by the current window length.
    pub impact_total: f64,
}

fn severity(magnitude: f64, impact_total: f64) -> Severity {
    if magnitude >= CRITICAL_PERCENT {
        Severity::Critical
    } else if impact_total.abs() >= HIGH_IMPACT_FLOOR {
        Severity::High
    } else {
        Severity::Moderate
    }
}

/// Emit an event when the current average moved at least
/// `threshold_percent` away from the baseline average (inclusive).
pub fn detect(
    dimension_key: &str,
    current: &Aggregate,
    baseline: &Aggregate,
    threshold_percent: f64,
) -> Option<AnomalyEvent> {
    let delta = delta_percent(current.average_per_day, baseline.average_per_day);
    let magnitude = delta.magnitude();
    if magnitude < threshold_percent {
        return None;
    }

    let delta_amount = current.average_per_day - baseline.average_per_day;
    let impact_total = delta_amount * f64::from(current.window.length_days);

    Some(AnomalyEvent {
        dimension_key: dimension_key.to_string(),
        current_avg: current.average_per_day,
        baseline_avg: baseline.average_per_day,
        delta_percent: delta,
        severity: severity(magnitude, impact_total),
        impact_total,
    })
}

/// Most severe first, then largest absolute impact, then key.
pub fn sort_events(events: &mut [AnomalyEvent]) {
    events.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.impact_total.abs().total_cmp(&a.impact_total.abs()))
            .then_with(|| a.dimension_key.cmp(&b.dimension_key))
    });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::Window;

    fn agg(len: i64, avg: f64) -> Aggregate {
        let end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let window = Window::ending(end, len).unwrap();
        Aggregate {
            dimension_key: "tenant-a".to_string(),
            window,
            total: avg * len as f64,
            average_per_day: avg,
            sample_count: len as usize,
        }
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let event = detect("tenant-a", &agg(3, 150.0), &agg(28, 100.0), 50.0).unwrap();
        assert_eq!(event.delta_percent, DeltaPercent::Finite(50.0));
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.impact_total, 150.0);
    }

    #[test]
    fn test_below_threshold_emits_nothing() {
        assert!(detect("tenant-a", &agg(3, 110.0), &agg(28, 100.0), 15.0).is_none());
    }

    #[test]
    fn test_high_requires_dollar_floor() {
        // +20% on $100/day over 7 days = $140 impact
        let high = detect("tenant-a", &agg(7, 120.0), &agg(28, 100.0), 15.0).unwrap();
        assert_eq!(high.severity, Severity::High);

        // +20% on $1/day is trivial
        let moderate = detect("tenant-a", &agg(7, 1.2), &agg(28, 1.0), 15.0).unwrap();
        assert_eq!(moderate.severity, Severity::Moderate);
    }

    #[test]
    fn test_drops_are_anomalies_too() {
        let event = detect("tenant-a", &agg(7, 40.0), &agg(28, 100.0), 15.0).unwrap();
        assert_eq!(event.delta_percent, DeltaPercent::Finite(-60.0));
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.impact_total, -420.0);
    }

    #[test]
    fn test_zero_baseline_is_new_spend() {
        let event = detect("tenant-a", &agg(7, 5.0), &agg(28, 0.0), 15.0).unwrap();
        assert_eq!(event.delta_percent, DeltaPercent::NewSpend);
        assert_eq!(event.severity, Severity::Critical);
    }

    #[test]
    fn test_all_zero_is_quiet() {
        assert!(detect("tenant-a", &agg(7, 0.0), &agg(28, 0.0), 15.0).is_none());
    }

    #[test]
    fn test_deterministic() {
        let a = detect("tenant-a", &agg(7, 133.0), &agg(28, 100.0), 15.0);
        let b = detect("tenant-a", &agg(7, 133.0), &agg(28, 100.0), 15.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sort_orders_by_severity_then_impact() {
        let mut events = vec![
            detect("small", &agg(7, 1.2), &agg(28, 1.0), 15.0).unwrap(),
            detect("big", &agg(7, 300.0), &agg(28, 100.0), 15.0).unwrap(),
            detect("mid", &agg(7, 120.0), &agg(28, 100.0), 15.0).unwrap(),
        ];
        sort_events(&mut events);
        let keys: Vec<&str> = events.iter().map(|e| e.dimension_key.as_str()).collect();
        assert_eq!(keys, vec!["big", "mid", "small"]);
    }
}
