use std::cmp::Ordering;

use serde::Serialize;

use crate::types::Aggregate;

/// Key of the synthetic entry holding everything past the top N.
pub const OTHER_KEY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub dimension_key: String,
    pub total: f64,
    pub percent_of_total: f64,
    /// Number of dimensions folded into this entry; 0 for real dimensions.
    pub folded: usize,
}

impl RankedEntry {
    pub fn is_other(&self) -> bool {
        self.folded > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBreakdown {
    pub entries: Vec<RankedEntry>,
    pub grand_total: f64,
}

/// Largest total first; equal totals by ascending key.
fn by_total_desc(a: &Aggregate, b: &Aggregate) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then_with(|| a.dimension_key.cmp(&b.dimension_key))
}

fn percent_of(total: f64, grand_total: f64) -> f64 {
    if grand_total > 0.0 {
        total / grand_total * 100.0
    } else {
        0.0
    }
}

/// Rank aggregates by total and fold everything after `top_n` into `Other`.
pub fn rank(aggregates: &[Aggregate], top_n: usize) -> RankedBreakdown {
    let mut sorted: Vec<&Aggregate> = aggregates.iter().collect();
    sorted.sort_by(|a, b| by_total_desc(a, b));

    let cut = top_n.min(sorted.len());
    let (head, tail) = sorted.split_at(cut);

    let mut entries: Vec<RankedEntry> = head
        .iter()
        .map(|a| RankedEntry {
            dimension_key: a.dimension_key.clone(),
            total: a.total,
            percent_of_total: 0.0,
            folded: 0,
        })
        .collect();

    if !tail.is_empty() {
        entries.push(RankedEntry {
            dimension_key: OTHER_KEY.to_string(),
            total: tail.iter().map(|a| a.total).sum(),
            percent_of_total: 0.0,
            folded: tail.len(),
        });
    }

    // Summed over the emitted entries so the breakdown always adds up to
    // its own grand total. Summing the inputs in another order can round
    // differently once magnitudes are far apart.
    let grand_total: f64 = entries.iter().map(|e| e.total).sum();
    for e in &mut entries {
        e.percent_of_total = percent_of(e.total, grand_total);
    }

    RankedBreakdown {
        entries,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::Window;

    fn agg(key: &str, total: f64) -> Aggregate {
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        Aggregate {
            dimension_key: key.to_string(),
            window: Window::ending(end, 7).unwrap(),
            total,
            average_per_day: total / 7.0,
            sample_count: 7,
        }
    }

    fn other(r: &RankedBreakdown) -> Option<&RankedEntry> {
        r.entries.last().filter(|e| e.is_other())
    }

    #[test]
    fn test_other_bucket() {
        let input = vec![
            agg("e", 5.0),
            agg("b", 30.0),
            agg("a", 50.0),
            agg("d", 5.0),
            agg("c", 10.0),
        ];
        let r = rank(&input, 3);

        let totals: Vec<f64> = r.entries.iter().map(|e| e.total).collect();
        assert_eq!(totals, vec![50.0, 30.0, 10.0, 10.0]);
        let other = other(&r).unwrap();
        assert_eq!(other.dimension_key, OTHER_KEY);
        assert_eq!(other.folded, 2);

        let pct: f64 = r.entries.iter().map(|e| e.percent_of_total).sum();
        assert_eq!(pct, 100.0);
        assert_eq!(r.grand_total, 100.0);
    }

    #[test]
    fn test_sum_is_preserved() {
        let input: Vec<Aggregate> = (0..12)
            .map(|i| agg(&format!("dim-{i:02}"), f64::from(i) * 3.0 + 1.0))
            .collect();
        let expected: f64 = input.iter().map(|a| a.total).sum();
        let r = rank(&input, 4);
        let got: f64 = r.entries.iter().map(|e| e.total).sum();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_grand_total_is_sum_of_entries() {
        let input = vec![agg("big", 1e16), agg("x", 1.0), agg("y", 1.0)];
        let r = rank(&input, 1);
        assert_eq!(other(&r).unwrap().total, 2.0);
        let got: f64 = r.entries.iter().map(|e| e.total).sum();
        assert_eq!(got, r.grand_total);
        assert_eq!(r.grand_total, 1e16 + 2.0);
    }

    #[test]
    fn test_ties_break_on_key() {
        let input = vec![agg("zeta", 10.0), agg("alpha", 10.0), agg("mid", 20.0)];
        let r = rank(&input, 10);
        let keys: Vec<&str> = r.entries.iter().map(|e| e.dimension_key.as_str()).collect();
        assert_eq!(keys, vec!["mid", "alpha", "zeta"]);
        assert!(other(&r).is_none());
        assert!(r
            .entries
            .windows(2)
            .all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn test_zero_grand_total_has_zero_percentages() {
        let r = rank(&[agg("a", 0.0), agg("b", 0.0)], 1);
        assert!(r.entries.iter().all(|e| e.percent_of_total == 0.0));
        assert_eq!(r.entries.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let r = rank(&[], 5);
        assert!(r.entries.is_empty());
        assert_eq!(r.grand_total, 0.0);
    }

    #[test]
    fn test_exact_fit_has_no_other() {
        let r = rank(&[agg("a", 1.0), agg("b", 2.0)], 2);
        assert_eq!(r.entries.len(), 2);
        assert!(other(&r).is_none());
    }
}
