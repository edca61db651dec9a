use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};

use crate::error::ValidationError;
use crate::types::{RawRecord, TimeSeries};

/// Parse a billing date. Plain `YYYY-MM-DD` is what cost APIs return; full
/// RFC 3339 timestamps are accepted and truncated to their own calendar day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Group raw rows into one `TimeSeries` per dimension.
///
/// Rows sharing `(date, dimension_key)` are summed. Fails on the first
/// negative or non-finite amount, empty key or unparsable date.
pub fn normalize(raw: &[RawRecord]) -> Result<BTreeMap<String, TimeSeries>, ValidationError> {
    let mut grouped: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

    for r in raw {
        if r.dimension_key.is_empty() {
            return Err(ValidationError::EmptyDimensionKey {
                date: r.date.clone(),
            });
        }
        let date = parse_date(&r.date).ok_or_else(|| ValidationError::MalformedDate {
            dimension_key: r.dimension_key.clone(),
            raw: r.date.clone(),
        })?;
        if !r.amount.is_finite() {
            return Err(ValidationError::NonFiniteAmount {
                dimension_key: r.dimension_key.clone(),
                date: r.date.clone(),
            });
        }
        if r.amount < 0.0 {
            return Err(ValidationError::NegativeAmount {
                dimension_key: r.dimension_key.clone(),
                date: r.date.clone(),
                amount: r.amount,
            });
        }

        *grouped
            .entry(r.dimension_key.as_str())
            .or_default()
            .entry(date)
            .or_insert(0.0) += r.amount;
    }

    Ok(grouped
        .into_iter()
        .map(|(key, daily)| (key.to_string(), TimeSeries::from_daily(key, daily)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, key: &str, amount: f64) -> RawRecord {
        RawRecord::new(date, key, amount)
    }

    #[test]
    fn test_empty_input_gives_empty_map() {
        assert!(normalize(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_groups_and_sorts_by_date() {
        let input = vec![
            raw("2024-01-03", "ec2", 3.0),
            raw("2024-01-01", "ec2", 1.0),
            raw("2024-01-02", "rds", 7.0),
            raw("2024-01-02", "ec2", 2.0),
        ];
        let map = normalize(&input).unwrap();

        assert_eq!(map.len(), 2);
        let ec2 = &map["ec2"];
        let amounts: Vec<f64> = ec2.records().iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![1.0, 2.0, 3.0]);
        assert!(ec2.records().windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(map["rds"].records().len(), 1);
    }

    #[test]
    fn test_duplicate_rows_are_summed() {
        let input = vec![
            raw("2024-01-01", "ec2", 1.25),
            raw("2024-01-01", "ec2", 2.75),
        ];
        let map = normalize(&input).unwrap();
        assert_eq!(map["ec2"].records().len(), 1);
        assert_eq!(map["ec2"].records()[0].amount, 4.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = vec![
            raw("2024-01-02", "b", 2.0),
            raw("2024-01-01", "a", 1.0),
            raw("2024-01-01", "a", 1.0),
        ];
        assert_eq!(normalize(&input).unwrap(), normalize(&input).unwrap());
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let err = normalize(&[raw("2024-01-01", "ec2", -1.0)]).unwrap_err();
        assert!(matches!(err, ValidationError::NegativeAmount { .. }));
    }

    #[test]
    fn test_nan_amount_is_rejected() {
        let err = normalize(&[raw("2024-01-01", "ec2", f64::NAN)]).unwrap_err();
        assert!(matches!(err, ValidationError::NonFiniteAmount { .. }));
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let err = normalize(&[raw("01/02/2024", "ec2", 1.0)]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedDate {
                dimension_key: "ec2".to_string(),
                raw: "01/02/2024".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let err = normalize(&[raw("2024-01-01", "", 1.0)]).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyDimensionKey { .. }));
    }

    #[test]
    fn test_rfc3339_dates_collapse_to_day() {
        let input = vec![
            raw("2024-01-01T00:00:00Z", "ec2", 1.0),
            raw("2024-01-01", "ec2", 1.0),
        ];
        let map = normalize(&input).unwrap();
        assert_eq!(map["ec2"].records().len(), 1);
        assert_eq!(map["ec2"].records()[0].amount, 2.0);
    }
}
