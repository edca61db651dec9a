use thiserror::Error;

/// Malformed or semantically invalid input rejected at the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("negative amount {amount} for {dimension_key} on {date}")]
    NegativeAmount {
        dimension_key: String,
        date: String,
        amount: f64,
    },

    #[error("amount for {dimension_key} on {date} is not a finite number")]
    NonFiniteAmount { dimension_key: String, date: String },

    #[error("malformed date {raw:?} for {dimension_key}")]
    MalformedDate { dimension_key: String, raw: String },

    #[error("empty dimension key on {date}")]
    EmptyDimensionKey { date: String },

    #[error("{name} must be a positive number of days, got {value}")]
    NonPositiveWindow { name: &'static str, value: i64 },

    #[error("a {length_days}-day window ending {end} is outside the supported date range")]
    WindowOutOfRange { end: String, length_days: i64 },

    #[error("invalid {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_amount_message() {
        let err = ValidationError::NegativeAmount {
            dimension_key: "AmazonEC2".to_string(),
            date: "2024-03-01".to_string(),
            amount: -4.5,
        };
        assert_eq!(
            err.to_string(),
            "negative amount -4.5 for AmazonEC2 on 2024-03-01"
        );
    }

    #[test]
    fn test_window_message_names_the_parameter() {
        let err = ValidationError::NonPositiveWindow {
            name: "current_window_days",
            value: 0,
        };
        assert!(err.to_string().starts_with("current_window_days"));
    }
}
