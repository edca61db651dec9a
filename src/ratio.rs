use serde::Serialize;

/// Fraction of the healthy cap at which a ratio starts to warn.
pub const WARNING_MARGIN: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioStatus {
    Healthy,
    Warning,
    Alert,
}

impl std::fmt::Display for RatioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatioStatus::Healthy => write!(f, "healthy"),
            RatioStatus::Warning => write!(f, "warning"),
            RatioStatus::Alert => write!(f, "alert"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioClassification {
    /// `None` when the denominator is zero.
    pub ratio: Option<f64>,
    pub status: RatioStatus,
}

/// Classify `numerator_total / denominator_total` against `healthy_max_ratio`.
///
/// Spend with no denominator spend at all is an alert; nothing on either
/// side is healthy.
pub fn classify(
    numerator_total: f64,
    denominator_total: f64,
    healthy_max_ratio: f64,
) -> RatioClassification {
    if denominator_total <= 0.0 {
        let status = if numerator_total > 0.0 {
            RatioStatus::Alert
        } else {
            RatioStatus::Healthy
        };
        return RatioClassification {
            ratio: None,
            status,
        };
    }

    let ratio = numerator_total / denominator_total;
    let status = if ratio > healthy_max_ratio {
        RatioStatus::Alert
    } else if ratio > WARNING_MARGIN * healthy_max_ratio {
        RatioStatus::Warning
    } else {
        RatioStatus::Healthy
    };

    RatioClassification {
        ratio: Some(ratio),
        status,
    }
}
