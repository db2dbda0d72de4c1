use serde::{Deserialize, Serialize};
use std::fmt;

pub const PHISHING_LABEL: &str = "Phishing / Suspicious";
pub const LEGITIMATE_LABEL: &str = "Legitimate / Safe (still be cautious)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.5,
            high: 0.8,
        }
    }
}

impl RiskLevel {
    pub fn from_score(score: f64, thresholds: &RiskThresholds) -> Self {
        match score {
            s if s >= thresholds.high => RiskLevel::High,
            s if s >= thresholds.medium => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn verdict_label(is_phishing: bool) -> &'static str {
    if is_phishing {
        PHISHING_LABEL
    } else {
        LEGITIMATE_LABEL
    }
}

/// Probability in `[0,1]` as a percentage rounded to two decimals
pub fn as_percent(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let t = RiskThresholds::default();
        assert_eq!(RiskLevel::from_score(0.0, &t), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.49, &t), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.5, &t), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.79, &t), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.8, &t), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(1.0, &t), RiskLevel::High);
    }

    #[test]
    fn test_equal_thresholds_skip_medium() {
        let t = RiskThresholds {
            medium: 0.6,
            high: 0.6,
        };
        assert_eq!(RiskLevel::from_score(0.6, &t), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.59, &t), RiskLevel::Low);
    }

    #[test]
    fn test_ordering_and_labels() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert_eq!(verdict_label(true), "Phishing / Suspicious");
        assert_eq!(verdict_label(false), "Legitimate / Safe (still be cautious)");
        assert_eq!(RiskLevel::Medium.to_string(), "medium");
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(as_percent(0.987654), 98.77);
        assert_eq!(as_percent(0.5), 50.0);
        assert_eq!(as_percent(1.0), 100.0);
    }
}
