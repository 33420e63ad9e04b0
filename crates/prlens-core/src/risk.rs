//! Risk banding (spec §3 invariants).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// `risk_band = low if risk_score <= 3.0; medium if 3.0 < risk_score <= 6.9; high otherwise`.
    pub fn for_score(score: f32) -> Self {
        if score <= 3.0 {
            RiskBand::Low
        } else if score <= 6.9 {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `high_risk ⇔ risk_score >= 7.0`.
pub fn is_high_risk(score: f32) -> bool {
    score >= 7.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(RiskBand::for_score(3.0), RiskBand::Low);
        assert_eq!(RiskBand::for_score(3.1), RiskBand::Medium);
        assert_eq!(RiskBand::for_score(6.9), RiskBand::Medium);
        assert_eq!(RiskBand::for_score(7.0), RiskBand::High);
    }

    #[test]
    fn high_risk_threshold() {
        assert!(!is_high_risk(6.99));
        assert!(is_high_risk(7.0));
    }

    #[test]
    fn scenario_5_band_is_high() {
        // Scenario 5 in spec.md §8: aggregated score 8.5.
        assert_eq!(RiskBand::for_score(8.5), RiskBand::High);
        assert!(is_high_risk(8.5));
    }
}
