//! Normalized fraud analysis result

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier reported by the scoring service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    /// Case-insensitive match; anything unrecognized is `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presentation model for one submission's response
///
/// Replaced wholesale by the next submission; never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Fraud probability, always within `[0, 100]`
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub summary: String,
    /// Verbatim model text
    pub raw_model_output: String,
    pub key_findings: Vec<String>,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    /// Opaque claim processing details, passed through for display
    pub claim_details: serde_json::Value,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            probability: 0.0,
            risk_level: RiskLevel::Unknown,
            summary: String::new(),
            raw_model_output: String::new(),
            key_findings: Vec::new(),
            red_flags: Vec::new(),
            recommendations: Vec::new(),
            claim_details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl AnalysisResult {
    /// Gauge needle angle in degrees for this result
    pub fn gauge_angle(&self) -> f64 {
        gauge_angle(self.probability)
    }

    pub fn has_findings(&self) -> bool {
        !self.key_findings.is_empty()
            || !self.red_flags.is_empty()
            || !self.recommendations.is_empty()
    }
}

/// Map a probability in `[0, 100]` onto a half-circle sweep of `[0, 180]` degrees
///
/// Out-of-range input is clamped first; NaN maps to 0.
pub fn gauge_angle(probability: f64) -> f64 {
    let probability = if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 100.0)
    };
    (probability / 100.0) * 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_angle_endpoints_and_midpoint() {
        assert_eq!(gauge_angle(0.0), 0.0);
        assert_eq!(gauge_angle(50.0), 90.0);
        assert_eq!(gauge_angle(100.0), 180.0);
    }

    #[test]
    fn test_gauge_angle_clamps() {
        assert_eq!(gauge_angle(-5.0), 0.0);
        assert_eq!(gauge_angle(250.0), 180.0);
        assert_eq!(gauge_angle(f64::NAN), 0.0);
    }

    #[test]
    fn test_risk_level_from_label() {
        assert_eq!(RiskLevel::from_label("High"), RiskLevel::High);
        assert_eq!(RiskLevel::from_label(" medium "), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_label("LOW"), RiskLevel::Low);
        assert_eq!(RiskLevel::from_label("Severe"), RiskLevel::Unknown);
        assert_eq!(RiskLevel::from_label(""), RiskLevel::Unknown);
    }

    #[test]
    fn test_default_result_is_empty() {
        let result = AnalysisResult::default();
        assert_eq!(result.probability, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(!result.has_findings());
        assert!(result.claim_details.as_object().unwrap().is_empty());
        assert_eq!(result.gauge_angle(), 0.0);
    }
}
