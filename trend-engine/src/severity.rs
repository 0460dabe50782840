//! FILENAME: trend-engine/src/severity.rs
//! Rate classification into severity bands.
//!
//! Two threshold pairs are in use: one for per-defect and group cells and a
//! wider one for overall/summary figures. Both are plain configuration
//! carried by `RateClassifier`.

use qc_model::Color;
use serde::{Deserialize, Serialize};

/// Severity band of a defect rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Background and font color for a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandColors {
    pub background: Color,
    pub font: Color,
}

impl Severity {
    pub fn colors(&self) -> BandColors {
        match self {
            Severity::Low => BandColors {
                background: Color::from_rgb(0xDCFCE7),
                font: Color::from_rgb(0x065F46),
            },
            Severity::Medium => BandColors {
                background: Color::from_rgb(0xFEF3C7),
                font: Color::from_rgb(0x9A3412),
            },
            Severity::High => BandColors {
                background: Color::from_rgb(0xFEE2E2),
                font: Color::from_rgb(0x991B1B),
            },
        }
    }

    /// Style token for front ends ("low", "medium", "high").
    pub fn token(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Where a rate is shown, which selects the threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RateContext {
    Overall,
    PerDefect,
}

/// `rate > high` is High, `rate >= mid` is Medium, anything else is Low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub high: f64,
    pub mid: f64,
}

impl SeverityThresholds {
    pub const PER_DEFECT: SeverityThresholds = SeverityThresholds { high: 3.0, mid: 2.0 };
    pub const OVERALL: SeverityThresholds = SeverityThresholds { high: 5.0, mid: 3.0 };

    pub fn classify(&self, rate: f64) -> Severity {
        if rate > self.high {
            Severity::High
        } else if rate >= self.mid {
            Severity::Medium
        } else {
            // NaN falls through every comparison and lands here
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateClassifier {
    #[serde(default = "overall_default")]
    pub overall: SeverityThresholds,
    #[serde(default = "per_defect_default")]
    pub per_defect: SeverityThresholds,
}

fn overall_default() -> SeverityThresholds {
    SeverityThresholds::OVERALL
}

fn per_defect_default() -> SeverityThresholds {
    SeverityThresholds::PER_DEFECT
}

impl Default for RateClassifier {
    fn default() -> Self {
        RateClassifier {
            overall: SeverityThresholds::OVERALL,
            per_defect: SeverityThresholds::PER_DEFECT,
        }
    }
}

impl RateClassifier {
    pub fn thresholds(&self, context: RateContext) -> SeverityThresholds {
        match context {
            RateContext::Overall => self.overall,
            RateContext::PerDefect => self.per_defect,
        }
    }

    /// Classifies a rate. Zero is `Low`; rendering it blank is the caller's job.
    pub fn classify(&self, rate: f64, context: RateContext) -> Severity {
        self.thresholds(context).classify(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_defect_scheme() {
        let c = RateClassifier::default();
        assert_eq!(c.classify(3.01, RateContext::PerDefect), Severity::High);
        assert_eq!(c.classify(3.0, RateContext::PerDefect), Severity::Medium);
        assert_eq!(c.classify(2.0, RateContext::PerDefect), Severity::Medium);
        assert_eq!(c.classify(1.99, RateContext::PerDefect), Severity::Low);
    }

    #[test]
    fn test_overall_scheme() {
        let c = RateClassifier::default();
        assert_eq!(c.classify(5.5, RateContext::Overall), Severity::High);
        assert_eq!(c.classify(5.0, RateContext::Overall), Severity::Medium);
        assert_eq!(c.classify(3.0, RateContext::Overall), Severity::Medium);
        assert_eq!(c.classify(3.33, RateContext::Overall), Severity::Medium);
        assert_eq!(c.classify(2.9, RateContext::Overall), Severity::Low);
    }

    #[test]
    fn test_zero_and_nan_are_low() {
        let c = RateClassifier::default();
        assert_eq!(c.classify(0.0, RateContext::PerDefect), Severity::Low);
        assert_eq!(c.classify(f64::NAN, RateContext::Overall), Severity::Low);
    }

    #[test]
    fn test_custom_thresholds_from_json() {
        let c: RateClassifier =
            serde_json::from_str(r#"{"perDefect": {"high": 10.0, "mid": 1.0}}"#).unwrap();
        assert_eq!(c.classify(4.0, RateContext::PerDefect), Severity::Medium);
        assert_eq!(c.overall, SeverityThresholds::OVERALL);
    }

    #[test]
    fn test_band_colors() {
        assert_eq!(Severity::High.colors().background.to_rgb(), 0xFEE2E2);
        assert_eq!(Severity::Low.colors().font.to_rgb(), 0x065F46);
        assert_eq!(Severity::Medium.token(), "medium");
    }
}
