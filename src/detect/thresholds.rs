//! Detection thresholds and the named sensitivity presets.

use crate::detect::DetectError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named preset bundling all numeric thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl SensitivityLevel {
    pub const ALL: [SensitivityLevel; 4] = [
        SensitivityLevel::Low,
        SensitivityLevel::Medium,
        SensitivityLevel::High,
        SensitivityLevel::Critical,
    ];

    /// The fixed threshold bundle for this preset.
    pub fn thresholds(self) -> AnomalyThresholds {
        match self {
            SensitivityLevel::Low => AnomalyThresholds {
                zscore_threshold: 3.5,
                iqr_multiplier: 3.0,
                mad_multiplier: 3.5,
                isolation_threshold: 0.75,
                ensemble_agreement: 0.75,
                min_data_points: 10,
                sensitivity_level: self,
            },
            SensitivityLevel::Medium => AnomalyThresholds {
                zscore_threshold: 2.5,
                iqr_multiplier: 1.5,
                mad_multiplier: 3.0,
                isolation_threshold: 0.65,
                ensemble_agreement: 0.5,
                min_data_points: 5,
                sensitivity_level: self,
            },
            SensitivityLevel::High => AnomalyThresholds {
                zscore_threshold: 2.0,
                iqr_multiplier: 1.2,
                mad_multiplier: 2.5,
                isolation_threshold: 0.6,
                ensemble_agreement: 0.5,
                min_data_points: 5,
                sensitivity_level: self,
            },
            SensitivityLevel::Critical => AnomalyThresholds {
                zscore_threshold: 1.5,
                iqr_multiplier: 1.0,
                mad_multiplier: 2.0,
                isolation_threshold: 0.55,
                ensemble_agreement: 0.25,
                min_data_points: 3,
                sensitivity_level: self,
            },
        }
    }
}

impl std::fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensitivityLevel::Low => write!(f, "low"),
            SensitivityLevel::Medium => write!(f, "medium"),
            SensitivityLevel::High => write!(f, "high"),
            SensitivityLevel::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for SensitivityLevel {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SensitivityLevel::Low),
            "medium" => Ok(SensitivityLevel::Medium),
            "high" => Ok(SensitivityLevel::High),
            "critical" => Ok(SensitivityLevel::Critical),
            _ => Err(DetectError::UnknownSensitivity(s.to_string())),
        }
    }
}

/// Complete threshold record consumed by every detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyThresholds {
    /// Z-Score above which a point is anomalous.
    pub zscore_threshold: f64,
    /// IQR fence multiplier.
    pub iqr_multiplier: f64,
    /// Normalized MAD score above which a point is anomalous.
    pub mad_multiplier: f64,
    /// Isolation score above which a point is anomalous.
    pub isolation_threshold: f64,
    /// Minimum fraction of detectors (0..=1) that must agree.
    pub ensemble_agreement: f64,
    /// No detection runs below this many points.
    pub min_data_points: usize,
    /// Preset these values were derived from.
    pub sensitivity_level: SensitivityLevel,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        SensitivityLevel::default().thresholds()
    }
}

impl AnomalyThresholds {
    /// Reject records that would make the detectors meaningless.
    pub fn validate(&self) -> Result<(), DetectError> {
        let positive = [
            ("zscore_threshold", self.zscore_threshold),
            ("iqr_multiplier", self.iqr_multiplier),
            ("mad_multiplier", self.mad_multiplier),
            ("isolation_threshold", self.isolation_threshold),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DetectError::InvalidThresholds(format!(
                    "{} must be a positive finite number, got {}",
                    field, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.ensemble_agreement) {
            return Err(DetectError::InvalidThresholds(format!(
                "ensemble_agreement must be within [0, 1], got {}",
                self.ensemble_agreement
            )));
        }
        if self.min_data_points == 0 {
            return Err(DetectError::InvalidThresholds(
                "min_data_points must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
