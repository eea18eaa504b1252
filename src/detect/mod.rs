//! Anomaly detection over time-ordered metric series.
//!
//! Four independent detectors (Z-Score, IQR, MAD, Isolation) score every
//! point of a series; the ensemble merges their verdicts by agreement ratio.
//! All detectors are stateless: each call is a pure function of its inputs,
//! except the isolation detector which draws random splits.

pub mod ensemble;
pub mod iqr;
pub mod isolation;
pub mod mad;
pub mod thresholds;
pub mod zscore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub use ensemble::EnsembleDetector;
pub use iqr::IqrDetector;
pub use isolation::IsolationDetector;
pub use mad::MadDetector;
pub use thresholds::{AnomalyThresholds, SensitivityLevel};
pub use zscore::ZScoreDetector;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("unknown sensitivity level '{0}' (expected low, medium, high or critical)")]
    UnknownSensitivity(String),
    #[error("unknown detection algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}

/// Severity band of a detected anomaly, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Band a score against three ascending cut-offs (medium, high, critical).
    /// Each cut-off is exclusive: the score must exceed it.
    pub fn from_bands(score: f64, medium: f64, high: f64, critical: f64) -> Self {
        if score > critical {
            Severity::Critical
        } else if score > high {
            Severity::High
        } else if score > medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Operator follow-ups for an anomaly of this severity.
    pub fn suggested_actions(self) -> Vec<String> {
        let actions: &[&str] = match self {
            Severity::Critical => &[
                "Page the on-call engineer immediately",
                "Open an incident and start a timeline",
                "Check recent deployments and configuration changes",
                "Prepare a rollback or failover",
            ],
            Severity::High => &[
                "Notify the owning team",
                "Correlate with recent deployments and dependency health",
                "Watch the metric closely for the next hour",
            ],
            Severity::Medium => &[
                "Review the metric dashboard for a developing trend",
                "Compare against the same window last week",
            ],
            Severity::Low => &["Keep monitoring; no action required yet"],
        };
        actions.iter().map(|a| a.to_string()).collect()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Detection algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    ZScore,
    Iqr,
    Mad,
    Isolation,
    Ensemble,
}

impl Algorithm {
    /// The four independent detectors, in ensemble order.
    pub const BASE: [Algorithm; 4] = [
        Algorithm::ZScore,
        Algorithm::Iqr,
        Algorithm::Mad,
        Algorithm::Isolation,
    ];

    /// Human-readable method name used in `detection_methods`.
    pub fn method_name(self) -> &'static str {
        match self {
            Algorithm::ZScore => "Z-Score",
            Algorithm::Iqr => "IQR",
            Algorithm::Mad => "MAD",
            Algorithm::Isolation => "Isolation Forest",
            Algorithm::Ensemble => "Ensemble",
        }
    }

    /// Lenient lookup used by the dispatcher: unknown names fall back to
    /// the ensemble with a warning instead of failing.
    pub fn resolve(name: &str) -> Self {
        match name.parse() {
            Ok(algorithm) => algorithm,
            Err(_) => {
                warn!(requested = %name, "unknown detection algorithm, falling back to ensemble");
                Algorithm::Ensemble
            }
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::ZScore => write!(f, "zscore"),
            Algorithm::Iqr => write!(f, "iqr"),
            Algorithm::Mad => write!(f, "mad"),
            Algorithm::Isolation => write!(f, "isolation"),
            Algorithm::Ensemble => write!(f, "ensemble"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zscore" | "z-score" => Ok(Algorithm::ZScore),
            "iqr" => Ok(Algorithm::Iqr),
            "mad" => Ok(Algorithm::Mad),
            "isolation" => Ok(Algorithm::Isolation),
            "ensemble" => Ok(Algorithm::Ensemble),
            _ => Err(DetectError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// One observation of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDataPoint {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl MetricDataPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value,
            label: None,
            metadata: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Verdict for a single input point, produced by one detector or the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub id: String,
    pub timestamp: i64,
    pub value: f64,
    pub expected_value: f64,
    /// Algorithm-specific magnitude; not comparable across algorithms.
    pub deviation: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    /// 0..=95
    pub confidence: u8,
    pub algorithm: Algorithm,
    pub detection_methods: Vec<String>,
    pub description: String,
    pub suggested_actions: Vec<String>,
    /// Label of the input point, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
}

/// Per-point score computed by a detector before it is wrapped in an
/// [`AnomalyResult`].
#[derive(Debug, Clone)]
pub(crate) struct Scored {
    pub expected_value: f64,
    pub deviation: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    pub confidence: u8,
    pub description: String,
}

impl AnomalyResult {
    pub(crate) fn from_scored(
        index: usize,
        point: &MetricDataPoint,
        algorithm: Algorithm,
        detection_methods: Vec<String>,
        scored: Scored,
    ) -> Self {
        // Non-anomalous points always sit in the lowest band.
        let severity = if scored.is_anomaly {
            scored.severity
        } else {
            Severity::Low
        };
        let suggested_actions = if scored.is_anomaly {
            severity.suggested_actions()
        } else {
            Vec::new()
        };
        Self {
            id: format!("{}-{}-{}", algorithm, index, point.timestamp),
            timestamp: point.timestamp,
            value: point.value,
            expected_value: scored.expected_value,
            deviation: scored.deviation,
            is_anomaly: scored.is_anomaly,
            severity,
            confidence: scored.confidence,
            algorithm,
            detection_methods,
            description: scored.description,
            suggested_actions,
            metric: point.label.clone(),
        }
    }
}

/// `min(95, round(raw))`, floored at zero.
pub(crate) fn clamp_confidence(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 95.0) as u8
}

/// Common interface of every detector.
pub trait Detector: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Score every point. Returns an empty list when the series is shorter
    /// than `thresholds.min_data_points`; otherwise one result per point.
    fn detect(&self, points: &[MetricDataPoint], thresholds: &AnomalyThresholds)
        -> Vec<AnomalyResult>;
}

/// Dispatch to a detector by name. Unknown names resolve to the ensemble.
///
/// `seed` only affects the isolation detector (directly or inside the ensemble).
pub fn detect(
    points: &[MetricDataPoint],
    algorithm: &str,
    thresholds: &AnomalyThresholds,
    seed: Option<u64>,
) -> Vec<AnomalyResult> {
    detect_with(points, Algorithm::resolve(algorithm), thresholds, seed)
}

/// Dispatch to an already-resolved algorithm.
pub fn detect_with(
    points: &[MetricDataPoint],
    algorithm: Algorithm,
    thresholds: &AnomalyThresholds,
    seed: Option<u64>,
) -> Vec<AnomalyResult> {
    match algorithm {
        Algorithm::ZScore => ZScoreDetector.detect(points, thresholds),
        Algorithm::Iqr => IqrDetector.detect(points, thresholds),
        Algorithm::Mad => MadDetector.detect(points, thresholds),
        Algorithm::Isolation => IsolationDetector::new(seed).detect(points, thresholds),
        Algorithm::Ensemble => EnsembleDetector::new(seed).detect(points, thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<MetricDataPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| MetricDataPoint::new(i as i64 * 60_000, v))
            .collect()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_bands_are_exclusive() {
        assert_eq!(Severity::from_bands(1.2, 1.2, 1.5, 2.0), Severity::Low);
        assert_eq!(Severity::from_bands(1.21, 1.2, 1.5, 2.0), Severity::Medium);
        assert_eq!(Severity::from_bands(2.01, 1.2, 1.5, 2.0), Severity::Critical);
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("ZScore".parse::<Algorithm>().unwrap(), Algorithm::ZScore);
        assert_eq!("isolation".parse::<Algorithm>().unwrap(), Algorithm::Isolation);
        assert!("kmeans".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::resolve("kmeans"), Algorithm::Ensemble);
    }

    #[test]
    fn test_dispatcher_routes_by_name() {
        let points = series(&[10.0, 11.0, 9.0, 10.0, 12.0, 10.0]);
        let t = AnomalyThresholds::default();
        for name in ["zscore", "iqr", "mad", "isolation", "ensemble"] {
            let results = detect(&points, name, &t, Some(7));
            assert_eq!(results.len(), points.len());
            assert_eq!(results[0].algorithm.to_string(), name);
        }
    }

    #[test]
    fn test_dispatcher_unknown_falls_back_to_ensemble() {
        let points = series(&[10.0, 11.0, 9.0, 10.0, 12.0, 10.0]);
        let results = detect(&points, "prophet", &AnomalyThresholds::default(), Some(1));
        assert_eq!(results.len(), points.len());
        assert!(results.iter().all(|r| r.algorithm == Algorithm::Ensemble));
    }

    #[test]
    fn test_confidence_clamp() {
        assert_eq!(clamp_confidence(120.0), 95);
        assert_eq!(clamp_confidence(24.5), 25);
        assert_eq!(clamp_confidence(-3.0), 0);
        assert_eq!(clamp_confidence(f64::NAN), 0);
    }

    #[test]
    fn test_point_deserializes_from_camel_case() {
        let json = r#"{"timestamp": 1700000000000, "value": 42.5, "label": "cpu", "metadata": {"host": "web-1"}}"#;
        let point: MetricDataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.timestamp, 1_700_000_000_000);
        assert_eq!(point.label.as_deref(), Some("cpu"));
        assert!(point.metadata.unwrap().contains_key("host"));
    }
}
