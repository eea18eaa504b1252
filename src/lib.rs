//! MetricMedic -- multi-algorithm anomaly detection for incident response.
//!
//! This crate provides the detection engine: descriptive statistics over a
//! metric series, four independent detectors (Z-Score, IQR, MAD, Isolation),
//! an ensemble that merges their verdicts by agreement ratio, and a pattern
//! pass that groups detections by severity and correlates them with incidents.
//! The engine is synchronous and holds no state between calls.

pub mod analysis;
pub mod config;
pub mod detect;
pub mod report;

pub use analysis::{analyze_patterns, compute_statistics, AnomalyPattern, IncidentRef, TimeSeriesMetrics, Trend};
pub use detect::ensemble::{compare, detect_ensemble, AlgorithmSummary};
pub use detect::{
    detect, detect_with, Algorithm, AnomalyResult, AnomalyThresholds, DetectError, Detector,
    MetricDataPoint, SensitivityLevel, Severity,
};
pub use report::format_report;
