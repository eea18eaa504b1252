use crate::detect::{
    Algorithm, AnomalyResult, AnomalyThresholds, Detector, IqrDetector, IsolationDetector,
    MadDetector, MetricDataPoint, Severity, ZScoreDetector,
};
use serde::Serialize;
use tracing::{debug, info};

/// Combines the four base detectors by agreement ratio.
///
/// This is the primary entry point; the base detectors stay callable on
/// their own for comparison views.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleDetector {
    isolation: IsolationDetector,
}

impl EnsembleDetector {
    /// `seed` is forwarded to the isolation detector.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            isolation: IsolationDetector::new(seed),
        }
    }

    fn members(&self) -> [&dyn Detector; 4] {
        [&ZScoreDetector, &IqrDetector, &MadDetector, &self.isolation]
    }
}

impl Detector for EnsembleDetector {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Ensemble
    }

    fn detect(
        &self,
        points: &[MetricDataPoint],
        thresholds: &AnomalyThresholds,
    ) -> Vec<AnomalyResult> {
        if points.len() < thresholds.min_data_points {
            return Vec::new();
        }

        let runs: Vec<Vec<AnomalyResult>> = self
            .members()
            .iter()
            .map(|d| d.detect(points, thresholds))
            .collect();
        let members = runs.len() as f64;

        let results: Vec<AnomalyResult> = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let subs: Vec<&AnomalyResult> = runs.iter().map(|run| &run[i]).collect();
                let agreeing: Vec<&AnomalyResult> =
                    subs.iter().copied().filter(|r| r.is_anomaly).collect();
                let ratio = agreeing.len() as f64 / members;
                let is_anomaly = ratio >= thresholds.ensemble_agreement;

                let severity = if is_anomaly {
                    subs.iter().map(|r| r.severity).max().unwrap_or(Severity::Low)
                } else {
                    Severity::Low
                };
                let avg_confidence =
                    subs.iter().map(|r| r.confidence as f64).sum::<f64>() / members;
                let expected_value = subs.iter().map(|r| r.expected_value).sum::<f64>() / members;
                let deviation = subs
                    .iter()
                    .map(|r| r.deviation)
                    .fold(f64::NEG_INFINITY, f64::max);
                let detection_methods: Vec<String> = agreeing
                    .iter()
                    .map(|r| r.algorithm.method_name().to_string())
                    .collect();

                let description = if is_anomaly {
                    format!(
                        "{} of {} detectors flagged value {:.2} ({})",
                        agreeing.len(),
                        subs.len(),
                        point.value,
                        detection_methods.join(", ")
                    )
                } else if agreeing.is_empty() {
                    format!("No consensus: no detector flagged value {:.2}", point.value)
                } else {
                    format!(
                        "No consensus: {} of {} detectors flagged value {:.2}",
                        agreeing.len(),
                        subs.len(),
                        point.value
                    )
                };

                AnomalyResult {
                    id: format!("{}-{}-{}", Algorithm::Ensemble, i, point.timestamp),
                    timestamp: point.timestamp,
                    value: point.value,
                    expected_value,
                    deviation,
                    is_anomaly,
                    severity,
                    confidence: (avg_confidence * ratio).round().min(95.0) as u8,
                    algorithm: Algorithm::Ensemble,
                    detection_methods,
                    description,
                    suggested_actions: if is_anomaly {
                        severity.suggested_actions()
                    } else {
                        Vec::new()
                    },
                    metric: point.label.clone(),
                }
            })
            .collect();

        info!(
            points = points.len(),
            flagged = results.iter().filter(|r| r.is_anomaly).count(),
            agreement = thresholds.ensemble_agreement,
            "ensemble detection complete"
        );
        results
    }
}

/// Convenience wrapper for [`EnsembleDetector::detect`].
pub fn detect_ensemble(
    points: &[MetricDataPoint],
    thresholds: &AnomalyThresholds,
    seed: Option<u64>,
) -> Vec<AnomalyResult> {
    EnsembleDetector::new(seed).detect(points, thresholds)
}

/// Per-algorithm outcome for a comparison view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmSummary {
    pub algorithm: Algorithm,
    pub evaluated: usize,
    pub flagged: usize,
    pub max_severity: Option<Severity>,
}

/// Run every base detector and the ensemble over the same series.
pub fn compare(
    points: &[MetricDataPoint],
    thresholds: &AnomalyThresholds,
    seed: Option<u64>,
) -> Vec<AlgorithmSummary> {
    let ensemble = EnsembleDetector::new(seed);
    let mut detectors: Vec<&dyn Detector> = ensemble.members().to_vec();
    detectors.push(&ensemble);

    detectors
        .iter()
        .map(|d| {
            let results = d.detect(points, thresholds);
            let flagged: Vec<&AnomalyResult> = results.iter().filter(|r| r.is_anomaly).collect();
            let summary = AlgorithmSummary {
                algorithm: d.algorithm(),
                evaluated: results.len(),
                flagged: flagged.len(),
                max_severity: flagged.iter().map(|r| r.severity).max(),
            };
            debug!(algorithm = %summary.algorithm, flagged = summary.flagged, "comparison row");
            summary
        })
        .collect()
}
