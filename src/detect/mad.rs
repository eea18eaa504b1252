use crate::analysis::stats::compute_statistics;
use crate::detect::{
    clamp_confidence, Algorithm, AnomalyResult, AnomalyThresholds, Detector, MetricDataPoint,
    Scored, Severity,
};
use tracing::debug;

/// Scales MAD to a standard deviation under a normal distribution.
pub const MAD_NORMAL_SCALE: f64 = 1.4826;

/// Severity cut-offs as multiples of the configured multiplier.
const MEDIUM_BAND: f64 = 1.2;
const HIGH_BAND: f64 = 1.5;
const CRITICAL_BAND: f64 = 2.0;

/// Robust counterpart of the Z-Score detector built on median and MAD.
#[derive(Debug, Clone, Copy, Default)]
pub struct MadDetector;

impl Detector for MadDetector {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Mad
    }

    fn detect(
        &self,
        points: &[MetricDataPoint],
        thresholds: &AnomalyThresholds,
    ) -> Vec<AnomalyResult> {
        if points.len() < thresholds.min_data_points {
            return Vec::new();
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let stats = compute_statistics(&values);
        let k = thresholds.mad_multiplier;
        let scale = MAD_NORMAL_SCALE * stats.mad;

        let results: Vec<AnomalyResult> = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let score = if stats.mad == 0.0 {
                    0.0
                } else {
                    (point.value - stats.median).abs() / scale
                };
                let scored = Scored {
                    expected_value: stats.median,
                    deviation: score,
                    is_anomaly: score > k,
                    severity: Severity::from_bands(
                        score,
                        MEDIUM_BAND * k,
                        HIGH_BAND * k,
                        CRITICAL_BAND * k,
                    ),
                    confidence: clamp_confidence((score / k) * 65.0 + 28.0),
                    description: format!(
                        "Value {:.2} has a MAD score of {:.2} around the median {:.2}",
                        point.value, score, stats.median
                    ),
                };
                AnomalyResult::from_scored(
                    i,
                    point,
                    Algorithm::Mad,
                    vec![Algorithm::Mad.method_name().to_string()],
                    scored,
                )
            })
            .collect();

        debug!(
            points = points.len(),
            flagged = results.iter().filter(|r| r.is_anomaly).count(),
            median = stats.median,
            mad = stats.mad,
            "mad pass complete"
        );
        results
    }
}
