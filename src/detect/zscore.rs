use crate::analysis::stats::compute_statistics;
use crate::detect::{
    clamp_confidence, Algorithm, AnomalyResult, AnomalyThresholds, Detector, MetricDataPoint,
    Scored, Severity,
};
use tracing::debug;

/// Severity cut-offs as multiples of the configured threshold.
const MEDIUM_BAND: f64 = 1.2;
const HIGH_BAND: f64 = 1.5;
const CRITICAL_BAND: f64 = 2.0;

/// Flags points whose distance from the mean exceeds `zscore_threshold`
/// standard deviations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScoreDetector;

impl Detector for ZScoreDetector {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ZScore
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
        let t = thresholds.zscore_threshold;

        let results: Vec<AnomalyResult> = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let z = if stats.std_dev == 0.0 {
                    0.0
                } else {
                    (point.value - stats.mean).abs() / stats.std_dev
                };
                let scored = Scored {
                    expected_value: stats.mean,
                    deviation: z,
                    is_anomaly: z > t,
                    severity: Severity::from_bands(
                        z,
                        MEDIUM_BAND * t,
                        HIGH_BAND * t,
                        CRITICAL_BAND * t,
                    ),
                    confidence: clamp_confidence((z / t) * 70.0 + 25.0),
                    description: format!(
                        "Value {:.2} is {:.2} standard deviations from the mean {:.2}",
                        point.value, z, stats.mean
                    ),
                };
                AnomalyResult::from_scored(
                    i,
                    point,
                    Algorithm::ZScore,
                    vec![Algorithm::ZScore.method_name().to_string()],
                    scored,
                )
            })
            .collect();

        debug!(
            points = points.len(),
            flagged = results.iter().filter(|r| r.is_anomaly).count(),
            mean = stats.mean,
            std_dev = stats.std_dev,
            "z-score pass complete"
        );
        results
    }
}
