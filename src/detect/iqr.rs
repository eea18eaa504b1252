use crate::analysis::stats::{compute_statistics, TimeSeriesMetrics};
use crate::detect::{
    clamp_confidence, Algorithm, AnomalyResult, AnomalyThresholds, Detector, MetricDataPoint,
    Scored, Severity,
};
use tracing::debug;

/// Severity cut-offs in IQR units beyond the nearer fence.
const MEDIUM_BAND: f64 = 1.0;
const HIGH_BAND: f64 = 2.0;
const CRITICAL_BAND: f64 = 3.0;

/// Tukey fences: `[q1 - k*iqr, q3 + k*iqr]`.
pub fn bounds(stats: &TimeSeriesMetrics, multiplier: f64) -> (f64, f64) {
    (
        stats.q1 - multiplier * stats.iqr,
        stats.q3 + multiplier * stats.iqr,
    )
}

/// Flags points outside the interquartile fences.
#[derive(Debug, Clone, Copy, Default)]
pub struct IqrDetector;

impl Detector for IqrDetector {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Iqr
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
        let k = thresholds.iqr_multiplier;
        let (lower, upper) = bounds(&stats, k);

        let results: Vec<AnomalyResult> = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let outside = if point.value < lower {
                    lower - point.value
                } else if point.value > upper {
                    point.value - upper
                } else {
                    0.0
                };
                let deviation = if stats.iqr == 0.0 {
                    0.0
                } else {
                    outside / stats.iqr
                };
                let is_anomaly = point.value < lower || point.value > upper;
                let scored = Scored {
                    expected_value: stats.median,
                    deviation,
                    is_anomaly,
                    severity: Severity::from_bands(deviation, MEDIUM_BAND, HIGH_BAND, CRITICAL_BAND),
                    confidence: clamp_confidence((deviation / k) * 60.0 + 30.0),
                    description: if is_anomaly {
                        format!(
                            "Value {:.2} is outside the IQR fences [{:.2}, {:.2}] by {:.2} IQR",
                            point.value, lower, upper, deviation
                        )
                    } else {
                        format!(
                            "Value {:.2} is within the IQR fences [{:.2}, {:.2}]",
                            point.value, lower, upper
                        )
                    },
                };
                AnomalyResult::from_scored(
                    i,
                    point,
                    Algorithm::Iqr,
                    vec![Algorithm::Iqr.method_name().to_string()],
                    scored,
                )
            })
            .collect();

        debug!(
            points = points.len(),
            flagged = results.iter().filter(|r| r.is_anomaly).count(),
            lower,
            upper,
            "iqr pass complete"
        );
        results
    }
}
