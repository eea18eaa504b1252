//! Approximate isolation scoring.
//!
//! Each value gets a single random partitioning trial over the observed
//! `[min, max]` range instead of a forest of isolation trees, so two
//! unseeded calls on the same series may disagree. Pass a seed to make a
//! call reproducible; the generator is always owned by the call.

use crate::analysis::stats::compute_statistics;
use crate::detect::{
    clamp_confidence, Algorithm, AnomalyResult, AnomalyThresholds, Detector, MetricDataPoint,
    Scored, Severity,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Split budget per value.
pub const MAX_SPLITS: u32 = 10;
/// A containing interval narrower than this counts as isolated.
pub const MIN_WIDTH: f64 = 0.01;
const EULER_GAMMA: f64 = 0.5772156649;

const MEDIUM_BAND: f64 = 0.6;
const HIGH_BAND: f64 = 0.7;
const CRITICAL_BAND: f64 = 0.8;

/// Expected path length of an unsuccessful search in a binary tree of `n` nodes.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 1.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Number of random splits until `value`'s interval is narrower than
/// [`MIN_WIDTH`], capped at [`MAX_SPLITS`].
fn path_length<R: Rng>(value: f64, min: f64, max: f64, rng: &mut R) -> u32 {
    let (mut lo, mut hi) = (min, max);
    let mut depth = 0;
    while depth < MAX_SPLITS && hi - lo >= MIN_WIDTH {
        let split = rng.gen_range(lo..hi);
        if value < split {
            hi = split;
        } else {
            lo = split;
        }
        depth += 1;
    }
    depth
}

/// Flags points that are quick to isolate by random range splits.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolationDetector {
    seed: Option<u64>,
}

impl IsolationDetector {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Detector for IsolationDetector {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Isolation
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
        let avg_path = average_path_length(points.len());
        // A range narrower than the isolation width has nothing to separate,
        // and one that overflows f64 cannot be sampled.
        let span = stats.max - stats.min;
        let has_spread = span.is_finite() && span >= MIN_WIDTH;
        let mut rng = self.rng();

        let results: Vec<AnomalyResult> = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let (score, depth) = if has_spread {
                    let depth = path_length(point.value, stats.min, stats.max, &mut rng);
                    (2f64.powf(-(depth as f64) / avg_path), depth)
                } else {
                    (0.0, 0)
                };
                let scored = Scored {
                    expected_value: stats.mean,
                    deviation: score,
                    is_anomaly: score > thresholds.isolation_threshold,
                    severity: Severity::from_bands(score, MEDIUM_BAND, HIGH_BAND, CRITICAL_BAND),
                    confidence: clamp_confidence(score * 100.0),
                    description: format!(
                        "Value {:.2} isolated after {} splits (score {:.3})",
                        point.value, depth, score
                    ),
                };
                AnomalyResult::from_scored(
                    i,
                    point,
                    Algorithm::Isolation,
                    vec![Algorithm::Isolation.method_name().to_string()],
                    scored,
                )
            })
            .collect();

        debug!(
            points = points.len(),
            flagged = results.iter().filter(|r| r.is_anomaly).count(),
            seeded = self.seed.is_some(),
            "isolation pass complete"
        );
        results
    }
}
