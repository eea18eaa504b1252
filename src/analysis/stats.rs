use serde::{Deserialize, Serialize};

/// Relative change between the first and last third that counts as a trend.
const TREND_CHANGE: f64 = 0.2;
/// Minimum points before the seasonality heuristic runs.
const SEASONALITY_MIN_POINTS: usize = 14;
/// Halves whose variances differ by less than this fraction look periodic.
const SEASONALITY_VARIANCE_DIFF: f64 = 0.3;

/// Coarse direction of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Descriptive statistics snapshot of a sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesMetrics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Population variance (divides by N).
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    /// `sorted[N / 4]`, not an interpolated quantile.
    pub q1: f64,
    /// `sorted[3N / 4]`, not an interpolated quantile.
    pub q3: f64,
    pub iqr: f64,
    /// Median absolute deviation from the median.
    pub mad: f64,
    pub trend: Trend,
    /// Crude periodicity heuristic; see [`compute_statistics`].
    pub seasonality: bool,
}

/// Compute the statistics snapshot for a time-ordered sample.
///
/// An empty sample yields the all-zero record. The input is never reordered;
/// order-sensitive measures (trend, seasonality) read it as given.
///
/// `seasonality` compares the variance of the two halves of the series and
/// flags near-equal halves. It is a heuristic, not spectral analysis.
pub fn compute_statistics(values: &[f64]) -> TimeSeriesMetrics {
    if values.is_empty() {
        return TimeSeriesMetrics::default();
    }

    let n = values.len();
    let mean = mean(values);
    let variance = variance(values, mean);

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let median = median_of_sorted(&sorted);
    let q1 = sorted[n / 4];
    let q3 = sorted[(3 * n) / 4];

    let mut abs_dev: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    abs_dev.sort_by(|a, b| a.total_cmp(b));
    let mad = median_of_sorted(&abs_dev);

    TimeSeriesMetrics {
        mean,
        median,
        std_dev: variance.sqrt(),
        variance,
        min: sorted[0],
        max: sorted[n - 1],
        q1,
        q3,
        iqr: q3 - q1,
        mad,
        trend: trend(values),
        seasonality: seasonality(values),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

fn trend(values: &[f64]) -> Trend {
    if values.len() < 3 {
        return Trend::Stable;
    }
    let third = values.len() / 3;
    let first = mean(&values[..third]);
    let last = mean(&values[values.len() - third..]);

    // No baseline to measure a relative change against.
    if first == 0.0 {
        return Trend::Stable;
    }
    let change = (last - first) / first.abs();
    if change > TREND_CHANGE {
        Trend::Increasing
    } else if change < -TREND_CHANGE {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

fn seasonality(values: &[f64]) -> bool {
    if values.len() < SEASONALITY_MIN_POINTS {
        return false;
    }
    let (first, second) = values.split_at(values.len() / 2);
    let v1 = variance(first, mean(first));
    let v2 = variance(second, mean(second));
    let larger = v1.max(v2);
    // A flat series has nothing periodic about it.
    if larger == 0.0 {
        return false;
    }
    (v1 - v2).abs() / larger < SEASONALITY_VARIANCE_DIFF
}
