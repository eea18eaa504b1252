//! Descriptive statistics and pattern aggregation over detection results.

pub mod pattern;
pub mod stats;

pub use pattern::{analyze_patterns, AnomalyPattern, IncidentRef, CORRELATION_WINDOW_MS};
pub use stats::{compute_statistics, TimeSeriesMetrics, Trend};
