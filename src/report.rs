//! Plain-text rendering of detection results for terminals and logs.

use crate::analysis::stats::TimeSeriesMetrics;
use crate::detect::{AnomalyResult, AnomalyThresholds};
use chrono::{DateTime, Utc};
use std::fmt;

/// Format an epoch-millisecond timestamp as UTC, falling back to the raw value.
pub fn format_timestamp(ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} ms", ms),
    }
}

/// Render a detection run. Only flagged results are listed; an empty or
/// all-negative result list renders a "No anomalies detected" line.
pub fn format_report(
    anomalies: &[AnomalyResult],
    thresholds: &AnomalyThresholds,
    metrics: &TimeSeriesMetrics,
) -> String {
    Report {
        anomalies,
        thresholds,
        metrics,
    }
    .to_string()
}

/// Borrowed view of one detection run, rendered through [`fmt::Display`].
pub struct Report<'a> {
    pub anomalies: &'a [AnomalyResult],
    pub thresholds: &'a AnomalyThresholds,
    pub metrics: &'a TimeSeriesMetrics,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Report {
            anomalies,
            thresholds,
            metrics,
        } = *self;
        writeln!(out, "=== MetricMedic Anomaly Report ===")?;
        writeln!(out)?;

        writeln!(out, "Series statistics")?;
        writeln!(out, "  Mean / Median:   {:.2} / {:.2}", metrics.mean, metrics.median)?;
        writeln!(out, "  Std dev:         {:.2}", metrics.std_dev)?;
        writeln!(out, "  Min / Max:       {:.2} / {:.2}", metrics.min, metrics.max)?;
        writeln!(
            out,
            "  Q1 / Q3 (IQR):   {:.2} / {:.2} ({:.2})",
            metrics.q1, metrics.q3, metrics.iqr
        )?;
        writeln!(out, "  MAD:             {:.2}", metrics.mad)?;
        writeln!(out, "  Trend:           {}", metrics.trend)?;
        writeln!(
            out,
            "  Seasonality:     {}",
            if metrics.seasonality { "likely" } else { "not detected" }
        )?;
        writeln!(out)?;

        writeln!(out, "Thresholds ({} sensitivity)", thresholds.sensitivity_level)?;
        writeln!(out, "  Z-Score:         {:.2}", thresholds.zscore_threshold)?;
        writeln!(out, "  IQR multiplier:  {:.2}", thresholds.iqr_multiplier)?;
        writeln!(out, "  MAD multiplier:  {:.2}", thresholds.mad_multiplier)?;
        writeln!(out, "  Isolation:       {:.2}", thresholds.isolation_threshold)?;
        writeln!(out, "  Agreement:       {:.0}%", thresholds.ensemble_agreement * 100.0)?;
        writeln!(out, "  Min points:      {}", thresholds.min_data_points)?;
        writeln!(out)?;

        let flagged: Vec<&AnomalyResult> = anomalies.iter().filter(|a| a.is_anomaly).collect();
        if flagged.is_empty() {
            writeln!(
                out,
                "No anomalies detected ({} points evaluated).",
                anomalies.len()
            )?;
            return Ok(());
        }

        writeln!(
            out,
            "Anomalies: {} of {} points flagged",
            flagged.len(),
            anomalies.len()
        )?;
        writeln!(
            out,
            "{:<23} | {:>12} | {:>12} | {:<8} | {:>4} | Methods",
            "Timestamp", "Value", "Expected", "Severity", "Conf"
        )?;
        writeln!(out, "{:-<23}-|-{:->12}-|-{:->12}-|-{:-<8}-|-{:->4}-|-{:-<20}", "", "", "", "", "", "")?;
        for a in &flagged {
            writeln!(
                out,
                "{:<23} | {:>12.2} | {:>12.2} | {:<8} | {:>3}% | {}",
                format_timestamp(a.timestamp),
                a.value,
                a.expected_value,
                a.severity.to_string(),
                a.confidence,
                a.detection_methods.join(", ")
            )?;
            writeln!(out, "    {}", a.description)?;
            for action in &a.suggested_actions {
                writeln!(out, "    -> {}", action)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::compute_statistics;
    use crate::detect::{detect_with, Algorithm, MetricDataPoint};

    #[test]
    fn test_empty_anomalies() {
        let report = format_report(&[], &AnomalyThresholds::default(), &compute_statistics(&[]));
        assert!(report.contains("No anomalies detected (0 points evaluated)"));
        assert!(report.contains("medium sensitivity"));
    }

    #[test]
    fn test_flagged_rows_are_listed() {
        let values = [50.0, 51.0, 49.0, 50.0, 52.0, 48.0, 50.0, 200.0];
        let points: Vec<MetricDataPoint> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| MetricDataPoint::new(1_700_000_000_000 + i as i64 * 60_000, v))
            .collect();
        let thresholds = AnomalyThresholds::default();
        let results = detect_with(&points, Algorithm::Iqr, &thresholds, None);
        let before = results.clone();

        let report = format_report(&results, &thresholds, &compute_statistics(&values));
        assert!(report.contains("Anomalies: 1 of 8 points flagged"));
        assert!(report.contains("200.00"));
        assert!(report.contains("critical"));
        assert!(report.contains("2023-11-14"));
        assert_eq!(results, before);
    }

    #[test]
    fn test_display_matches_format_report() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let points: Vec<MetricDataPoint> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| MetricDataPoint::new(i as i64, v))
            .collect();
        let thresholds = AnomalyThresholds::default();
        let metrics = compute_statistics(&values);
        let results = detect_with(&points, Algorithm::ZScore, &thresholds, None);
        let report = Report {
            anomalies: &results,
            thresholds: &thresholds,
            metrics: &metrics,
        };
        assert_eq!(format!("{}", report), format_report(&results, &thresholds, &metrics));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(i64::MAX), format!("{} ms", i64::MAX));
    }
}
