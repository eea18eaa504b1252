use crate::detect::{AnomalyResult, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Fixed correlation window: incidents within one hour of an anomaly.
pub const CORRELATION_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Minimal view of an incident record maintained outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRef {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl IncidentRef {
    pub fn new(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            timestamp,
            title: None,
        }
    }
}

/// Recurring anomalies sharing a severity band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyPattern {
    pub id: String,
    pub name: String,
    pub description: String,
    pub frequency: usize,
    /// Mean of `|value - expected_value|` across the group.
    pub avg_magnitude: f64,
    pub last_detected: i64,
    pub affected_metrics: Vec<String>,
    pub correlated_incidents: Vec<String>,
}

fn title_case(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "Low",
        Severity::Medium => "Medium",
        Severity::High => "High",
        Severity::Critical => "Critical",
    }
}

/// Group positive detections by severity and correlate each group with
/// incidents in time. Patterns come back most severe first. Overlapping
/// windows across groups are not deduplicated.
pub fn analyze_patterns(anomalies: &[AnomalyResult], incidents: &[IncidentRef]) -> Vec<AnomalyPattern> {
    let mut groups: BTreeMap<Severity, Vec<&AnomalyResult>> = BTreeMap::new();
    for anomaly in anomalies.iter().filter(|a| a.is_anomaly) {
        groups.entry(anomaly.severity).or_default().push(anomaly);
    }

    let patterns: Vec<AnomalyPattern> = groups
        .into_iter()
        .rev()
        .map(|(severity, group)| build_pattern(severity, &group, incidents))
        .collect();

    if !patterns.is_empty() {
        info!(
            anomalies = anomalies.len(),
            patterns = patterns.len(),
            incidents = incidents.len(),
            "pattern analysis complete"
        );
    }
    patterns
}

fn build_pattern(severity: Severity, group: &[&AnomalyResult], incidents: &[IncidentRef]) -> AnomalyPattern {
    let frequency = group.len();
    let avg_magnitude = group
        .iter()
        .map(|a| (a.value - a.expected_value).abs())
        .sum::<f64>()
        / frequency as f64;
    let last_detected = group.iter().map(|a| a.timestamp).max().unwrap_or_default();

    let affected_metrics: Vec<String> = group
        .iter()
        .filter_map(|a| a.metric.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut correlated_incidents: Vec<String> = Vec::new();
    for incident in incidents {
        let near = group
            .iter()
            .any(|a| incident.timestamp.abs_diff(a.timestamp) <= CORRELATION_WINDOW_MS as u64);
        if near && !correlated_incidents.contains(&incident.id) {
            correlated_incidents.push(incident.id.clone());
        }
    }

    let key = format!("{}-anomaly", severity);
    AnomalyPattern {
        name: format!("{} Severity Anomalies", title_case(severity)),
        description: format!(
            "{} {} anomalies with average magnitude {:.2}, correlated with {} incident(s)",
            frequency,
            severity,
            avg_magnitude,
            correlated_incidents.len()
        ),
        id: key,
        frequency,
        avg_magnitude,
        last_detected,
        affected_metrics,
        correlated_incidents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Algorithm;

    const T: i64 = 1_700_000_000_000;

    fn anomaly(timestamp: i64, value: f64, expected: f64, severity: Severity) -> AnomalyResult {
        AnomalyResult {
            id: format!("ensemble-0-{}", timestamp),
            timestamp,
            value,
            expected_value: expected,
            deviation: 0.0,
            is_anomaly: true,
            severity,
            confidence: 80,
            algorithm: Algorithm::Ensemble,
            detection_methods: vec!["Z-Score".to_string()],
            description: String::new(),
            suggested_actions: Vec::new(),
            metric: None,
        }
    }

    fn labelled(mut a: AnomalyResult, metric: &str) -> AnomalyResult {
        a.metric = Some(metric.to_string());
        a
    }

    #[test]
    fn test_empty_input_gives_no_patterns() {
        assert!(analyze_patterns(&[], &[IncidentRef::new("INC-1", T)]).is_empty());
    }

    #[test]
    fn test_negative_results_are_ignored() {
        let mut a = anomaly(T, 10.0, 10.0, Severity::Low);
        a.is_anomaly = false;
        assert!(analyze_patterns(&[a], &[]).is_empty());
    }

    #[test]
    fn test_critical_pair_correlates_with_incident() {
        let anomalies = vec![
            anomaly(T, 120.0, 20.0, Severity::Critical),
            anomaly(T + 1_800_000, 80.0, 20.0, Severity::Critical),
        ];
        let incidents = vec![
            IncidentRef::new("INC-7", T + 900_000),
            IncidentRef::new("INC-OLD", T - 2 * CORRELATION_WINDOW_MS),
        ];
        let patterns = analyze_patterns(&anomalies, &incidents);

        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.id, "critical-anomaly");
        assert_eq!(p.frequency, 2);
        assert_eq!(p.avg_magnitude, 80.0);
        assert_eq!(p.last_detected, T + 1_800_000);
        assert_eq!(p.correlated_incidents, vec!["INC-7".to_string()]);
    }

    #[test]
    fn test_window_edges() {
        let anomalies = vec![anomaly(T, 50.0, 10.0, Severity::High)];
        let incidents = vec![
            IncidentRef::new("edge", T + CORRELATION_WINDOW_MS),
            IncidentRef::new("outside", T + CORRELATION_WINDOW_MS + 1),
        ];
        let p = &analyze_patterns(&anomalies, &incidents)[0];
        assert_eq!(p.correlated_incidents, vec!["edge".to_string()]);
    }

    #[test]
    fn test_extreme_timestamps_do_not_correlate() {
        let anomalies = vec![anomaly(i64::MAX, 50.0, 10.0, Severity::High)];
        let incidents = vec![
            IncidentRef::new("far", i64::MIN),
            IncidentRef::new("near", i64::MAX - 1),
        ];
        let p = &analyze_patterns(&anomalies, &incidents)[0];
        assert_eq!(p.correlated_incidents, vec!["near".to_string()]);
    }

    #[test]
    fn test_groups_by_severity_most_severe_first() {
        let anomalies = vec![
            labelled(anomaly(T, 15.0, 10.0, Severity::Medium), "latency"),
            labelled(anomaly(T + 1, 90.0, 10.0, Severity::Critical), "cpu"),
            labelled(anomaly(T + 2, 16.0, 10.0, Severity::Medium), "cpu"),
            labelled(anomaly(T + 3, 17.0, 10.0, Severity::Medium), "cpu"),
        ];
        let patterns = analyze_patterns(&anomalies, &[]);
        let ids: Vec<&str> = patterns.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["critical-anomaly", "medium-anomaly"]);
        assert_eq!(patterns[1].frequency, 3);
        assert_eq!(patterns[1].affected_metrics, vec!["cpu".to_string(), "latency".to_string()]);
        assert!(patterns[1].correlated_incidents.is_empty());
    }
}
