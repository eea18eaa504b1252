//! TOML configuration for MetricMedic.
//!
//! Layered model: compiled-in defaults, optionally overridden by a config
//! file located through an explicit path, the `METRICMEDIC_CONFIG`
//! environment variable, or the standard system location.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::detect::{AnomalyThresholds, SensitivityLevel};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "METRICMEDIC_CONFIG";
/// Standard system config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/metricmedic/metricmedic.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub isolation: IsolationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. `explicit` (an error here is returned, not skipped).
    /// 2. The path in `METRICMEDIC_CONFIG`.
    /// 3. `/etc/metricmedic/metricmedic.toml`.
    /// 4. Compiled-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "METRICMEDIC_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Thresholds for `sensitivity` (or the configured preset) with the
    /// configured per-field overrides applied, validated as a whole.
    pub fn thresholds(&self, sensitivity: Option<SensitivityLevel>) -> Result<AnomalyThresholds> {
        let level = sensitivity.unwrap_or(self.detection.sensitivity);
        let mut t = level.thresholds();
        let o = &self.detection.overrides;
        if let Some(v) = o.zscore_threshold {
            t.zscore_threshold = v;
        }
        if let Some(v) = o.iqr_multiplier {
            t.iqr_multiplier = v;
        }
        if let Some(v) = o.mad_multiplier {
            t.mad_multiplier = v;
        }
        if let Some(v) = o.isolation_threshold {
            t.isolation_threshold = v;
        }
        if let Some(v) = o.ensemble_agreement {
            t.ensemble_agreement = v;
        }
        if let Some(v) = o.min_data_points {
            t.min_data_points = v;
        }
        t.validate().context("configured thresholds are invalid")?;
        Ok(t)
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Which algorithm and preset to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Named threshold preset.
    pub sensitivity: SensitivityLevel,
    /// `zscore`, `iqr`, `mad`, `isolation` or `ensemble`. Unknown names
    /// fall back to `ensemble`.
    pub algorithm: String,
    /// Per-field adjustments on top of the preset.
    pub overrides: ThresholdOverrides,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: SensitivityLevel::Medium,
            algorithm: "ensemble".to_string(),
            overrides: ThresholdOverrides::default(),
        }
    }
}

/// Optional replacements for individual preset fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOverrides {
    pub zscore_threshold: Option<f64>,
    pub iqr_multiplier: Option<f64>,
    pub mad_multiplier: Option<f64>,
    pub isolation_threshold: Option<f64>,
    pub ensemble_agreement: Option<f64>,
    pub min_data_points: Option<usize>,
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

/// Isolation detector randomness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    /// Fixed seed for reproducible runs; entropy-seeded per call when unset.
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.detection.sensitivity, SensitivityLevel::Medium);
        assert_eq!(cfg.detection.algorithm, "ensemble");
        assert!(cfg.isolation.seed.is_none());
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
        assert_eq!(cfg.thresholds(None).unwrap(), AnomalyThresholds::default());
    }

    #[test]
    fn test_parse_example_toml() {
        let toml_str = r#"
[detection]
sensitivity = "high"
algorithm = "mad"

[detection.overrides]
zscore_threshold = 2.2
min_data_points = 12

[isolation]
seed = 1234

[logging]
level = "debug"
json = true
"#;
        let cfg: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.detection.sensitivity, SensitivityLevel::High);
        assert_eq!(cfg.detection.algorithm, "mad");
        assert_eq!(cfg.isolation.seed, Some(1234));
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);

        let t = cfg.thresholds(None).unwrap();
        assert_eq!(t.zscore_threshold, 2.2);
        assert_eq!(t.min_data_points, 12);
        assert_eq!(t.iqr_multiplier, SensitivityLevel::High.thresholds().iqr_multiplier);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: EngineConfig = toml::from_str("[isolation]\nseed = 9\n").unwrap();
        assert_eq!(cfg.detection.algorithm, "ensemble");
        assert_eq!(cfg.isolation.seed, Some(9));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_cli_sensitivity_wins_over_file() {
        let cfg = EngineConfig::default();
        let t = cfg.thresholds(Some(SensitivityLevel::Critical)).unwrap();
        assert_eq!(t, SensitivityLevel::Critical.thresholds());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cfg: EngineConfig =
            toml::from_str("[detection.overrides]\nensemble_agreement = 2.0\n").unwrap();
        assert!(cfg.thresholds(None).is_err());
    }

    #[test]
    fn test_unknown_sensitivity_fails_to_parse() {
        assert!(toml::from_str::<EngineConfig>("[detection]\nsensitivity = \"extreme\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[detection]\nsensitivity = \"low\"")?;
        let cfg = EngineConfig::load_or_default(Some(file.path()))?;
        assert_eq!(cfg.detection.sensitivity, SensitivityLevel::Low);
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(EngineConfig::load_or_default(Some(Path::new("/nonexistent/metricmedic.toml"))).is_err());
    }
}
