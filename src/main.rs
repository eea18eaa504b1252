use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metricmedic::config::{EngineConfig, LoggingConfig};
use metricmedic::{IncidentRef, MetricDataPoint, SensitivityLevel};

#[derive(Parser)]
#[command(
    name = "metricmedic",
    about = "Multi-algorithm anomaly detection for incident response metrics",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (defaults: $METRICMEDIC_CONFIG, /etc/metricmedic/metricmedic.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run anomaly detection over a metric series
    Detect {
        /// JSON array of {timestamp, value, label?, metadata?}
        #[arg(long)]
        input: PathBuf,

        /// zscore, iqr, mad, isolation or ensemble (unknown names use ensemble)
        #[arg(long)]
        algorithm: Option<String>,

        /// Threshold preset: low, medium, high or critical
        #[arg(long)]
        sensitivity: Option<SensitivityLevel>,

        /// Seed for the isolation detector
        #[arg(long)]
        seed: Option<u64>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print descriptive statistics for a metric series
    Stats {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Run ensemble detection and group anomalies into patterns
    Patterns {
        #[arg(long)]
        input: PathBuf,

        /// JSON array of {id, timestamp, title?} incident records
        #[arg(long)]
        incidents: Option<PathBuf>,

        #[arg(long)]
        sensitivity: Option<SensitivityLevel>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// Compare every detector on the same series
    Compare {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        sensitivity: Option<SensitivityLevel>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// List the sensitivity presets
    Presets {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_points(path: &Path) -> Result<Vec<MetricDataPoint>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metric series: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse metric series: {}", path.display()))
}

fn read_incidents(path: &Path) -> Result<Vec<IncidentRef>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read incidents: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse incidents: {}", path.display()))
}

fn values(points: &[MetricDataPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Detect {
            input,
            algorithm,
            sensitivity,
            seed,
            json,
        } => {
            let points = read_points(&input)?;
            let thresholds = config.thresholds(sensitivity)?;
            let algorithm = algorithm.unwrap_or_else(|| config.detection.algorithm.clone());
            let seed = seed.or(config.isolation.seed);
            tracing::info!(input = %input.display(), %algorithm, points = points.len(), "Running detection");

            let results = metricmedic::detect(&points, &algorithm, &thresholds, seed);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                let metrics = metricmedic::compute_statistics(&values(&points));
                if results.is_empty() {
                    println!(
                        "Not enough data: {} points, {} required.",
                        points.len(),
                        thresholds.min_data_points
                    );
                }
                print!("{}", metricmedic::format_report(&results, &thresholds, &metrics));
            }
        }
        Commands::Stats { input, json } => {
            let points = read_points(&input)?;
            let metrics = metricmedic::compute_statistics(&values(&points));
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                println!("Points:      {}", points.len());
                println!("Mean:        {:.4}", metrics.mean);
                println!("Median:      {:.4}", metrics.median);
                println!("Std dev:     {:.4}", metrics.std_dev);
                println!("Variance:    {:.4}", metrics.variance);
                println!("Min / Max:   {:.4} / {:.4}", metrics.min, metrics.max);
                println!("Q1 / Q3:     {:.4} / {:.4}", metrics.q1, metrics.q3);
                println!("IQR:         {:.4}", metrics.iqr);
                println!("MAD:         {:.4}", metrics.mad);
                println!("Trend:       {}", metrics.trend);
                println!("Seasonality: {}", metrics.seasonality);
            }
        }
        Commands::Patterns {
            input,
            incidents,
            sensitivity,
            seed,
            json,
        } => {
            let points = read_points(&input)?;
            let incidents = match incidents {
                Some(path) => read_incidents(&path)?,
                None => Vec::new(),
            };
            let thresholds = config.thresholds(sensitivity)?;
            let seed = seed.or(config.isolation.seed);

            let anomalies = metricmedic::detect_ensemble(&points, &thresholds, seed);
            let patterns = metricmedic::analyze_patterns(&anomalies, &incidents);
            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            } else if patterns.is_empty() {
                println!("No anomaly patterns found.");
            } else {
                println!("{:<18} | {:>9} | {:>13} | {:<23} | Incidents", "Pattern", "Frequency", "Avg magnitude", "Last detected");
                println!("{:-<18}-|-{:->9}-|-{:->13}-|-{:-<23}-|-{:-<10}", "", "", "", "", "");
                for p in &patterns {
                    println!(
                        "{:<18} | {:>9} | {:>13.2} | {:<23} | {}",
                        p.id,
                        p.frequency,
                        p.avg_magnitude,
                        metricmedic::report::format_timestamp(p.last_detected),
                        if p.correlated_incidents.is_empty() {
                            "-".to_string()
                        } else {
                            p.correlated_incidents.join(", ")
                        }
                    );
                }
            }
        }
        Commands::Compare {
            input,
            sensitivity,
            seed,
            json,
        } => {
            let points = read_points(&input)?;
            let thresholds = config.thresholds(sensitivity)?;
            let seed = seed.or(config.isolation.seed);

            let rows = metricmedic::compare(&points, &thresholds, seed);
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{:<10} | {:>9} | {:>7} | Max severity", "Algorithm", "Evaluated", "Flagged");
                println!("{:-<10}-|-{:->9}-|-{:->7}-|-{:-<12}", "", "", "", "");
                for row in rows {
                    println!(
                        "{:<10} | {:>9} | {:>7} | {}",
                        row.algorithm.to_string(),
                        row.evaluated,
                        row.flagged,
                        row.max_severity
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }
        Commands::Presets { json } => {
            let presets: Vec<_> = SensitivityLevel::ALL.iter().map(|l| l.thresholds()).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                println!(
                    "{:<9} | {:>6} | {:>4} | {:>4} | {:>9} | {:>9} | Min points",
                    "Preset", "Z", "IQR", "MAD", "Isolation", "Agreement"
                );
                println!("{:-<9}-|-{:->6}-|-{:->4}-|-{:->4}-|-{:->9}-|-{:->9}-|-{:-<10}", "", "", "", "", "", "", "");
                for t in presets {
                    println!(
                        "{:<9} | {:>6.2} | {:>4.1} | {:>4.1} | {:>9.2} | {:>9.2} | {}",
                        t.sensitivity_level.to_string(),
                        t.zscore_threshold,
                        t.iqr_multiplier,
                        t.mad_multiplier,
                        t.isolation_threshold,
                        t.ensemble_agreement,
                        t.min_data_points
                    );
                }
            }
        }
    }

    Ok(())
}
