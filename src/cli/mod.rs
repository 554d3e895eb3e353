//! Command-line interface
//!
//! Loads a CSV file, runs the detection pipeline and prints a summary with
//! the ranked, explained anomalies.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::anomaly::ScoringMethod;
use crate::dataset::{ColumnKind, Dataset};
use crate::pipeline::{AnomalyPipeline, AnomalyReport, PipelineConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString  { s.truecolor(240, 110, 100) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "explainable-anomaly")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Unsupervised anomaly detection with human-readable explanations")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect and explain anomalous rows in a CSV file
    Detect {
        /// Input CSV file with a header row
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scoring strategy: isolation_forest or autoencoder
        #[arg(short, long)]
        method: Option<ScoringMethod>,

        /// Expected anomaly proportion, in (0, 1]
        #[arg(long)]
        contamination: Option<f64>,

        /// Explanation sensitivity (z-score threshold)
        #[arg(long)]
        z_threshold: Option<f64>,

        /// Number of trees in the ensemble
        #[arg(long)]
        trees: Option<usize>,

        /// Rows drawn per tree
        #[arg(long)]
        subsample: Option<usize>,

        /// Autoencoder training epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Autoencoder mini-batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Build trees on a single thread
        #[arg(long)]
        sequential: bool,

        /// Maximum number of anomalies to list
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Show column kinds and validation issues for a CSV file
    Info {
        /// Input CSV file with a header row
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Overrides collected from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub method: Option<ScoringMethod>,
    pub contamination: Option<f64>,
    pub z_threshold: Option<f64>,
    pub trees: Option<usize>,
    pub subsample: Option<usize>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
    pub sequential: bool,
}

/// Resolve the run configuration: file (or defaults), then flag overrides
pub fn build_config(file: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<PipelineConfig> {
    let mut config = match file {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(method) = overrides.method {
        config.method = method;
    }
    if let Some(c) = overrides.contamination {
        config.contamination_rate = c;
    }
    if let Some(z) = overrides.z_threshold {
        config.z_threshold = z;
    }
    if let Some(n) = overrides.trees {
        config.ensemble_size = n;
    }
    if let Some(n) = overrides.subsample {
        config.subsample_size = Some(n);
    }
    if let Some(n) = overrides.epochs {
        config.autoencoder.epochs = n;
    }
    if let Some(n) = overrides.batch_size {
        config.autoencoder.batch_size = n;
    }
    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if overrides.sequential {
        config.parallel = false;
    }

    config.validate()?;
    Ok(config)
}

/// Entry point used by the binary
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Detect {
            data,
            config,
            method,
            contamination,
            z_threshold,
            trees,
            subsample,
            epochs,
            batch_size,
            seed,
            sequential,
            top,
        } => {
            let overrides = ConfigOverrides {
                method,
                contamination,
                z_threshold,
                trees,
                subsample,
                epochs,
                batch_size,
                seed,
                sequential,
            };
            cmd_detect(&data, config.as_deref(), &overrides, top)
        }
        Commands::Info { data } => cmd_info(&data),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_detect(
    data_path: &Path,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    top: usize,
) -> anyhow::Result<()> {
    section("Detect");

    let config = build_config(config_path, overrides)?;

    step_run("Loading data");
    let start = Instant::now();
    let dataset = Dataset::read_csv(data_path)?;
    step_done(&format!(
        "{} rows × {} cols  {:.0?}",
        dataset.n_rows(),
        dataset.n_columns(),
        start.elapsed()
    ));

    let issues = dataset.validate();
    if !issues.is_empty() {
        println!();
        for issue in &issues {
            println!("  {} {}", alert("✗"), issue);
        }
        anyhow::bail!("dataset failed validation");
    }

    step_run(&format!("Running {}", config.method.name()));
    let start = Instant::now();
    let report = AnomalyPipeline::new(config).run(&dataset)?;
    let detail = match report.settings.method {
        ScoringMethod::IsolationForest => format!("{} trees", report.settings.ensemble_size),
        ScoringMethod::Autoencoder => format!("{} epochs", report.settings.autoencoder.epochs),
    };
    step_done(&format!("{}  {:.0?}", detail, start.elapsed()));

    print_summary(&report);
    print_anomalies(&report, top);

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let dataset = Dataset::read_csv(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), dataset.n_rows());
    println!("  {:<12} {}", muted("Columns"), dataset.n_columns());
    println!();

    println!("  {:<24} {:<12}", muted("Column"), muted("Kind"));
    println!("  {}", dim(&"─".repeat(40)));

    for col in dataset.columns() {
        let kind = match col.kind() {
            ColumnKind::Numeric => "numeric".to_string(),
            ColumnKind::Categorical => "categorical".to_string(),
            ColumnKind::Unsupported(dtype) => format!("unsupported ({})", dtype),
        };
        println!("  {:<24} {}", col.name, kind.truecolor(140, 140, 140));
    }

    let issues = dataset.validate();
    if !issues.is_empty() {
        println!();
        for issue in &issues {
            println!("  {} {}", alert("✗"), issue);
        }
    }

    println!();
    Ok(())
}

fn print_summary(report: &AnomalyReport) {
    section("Detection Summary");
    println!("  {:<16} {}", muted("Method"), report.settings.method.name());
    println!("  {:<16} {}", muted("Total rows"), report.len());
    println!("  {:<16} {}", muted("Anomalies"), report.n_anomalies());
    println!("  {:<16} {:.2}%", muted("Anomaly %"), 100.0 * report.anomaly_rate());
    println!("  {:<16} {}", muted("Z threshold"), report.settings.z_threshold);
    println!("  {:<16} {}", muted("Features"), report.n_features);
}

fn print_anomalies(report: &AnomalyReport, top: usize) {
    let anomalies = report.anomalies();
    if anomalies.is_empty() {
        return;
    }

    section("Detailed Anomalies");
    println!("  {:>6}  {:>7}  {}", muted("Row"), muted("Score"), muted("Explanation"));
    for row in anomalies.iter().take(top) {
        println!(
            "  {:>6}  {:>7.4}  {}",
            row.index,
            row.score,
            row.explanation
        );
    }
    if anomalies.len() > top {
        println!("  {}", dim(&format!("… {} more", anomalies.len() - top)));
    }
}
