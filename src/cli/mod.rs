//! cardio-train CLI
//!
//! Thin command-line front end over the training pipeline: train on two
//! CSV splits, inspect a persisted artifact, or score a feature CSV.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::export::load_model;
use crate::tracking::TrackingConfig;
use crate::training::{ModelKind, ModelTrainer, TrainerConfig};
use crate::utils::load_csv_matrix;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardio-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart-disease model selection and training pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep the model catalog on a train/test split and persist the winner
    Train {
        /// Training CSV (numeric, label in the last column)
        #[arg(long)]
        train: PathBuf,

        /// Held-out test CSV (same columns as the training file)
        #[arg(long)]
        test: PathBuf,

        /// Output artifact path
        #[arg(short, long, default_value = "artifacts/model.bin")]
        artifact: PathBuf,

        /// Minimum test accuracy required to persist the winner
        #[arg(long, default_value = "0.6")]
        threshold: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Show the metadata of a persisted model artifact
    Inspect {
        /// Artifact file to inspect
        #[arg(short, long)]
        artifact: PathBuf,
    },

    /// Score a feature CSV with a persisted model
    Predict {
        /// Artifact file holding the trained model
        #[arg(short, long)]
        artifact: PathBuf,

        /// Input CSV with one column per model feature, no label
        #[arg(short, long)]
        input: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    train_path: &PathBuf,
    test_path: &PathBuf,
    artifact: &PathBuf,
    threshold: f64,
    seed: u64,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let train = load_csv_matrix(train_path)?;
    let test = load_csv_matrix(test_path)?;
    step_done(&format!(
        "{}×{} train, {}×{} test in {:?}",
        train.nrows(),
        train.ncols(),
        test.nrows(),
        test.ncols(),
        start.elapsed()
    ));

    let config = TrainerConfig::new(artifact.clone())
        .with_quality_threshold(threshold)
        .with_seed(seed)
        .with_tracking(TrackingConfig::from_env());

    step_run(&format!(
        "Sweeping {} model families",
        ModelKind::ALL.len()
    ));
    let start = Instant::now();
    let mut trainer = ModelTrainer::new(config);
    let accuracy = trainer.train(train, test)?;
    step_done(&format!("{:?}", start.elapsed()));

    if let Some(report) = trainer.selection() {
        println!();
        println!("  {:<24} {:>10}", muted("Model"), muted("Accuracy"));
        println!("  {}", dim(&"─".repeat(36)));
        for (kind, score) in &report.scores {
            println!("  {:<24} {:>10.4}", kind.name(), score);
        }
        println!();
        println!(
            "  {} {} {} {:.4}",
            ok("best"),
            report.winner.kind.name().white().bold(),
            muted("accuracy:"),
            accuracy
        );
    }

    if let Some(eval) = trainer.evaluation() {
        println!();
        for (name, value) in eval.named_values() {
            println!("  {:<16} {}", muted(name), format!("{:.4}", value).white());
        }
    }

    println!();
    println!("  {:<16} {}", muted("artifact"), artifact.display());
    println!();

    Ok(())
}

pub fn cmd_inspect(artifact: &PathBuf) -> anyhow::Result<()> {
    section("Inspect");

    let (_, metadata) = load_model(artifact)?;

    println!("  {:<16} {}", muted("model"), metadata.name.white().bold());
    println!("  {:<16} {}", muted("version"), metadata.version);
    println!("  {:<16} {}", muted("trained"), metadata.trained_at);
    println!("  {:<16} {}", muted("target"), metadata.target_name);
    println!(
        "  {:<16} {}",
        muted("features"),
        metadata.feature_names.join(", ")
    );

    section("Hyperparameters");
    if metadata.hyperparameters.is_empty() {
        println!("  {}", dim("defaults"));
    } else {
        let mut params: Vec<_> = metadata.hyperparameters.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in params {
            println!("  {:<24} {}", muted(key), value);
        }
    }

    section("Metrics");
    let mut metrics: Vec<_> = metadata.metrics.iter().collect();
    metrics.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in metrics {
        println!("  {:<24} {:.4}", muted(key), value);
    }

    println!();
    Ok(())
}

pub fn cmd_predict(artifact: &PathBuf, input: &PathBuf) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading artifact");
    let (model, metadata) = load_model(artifact)?;
    step_done(&metadata.name);

    step_run("Loading input");
    let x = load_csv_matrix(input)?;
    step_done(&format!("{} rows × {} cols", x.nrows(), x.ncols()));

    let expected = metadata.feature_names.len();
    if x.ncols() != expected {
        anyhow::bail!(
            "expected {} feature columns, found {}",
            expected,
            x.ncols()
        );
    }

    let predictions = model.predict(&x)?;

    println!();
    println!("  {:>6} {:>12}", muted("row"), muted("prediction"));
    println!("  {}", dim(&"─".repeat(20)));
    for (i, p) in predictions.iter().enumerate() {
        println!("  {:>6} {:>12}", i, *p as i64);
    }

    let positives = predictions.iter().filter(|p| **p > 0.5).count();
    println!();
    println!(
        "  {} {} of {} rows predicted positive",
        ok("✓"),
        positives,
        predictions.len()
    );
    println!();

    Ok(())
}
