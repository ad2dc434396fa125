//! Productivity Predictor CLI Module
//!
//! Command-line interface for cleaning activity logs, training the
//! task-type classifier and serving single predictions.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AppConfig;
use crate::feature_engineering::{FeatureField, FEATURE_NAMES};
use crate::inference::{InferenceConfig, Predictor};
use crate::preprocessing::{describe, CleaningPipeline, ColumnType};
use crate::synthetic::ActivityLogGenerator;
use crate::training::{ModelType, Trainer};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn caution(s: &str) -> ColoredString { s.truecolor(230, 190, 90) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_warn(msg: &str) {
    println!("  {} {}", caution("!"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "productivity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean activity logs and predict the next task type")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file (missing fields take defaults)
    #[arg(short, long, global = true, env = "PRODUCTIVITY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean an activity log in place
    Clean {
        /// Activity log (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Report what would change without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Clean a log, train the classifier and save the artifacts
    Train {
        /// Activity log (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Artifact directory
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Model type (random_forest, decision_tree)
        #[arg(short, long)]
        model: Option<String>,

        /// Random seed for the split and the model
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict the task type of one JSON record
    Predict {
        /// Artifact directory
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Record, e.g. '{"Mood": 7, "Hour": 9}'
        #[arg(short, long)]
        input: String,

        /// Also print the task label
        #[arg(long)]
        decode: bool,

        /// Reject values that are not numbers
        #[arg(long)]
        strict: bool,
    },

    /// Show data information
    Info {
        /// Activity log (CSV)
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Write a synthetic activity log
    Sample {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of hourly rows
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(p) => Ok(AppConfig::from_file(p)?),
        None => Ok(AppConfig::default()),
    }
}

fn parse_model_type(name: &str) -> anyhow::Result<ModelType> {
    match name {
        "random_forest" | "rf" => Ok(ModelType::RandomForest),
        "decision_tree" | "tree" => Ok(ModelType::DecisionTree),
        _ => anyhow::bail!("Invalid model type: {}", name),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(config: &AppConfig, data_path: &Path, dry_run: bool) -> anyhow::Result<()> {
    section("Clean");

    let mut cleaning = config.cleaning.clone();
    if dry_run {
        cleaning = cleaning.without_persist();
    }

    step_run(&format!("Cleaning {}", data_path.display()));
    let start = Instant::now();
    let cleaned = CleaningPipeline::new(cleaning).run(data_path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        cleaned.frame.height(),
        cleaned.frame.width(),
        start.elapsed()
    ));

    let report = &cleaned.report;
    println!();
    kv("Imputed cells", &report.imputed_cells.to_string());
    kv("Duplicates", &report.duplicates_dropped.to_string());
    kv("Unlabeled rows", &report.critical_rows_dropped.to_string());
    kv("Bad timestamps", &report.unparseable_timestamps.to_string());
    kv("Written", if report.persisted { "yes" } else { "no (dry run)" });

    section("Task Mapping");
    for (code, label) in cleaned.mapping.iter() {
        println!("  {:>4}  {}", accent(&code.to_string()), label);
    }

    section("Stages");
    println!("  {:<18} {:>8} {:>8} {:>8}", muted("Stage"), muted("Rows in"), muted("Rows out"), muted("ms"));
    for stage in &report.stages {
        println!(
            "  {:<18} {:>8} {:>8} {:>8}",
            stage.step, stage.rows_before, stage.rows_after, stage.duration_ms
        );
    }

    for (field, source) in &report.fields {
        if source.is_invented() {
            step_warn(&format!("{} is {}", field, source));
        }
    }

    println!();
    Ok(())
}

pub fn cmd_train(
    config: &AppConfig,
    data_path: &Path,
    model_dir: Option<&Path>,
    model_type: Option<&str>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    section("Train");

    let mut training = config.training.clone();
    if let Some(dir) = model_dir {
        training = training.with_artifact_dir(dir);
    }
    if let Some(name) = model_type {
        training.model_type = parse_model_type(name)?;
    }
    if let Some(seed) = seed {
        training = training.with_random_state(seed);
    }

    step_run("Cleaning data");
    let start = Instant::now();
    let dataset = CleaningPipeline::new(config.cleaning.clone()).run(data_path)?;
    step_done(&format!("{} rows in {:?}", dataset.frame.height(), start.elapsed()));

    step_run(&format!("Training {}", training.model_type.to_string().cyan()));
    let trainer = Trainer::new(training);
    let outcome = trainer.train(&dataset)?;
    step_done(&format!("{:.3}s", outcome.training_time_secs));

    println!();
    kv("Run", &outcome.run_id);
    kv("Accuracy", &format!("{:.4}", outcome.report.accuracy));
    kv("Train / test", &format!("{} / {}", outcome.n_train, outcome.n_test));
    if let Some(paths) = &outcome.artifacts {
        kv("Model", &paths.model.display().to_string());
        kv("Mapping", &paths.mapping.display().to_string());
    }

    section("Evaluation");
    for line in outcome.report.to_string().lines() {
        println!("  {}", line);
    }

    let ranked = outcome.ranked_importances();
    if !ranked.is_empty() {
        section("Feature Importance");
        for (name, importance) in ranked {
            let bar = "█".repeat((importance * 40.0).round() as usize);
            println!("  {:<18} {:>6.4} {}", name, importance, accent(&bar));
        }
    }

    for (field, source) in &outcome.feature_sources {
        if source.is_invented() {
            step_warn(&format!("{} was trained on placeholder values ({})", field.name(), source));
        }
    }

    println!();
    Ok(())
}

pub fn cmd_predict(
    config: &AppConfig,
    model_dir: Option<&Path>,
    input: &str,
    decode: bool,
    strict: bool,
) -> anyhow::Result<()> {
    let mut inference: InferenceConfig = config.inference.clone();
    if let Some(dir) = model_dir {
        inference.artifact_dir = dir.to_path_buf();
    }
    if strict {
        inference = inference.with_strict(true);
    }

    let record: serde_json::Value = serde_json::from_str(input)?;
    let predictor = Predictor::load(&inference)?;
    let prediction = predictor.predict_detailed(&record, decode)?;

    section("Predict");
    kv("Run", &prediction.run_id);
    match &prediction.label {
        Some(label) => kv("Task", &format!("{} ({})", prediction.code, label.bold())),
        None => kv("Task", &prediction.code.to_string()),
    }

    println!();
    println!("  {:<18} {:>8} {}", muted("Feature"), muted("Value"), muted("Source"));
    for (i, name) in FEATURE_NAMES.iter().enumerate() {
        let field = FeatureField::ALL[i];
        println!(
            "  {:<18} {:>8} {}",
            name,
            prediction.features.get(field),
            dim(&prediction.features.source(field).to_string())
        );
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let loader = DataLoader::new();
    let info = loader.file_info(data_path)?;
    let df = loader.load_csv(data_path)?;

    kv("File", &data_path.display().to_string());
    kv("Rows", &info.n_rows.to_string());
    kv("Columns", &df.width().to_string());
    kv("Size", &format!("{:.2} KB", info.file_size as f64 / 1024.0));
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name().as_str(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    let numeric: Vec<_> = describe(&df)?
        .into_iter()
        .filter(|s| s.dtype == ColumnType::Numeric)
        .collect();
    if !numeric.is_empty() {
        section("Numeric Columns");
        println!(
            "  {:<20} {:>9} {:>9} {:>9} {:>9}",
            muted("Column"), muted("Mean"), muted("Std"), muted("Min"), muted("Max")
        );
        let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v));
        for s in numeric {
            println!(
                "  {:<20} {:>9} {:>9} {:>9} {:>9}",
                s.name, cell(s.mean), cell(s.std), cell(s.min), cell(s.max)
            );
        }
    }

    println!();
    Ok(())
}

pub fn cmd_sample(output: &Path, rows: usize, seed: u64) -> anyhow::Result<()> {
    section("Sample");

    step_run(&format!("Writing {} rows → {}", rows, output.display()));
    let df = ActivityLogGenerator::new(rows)
        .with_random_state(seed)
        .write_csv(output)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    println!();
    Ok(())
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean { data, dry_run } => cmd_clean(&config, &data, dry_run),
        Commands::Train { data, model_dir, model, seed } => {
            cmd_train(&config, &data, model_dir.as_deref(), model.as_deref(), seed)
        }
        Commands::Predict { model_dir, input, decode, strict } => {
            cmd_predict(&config, model_dir.as_deref(), &input, decode, strict)
        }
        Commands::Info { data } => cmd_info(&data),
        Commands::Sample { output, rows, seed } => cmd_sample(&output, rows, seed),
    }
}
