//! Training engine: split, fit, evaluate, persist

use crate::error::{PredictorError, Result};
use crate::feature_engineering::{FeatureField, TrainingFeatureBuilder, FEATURE_NAMES};
use crate::preprocessing::{CategoryMapping, CleanedDataset};
use crate::provenance::FieldSource;
use super::artifacts::{ArtifactPaths, ArtifactStore, MappingArtifact, ModelArtifact};
use super::config::TrainingConfig;
use super::metrics::ClassificationReport;
use super::models::{Classifier, TrainedModel};
use chrono::Utc;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified split: every class contributes `round(test_fraction * n)` of
/// its rows to the test side, at least one and never all of them.
pub fn stratified_split(y: &[i64], test_fraction: f64, seed: u64) -> Result<DataSplit> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(PredictorError::ConfigError(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &class) in y.iter().enumerate() {
        by_class.entry(class).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = DataSplit {
        train: Vec::with_capacity(y.len()),
        test: Vec::new(),
    };

    for (class, mut members) in by_class {
        let n = members.len();
        if n < 2 {
            return Err(PredictorError::TrainingError(format!(
                "class {} has {} sample(s), stratified split needs at least 2",
                class, n
            )));
        }
        members.shuffle(&mut rng);
        let n_test = ((test_fraction * n as f64).round() as usize).clamp(1, n - 1);
        split.test.extend_from_slice(&members[..n_test]);
        split.train.extend_from_slice(&members[n_test..]);
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub run_id: String,
    pub model: TrainedModel,
    pub mapping: CategoryMapping,
    pub report: ClassificationReport,
    pub feature_sources: BTreeMap<FeatureField, FieldSource>,
    pub n_train: usize,
    pub n_test: usize,
    pub training_time_secs: f64,
    /// Set once the artifacts are on disk
    pub artifacts: Option<ArtifactPaths>,
}

impl TrainingOutcome {
    /// Feature importances by name, most important first
    pub fn ranked_importances(&self) -> Vec<(&'static str, f64)> {
        let Some(importances) = self.model.feature_importances() else {
            return Vec::new();
        };
        let mut pairs: Vec<(&'static str, f64)> = FEATURE_NAMES
            .iter()
            .copied()
            .zip(importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }

    /// Text summary of the run
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Productivity Predictor Training Report ===\n\n");
        report.push_str(&format!("Run:        {}\n", self.run_id));
        report.push_str(&format!("Model Type: {}\n", self.model.model_type()));
        report.push_str(&format!("Train rows: {}\n", self.n_train));
        report.push_str(&format!("Test rows:  {}\n", self.n_test));
        report.push_str(&format!("Time:       {:.3} seconds\n\n", self.training_time_secs));

        report.push_str("--- Evaluation ---\n");
        report.push_str(&self.report.to_string());
        report.push('\n');

        let ranked = self.ranked_importances();
        if !ranked.is_empty() {
            report.push_str("--- Feature Importance ---\n");
            for (name, imp) in &ranked {
                report.push_str(&format!("  {:<20} {:.4}\n", name, imp));
            }
            report.push('\n');
        }

        let invented: Vec<String> = self
            .feature_sources
            .iter()
            .filter(|(_, s)| s.is_invented())
            .map(|(f, s)| format!("  {:<20} {}", f.name(), s))
            .collect();
        if !invented.is_empty() {
            report.push_str("--- Placeholder Features ---\n");
            report.push_str(&invented.join("\n"));
            report.push('\n');
        }

        report
    }
}

/// Fits the task-type classifier on a cleaned log
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit and evaluate without writing anything
    pub fn fit(&self, dataset: &CleanedDataset) -> Result<TrainingOutcome> {
        self.fit_frame(&dataset.frame, &dataset.mapping)
    }

    pub fn fit_frame(&self, frame: &DataFrame, mapping: &CategoryMapping) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let y = self.target(frame)?;
        mapping.validate_codes(y.iter().copied())?;

        let matrix = TrainingFeatureBuilder::new(self.config.random_state).build(frame)?;
        let labels = y.to_vec();
        let split = stratified_split(&labels, self.config.test_fraction, self.config.random_state)?;
        info!(
            run_id = %run_id,
            train = split.train.len(),
            test = split.test.len(),
            classes = mapping.len(),
            "stratified split"
        );

        let (x_train, y_train) = select_rows(&matrix.features, &y, &split.train);
        let (x_test, y_test) = select_rows(&matrix.features, &y, &split.test);

        let mut model = TrainedModel::from_config(&self.config);
        model.fit(&x_train, &y_train)?;

        let y_pred = model.predict(&x_test)?;
        let report = ClassificationReport::compute(
            &y_test.to_vec(),
            &y_pred.to_vec(),
            Some(mapping),
        )?;
        info!(run_id = %run_id, accuracy = report.accuracy, "evaluated on held-out rows");
        if report.accuracy < 1.0 / mapping.len().max(1) as f64 {
            warn!(accuracy = report.accuracy, "accuracy is below chance level");
        }

        Ok(TrainingOutcome {
            run_id,
            model,
            mapping: mapping.clone(),
            report,
            feature_sources: matrix.sources,
            n_train: split.train.len(),
            n_test: split.test.len(),
            training_time_secs: start.elapsed().as_secs_f64(),
            artifacts: None,
        })
    }

    /// Fit, evaluate and write both artifacts under one run id
    pub fn train(&self, dataset: &CleanedDataset) -> Result<TrainingOutcome> {
        let mut outcome = self.fit(dataset)?;
        outcome.artifacts = Some(self.persist(&outcome)?);
        Ok(outcome)
    }

    pub fn persist(&self, outcome: &TrainingOutcome) -> Result<ArtifactPaths> {
        let created_at = Utc::now();
        let model = ModelArtifact {
            run_id: outcome.run_id.clone(),
            created_at,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            model: outcome.model.clone(),
            report: outcome.report.clone(),
            feature_sources: outcome.feature_sources.clone(),
        };
        let mapping = MappingArtifact {
            run_id: outcome.run_id.clone(),
            created_at,
            mapping: outcome.mapping.clone(),
        };

        ArtifactStore::new(&self.config.artifact_dir).save(&model, &mapping)
    }

    fn target(&self, frame: &DataFrame) -> Result<Array1<i64>> {
        let column = frame.column(&self.config.target_column).map_err(|_| {
            PredictorError::SchemaError(format!("target column '{}' is absent", self.config.target_column))
        })?;
        let codes = column.as_materialized_series().cast(&DataType::Int64)?;
        let codes = codes.i64()?;

        if codes.null_count() > 0 {
            return Err(PredictorError::TrainingError(format!(
                "target column '{}' has {} null code(s)",
                self.config.target_column,
                codes.null_count()
            )));
        }
        if codes.is_empty() {
            return Err(PredictorError::TrainingError("no rows to train on".to_string()));
        }

        Ok(codes.into_no_null_iter().collect())
    }
}

fn select_rows(x: &Array2<f64>, y: &Array1<i64>, rows: &[usize]) -> (Array2<f64>, Array1<i64>) {
    (x.select(Axis(0), rows), y.select(Axis(0), rows))
}
