//! Training configuration

use crate::preprocessing::columns;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Type of classifier to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    RandomForest,
    DecisionTree,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::RandomForest => write!(f, "random_forest"),
            ModelType::DecisionTree => write!(f, "decision_tree"),
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Column holding the encoded task category
    pub target_column: String,

    /// Share of each class held out for evaluation
    pub test_fraction: f64,

    /// Seed for the split and the estimator
    pub random_state: u64,

    pub model_type: ModelType,

    /// Number of trees (random forest only)
    pub n_estimators: usize,

    pub max_depth: Option<usize>,

    pub min_samples_split: usize,

    pub min_samples_leaf: usize,

    /// Directory receiving the model and mapping artifacts
    pub artifact_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: columns::TASK_TYPE.to_string(),
            test_fraction: 0.2,
            random_state: 42,
            model_type: ModelType::RandomForest,
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
            artifact_dir: PathBuf::from("model"),
        }
    }
}

impl TrainingConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            ..Default::default()
        }
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set the artifact directory
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }
}
