//! Model training module
//!
//! Fits the task-type classifier on a cleaned activity log:
//! - Seeded stratified train/test split
//! - Decision tree and random forest classifiers (trees built in parallel)
//! - Held-out classification report
//! - Model and mapping artifacts tagged with one run id

mod artifacts;
mod config;
mod engine;
mod metrics;
mod models;
pub mod decision_tree;
pub mod random_forest;

pub use artifacts::{
    ArtifactPaths, ArtifactStore, MappingArtifact, ModelArtifact, MAPPING_FILE, MODEL_FILE,
};
pub use config::{ModelType, TrainingConfig};
pub use engine::{stratified_split, DataSplit, Trainer, TrainingOutcome};
pub use metrics::{AveragedMetrics, ClassMetrics, ClassificationReport};
pub use models::{Classifier, TrainedModel};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
