//! Productivity Predictor - activity-log cleaning and task-type prediction
//!
//! This crate turns a raw productivity log (one row per logged activity)
//! into a model that predicts which kind of task a user is likely to do:
//! - Cleaning: timestamp parsing, grouped imputation, category encoding,
//!   deduplication, calendar features, whitespace trimming
//! - Feature engineering: one fixed 8-feature schema shared by training
//!   and inference
//! - Training: stratified split, decision tree / random forest, held-out
//!   classification report, run-tagged artifacts
//! - Inference: one JSON record in, one class code (and label) out
//!
//! # Modules
//!
//! ## Data
//! - [`preprocessing`] - Cleaning pipeline and category mapping
//! - [`feature_engineering`] - Feature schema, training repair and request assembly
//! - [`provenance`] - Stage records and per-field origin flags
//! - [`synthetic`] - Seeded synthetic activity logs
//!
//! ## Models
//! - [`training`] - Classifiers, evaluation and artifacts
//! - [`inference`] - Predictor and reloadable model handle
//!
//! ## Services
//! - [`config`] - Application configuration file
//! - [`cli`] - Command-line interface
//! - [`utils`] - CSV loading, atomic writes and file locks

// Core error handling
pub mod error;

// Data
pub mod preprocessing;
pub mod feature_engineering;
pub mod provenance;
pub mod synthetic;

// Models
pub mod training;
pub mod inference;

// Services
pub mod config;
pub mod cli;
pub mod utils;

pub use error::{PredictorError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PredictorError, Result};

    // Configuration
    pub use crate::config::AppConfig;

    // Cleaning
    pub use crate::preprocessing::{
        CategoryMapping, CleanedDataset, CleaningConfig, CleaningPipeline, MissingColumnPolicy,
    };
    pub use crate::provenance::{CleaningReport, FieldSource};

    // Features
    pub use crate::feature_engineering::{FeatureAssembler, FeatureField, FeatureVector, FEATURE_NAMES};

    // Training
    pub use crate::training::{ClassificationReport, ModelType, Trainer, TrainingConfig, TrainingOutcome};

    // Inference
    pub use crate::inference::{InferenceConfig, ModelHandle, Prediction, Predictor};

    // Synthetic data
    pub use crate::synthetic::ActivityLogGenerator;
}
