//! Inference configuration

use crate::training::{MAPPING_FILE, MODEL_FILE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for serving predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Directory holding the model and mapping artifacts
    pub artifact_dir: PathBuf,

    pub model_file: String,

    pub mapping_file: String,

    /// Reject request values that cannot be read as numbers instead of
    /// replacing them by 0
    pub strict: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("model"),
            model_file: MODEL_FILE.to_string(),
            mapping_file: MAPPING_FILE.to_string(),
            strict: false,
        }
    }
}

impl InferenceConfig {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_file_names(mut self, model: impl Into<String>, mapping: impl Into<String>) -> Self {
        self.model_file = model.into();
        self.mapping_file = mapping.into();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
