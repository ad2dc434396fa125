//! Application configuration

use crate::error::{PredictorError, Result};
use crate::inference::InferenceConfig;
use crate::preprocessing::CleaningConfig;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cleaning, training and inference settings in one file.
/// Sections and fields left out of the file take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cleaning: CleaningConfig,
    pub training: TrainingConfig,
    pub inference: InferenceConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PredictorError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
            .map_err(|e| PredictorError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| PredictorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fraction = self.training.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(PredictorError::ConfigError(format!(
                "training.test_fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if self.training.n_estimators == 0 {
            return Err(PredictorError::ConfigError("training.n_estimators must be at least 1".to_string()));
        }
        if self.cleaning.category_column.trim().is_empty() {
            return Err(PredictorError::ConfigError("cleaning.category_column is empty".to_string()));
        }
        if self.training.target_column != self.cleaning.category_column {
            return Err(PredictorError::ConfigError(format!(
                "training.target_column '{}' must name the cleaned category column '{}'",
                self.training.target_column, self.cleaning.category_column
            )));
        }
        Ok(())
    }
}
