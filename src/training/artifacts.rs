//! Model and mapping artifacts

use crate::error::{PredictorError, Result};
use crate::feature_engineering::{FeatureField, FEATURE_NAMES};
use crate::preprocessing::CategoryMapping;
use crate::provenance::FieldSource;
use crate::utils::{with_exclusive_lock, write_atomic_all};
use super::metrics::ClassificationReport;
use super::models::TrainedModel;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model.json";
pub const MAPPING_FILE: &str = "task_mapping.json";
const LOCK_FILE: &str = ".artifacts.lock";

/// The trained classifier with everything needed to serve it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Input names in model order
    pub feature_names: Vec<String>,
    pub model: TrainedModel,
    pub report: ClassificationReport,
    pub feature_sources: BTreeMap<FeatureField, FieldSource>,
}

impl ModelArtifact {
    /// The stored feature order must be the one this build assembles
    pub fn check_feature_contract(&self) -> Result<()> {
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(PredictorError::SchemaError(format!(
                "model expects features {:?}, this build provides {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        Ok(())
    }
}

/// The code → label table of the same training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingArtifact {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub mapping: CategoryMapping,
}

/// Where a training run wrote its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub mapping: PathBuf,
}

/// Artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    model_file: String,
    mapping_file: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            model_file: MODEL_FILE.to_string(),
            mapping_file: MAPPING_FILE.to_string(),
        }
    }

    pub fn with_file_names(mut self, model: impl Into<String>, mapping: impl Into<String>) -> Self {
        self.model_file = model.into();
        self.mapping_file = mapping.into();
        self
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.dir.join(&self.model_file),
            mapping: self.dir.join(&self.mapping_file),
        }
    }

    /// Write both artifacts or neither. A failed save leaves the previous
    /// pair in place.
    pub fn save(&self, model: &ModelArtifact, mapping: &MappingArtifact) -> Result<ArtifactPaths> {
        if model.run_id != mapping.run_id {
            return Err(PredictorError::EncodingError(format!(
                "model run {} and mapping run {} differ",
                model.run_id, mapping.run_id
            )));
        }

        let model_bytes = serde_json::to_vec(model)?;
        let mapping_bytes = serde_json::to_vec_pretty(mapping)?;
        let paths = self.paths();

        with_exclusive_lock(&self.dir.join(LOCK_FILE), || {
            write_atomic_all(&[
                (paths.model.as_path(), model_bytes.as_slice()),
                (paths.mapping.as_path(), mapping_bytes.as_slice()),
            ])
        })?;

        info!(
            run_id = %model.run_id,
            model = %paths.model.display(),
            mapping = %paths.mapping.display(),
            "saved artifacts"
        );
        Ok(paths)
    }

    /// `ModelNotFitted` when no model has been trained yet
    pub fn load_model(&self) -> Result<ModelArtifact> {
        let path = self.paths().model;
        if !path.exists() {
            return Err(PredictorError::ModelNotFitted);
        }
        let artifact: ModelArtifact = read_json(&path)?;
        artifact.check_feature_contract()?;
        Ok(artifact)
    }

    /// `None` when no mapping was written
    pub fn load_mapping(&self) -> Result<Option<MappingArtifact>> {
        let path = self.paths().mapping;
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| PredictorError::SerializationError(format!("{}: {}", path.display(), e)))
}
