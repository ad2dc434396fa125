//! Predictor: one record in, one task-type code out

use crate::error::{PredictorError, Result};
use crate::feature_engineering::{FeatureAssembler, FeatureVector};
use crate::training::{ArtifactStore, Classifier, MappingArtifact, ModelArtifact};
use super::InferenceConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A single prediction with the inputs it was made from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub code: i64,
    /// Present when decoding was asked for
    pub label: Option<String>,
    pub run_id: String,
    pub features: FeatureVector,
    pub latency_ms: f64,
}

/// A loaded model ready to serve
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: ModelArtifact,
    mapping: Option<MappingArtifact>,
    assembler: FeatureAssembler,
}

impl Predictor {
    /// Load the model and, when present, the mapping of the configured
    /// artifact directory.
    pub fn load(config: &InferenceConfig) -> Result<Self> {
        let store = ArtifactStore::new(&config.artifact_dir)
            .with_file_names(&config.model_file, &config.mapping_file);
        let artifact = store.load_model()?;
        let mapping = store.load_mapping()?;

        match &mapping {
            Some(m) if m.run_id != artifact.run_id => warn!(
                model_run = %artifact.run_id,
                mapping_run = %m.run_id,
                "mapping belongs to a different training run; labels cannot be decoded"
            ),
            None => warn!(dir = %config.artifact_dir.display(), "no mapping artifact; labels cannot be decoded"),
            _ => {}
        }

        info!(
            run_id = %artifact.run_id,
            model_type = %artifact.model.model_type(),
            classes = artifact.model.classes().len(),
            "loaded model"
        );

        let assembler = if config.strict {
            FeatureAssembler::strict()
        } else {
            FeatureAssembler::new()
        };
        Self::from_artifacts(artifact, mapping, assembler)
    }

    pub fn from_artifacts(
        artifact: ModelArtifact,
        mapping: Option<MappingArtifact>,
        assembler: FeatureAssembler,
    ) -> Result<Self> {
        artifact.check_feature_contract()?;
        if !artifact.model.is_fitted() {
            return Err(PredictorError::ModelNotFitted);
        }
        Ok(Self {
            artifact,
            mapping,
            assembler,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.artifact.run_id
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn mapping(&self) -> Option<&MappingArtifact> {
        self.mapping.as_ref()
    }

    /// Class code for one JSON record
    pub fn predict(&self, record: &Value) -> Result<i64> {
        let vector = self.assembler.assemble(record)?;
        self.predict_vector(&vector)
    }

    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<i64> {
        let codes = self.artifact.model.predict(&vector.to_row())?;
        let code = codes.first().copied().ok_or_else(|| PredictorError::ShapeError {
            expected: "1 prediction".to_string(),
            actual: "0 predictions".to_string(),
        })?;
        debug!(code, features = ?vector.values(), "predicted");
        Ok(code)
    }

    /// Label of `code` from the mapping of the same run
    pub fn decode(&self, code: i64) -> Result<String> {
        let mapping = self.mapping.as_ref().ok_or_else(|| {
            PredictorError::EncodingError("no mapping artifact to decode with".to_string())
        })?;
        if mapping.run_id != self.artifact.run_id {
            return Err(PredictorError::EncodingError(format!(
                "mapping run {} does not match model run {}",
                mapping.run_id, self.artifact.run_id
            )));
        }
        mapping
            .mapping
            .label(code)
            .map(str::to_string)
            .ok_or_else(|| PredictorError::EncodingError(format!("code {} is not in the mapping", code)))
    }

    pub fn predict_label(&self, record: &Value) -> Result<String> {
        let code = self.predict(record)?;
        self.decode(code)
    }

    /// Code, optional label and the assembled inputs
    pub fn predict_detailed(&self, record: &Value, decode: bool) -> Result<Prediction> {
        let start = Instant::now();
        let features = self.assembler.assemble(record)?;
        let code = self.predict_vector(&features)?;
        let label = if decode { Some(self.decode(code)?) } else { None };

        Ok(Prediction {
            code,
            label,
            run_id: self.artifact.run_id.clone(),
            features,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }
}
