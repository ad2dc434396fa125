//! Shared handle to the model being served

use crate::error::Result;
use super::{InferenceConfig, Predictor};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// The served predictor. Readers get a cheap `Arc` snapshot; a reload
/// builds the replacement completely before swapping it in, so a failed
/// reload keeps the previous model.
#[derive(Debug)]
pub struct ModelHandle {
    config: InferenceConfig,
    current: RwLock<Arc<Predictor>>,
}

impl ModelHandle {
    pub fn load(config: InferenceConfig) -> Result<Self> {
        let predictor = Predictor::load(&config)?;
        Ok(Self {
            config,
            current: RwLock::new(Arc::new(predictor)),
        })
    }

    pub fn from_predictor(config: InferenceConfig, predictor: Predictor) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(predictor)),
        }
    }

    pub fn current(&self) -> Arc<Predictor> {
        Arc::clone(&self.current.read())
    }

    /// Load the artifacts again and swap them in. Returns the new run id.
    pub fn reload(&self) -> Result<String> {
        let replacement = Arc::new(Predictor::load(&self.config)?);
        let run_id = replacement.run_id().to_string();

        let previous = {
            let mut guard = self.current.write();
            std::mem::replace(&mut *guard, replacement)
        };
        info!(from = %previous.run_id(), to = %run_id, "model reloaded");
        Ok(run_id)
    }

    pub fn predict(&self, record: &Value) -> Result<i64> {
        self.current().predict(record)
    }
}
