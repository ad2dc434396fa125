//! Inference module
//!
//! Serves task-type predictions for ad-hoc records:
//! - Feature assembly with per-field defaults
//! - Optional label decoding against the mapping of the same run
//! - A reloadable `ModelHandle` that swaps models only once fully loaded

mod config;
mod engine;
mod handle;

pub use config::InferenceConfig;
pub use engine::{Prediction, Predictor};
pub use handle::ModelHandle;
