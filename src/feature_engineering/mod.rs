//! Feature engineering
//!
//! Produces the fixed 8-field model input, either from a cleaned log for
//! training or from a single ad-hoc record at inference time.

mod assembler;
mod repair;
mod schema;

pub use assembler::FeatureAssembler;
pub use repair::{TrainingFeatureBuilder, TrainingMatrix};
pub use schema::{week_flag_code, FeatureField, FeatureVector, FEATURE_NAMES, N_FEATURES};
