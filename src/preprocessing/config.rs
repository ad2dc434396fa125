//! Cleaning configuration

use serde::{Deserialize, Serialize};
use super::columns;

/// What to do when a column the model depends on is absent from the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingColumnPolicy {
    /// Fill with seeded random placeholders and flag them as synthesized
    Synthesize,
    /// Abort with a schema error
    Reject,
}

/// Configuration for the cleaning pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Column holding the task category label (the training target)
    pub category_column: String,

    /// Value used for a text column that is entirely null
    pub text_placeholder: String,

    /// Seed for placeholder generation
    pub random_state: u64,

    /// Policy for an absent category column or absent date information
    pub missing_columns: MissingColumnPolicy,

    /// Write the cleaned frame back to the source file
    pub persist: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            category_column: columns::TASK_TYPE.to_string(),
            text_placeholder: "Unknown".to_string(),
            random_state: 42,
            missing_columns: MissingColumnPolicy::Synthesize,
            persist: true,
        }
    }
}

impl CleaningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the missing-column policy
    pub fn with_missing_columns(mut self, policy: MissingColumnPolicy) -> Self {
        self.missing_columns = policy;
        self
    }

    /// Builder method to disable persistence (dry run)
    pub fn without_persist(mut self) -> Self {
        self.persist = false;
        self
    }
}
