//! Activity-log preprocessing
//!
//! Turns a raw, messy activity log into a model-ready table:
//! - Group-aware missing value imputation
//! - Sorted label encoding of the task category
//! - Calendar features (day of week, weekday/weekend, hour of day)
//! - The ordered cleaning pipeline that persists its result in place

mod config;
mod imputer;
mod encoder;
mod pipeline;
pub mod time_features;

pub use config::{CleaningConfig, MissingColumnPolicy};
pub use imputer::{GroupedImputer, ImputationSummary};
pub use encoder::{CategoryEncoder, CategoryMapping, EncodedCategories, DEFAULT_TASK_LABELS};
pub use pipeline::{mapping_sidecar_path, CleaningPipeline, CleanedDataset, MappingSidecar};
pub use time_features::{TimeFeatureExtractor, TimeFeatureSummary};

use crate::error::{PredictorError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Well-known column names of the activity log
pub mod columns {
    pub const TASK_TYPE: &str = "TaskType";
    pub const DATE: &str = "Date";
    pub const TIME: &str = "Time";
    pub const DAY_OF_WEEK: &str = "DayOfWeek";
    pub const WEEK_FLAG: &str = "Week(day/end)";
    pub const HOUR: &str = "Hour";
    pub const MOOD: &str = "Mood";
    pub const SLEEP_HOURS: &str = "SleepHours";
    pub const DISTRACTIONS: &str = "Distractions";
    pub const CONFIDENCE_SCORE: &str = "ConfidenceScore";
    pub const COMPLETED: &str = "Completed";

    /// Timestamp columns are parsed, never imputed
    pub const TIMESTAMPS: [&str; 2] = [DATE, TIME];

    /// Recomputed by the time-feature stage on every run, never imputed
    pub const DERIVED: [&str; 3] = [DAY_OF_WEEK, WEEK_FLAG, HOUR];

    pub const WEEKDAY: &str = "Weekday";
    pub const WEEKEND: &str = "Weekend";
}

/// Column data type as seen by the cleaning stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Text,
    Boolean,
    Unknown,
}

impl ColumnType {
    pub fn of(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnType::Numeric
        } else if matches!(dtype, DataType::String) {
            ColumnType::Text
        } else if matches!(dtype, DataType::Boolean) {
            ColumnType::Boolean
        } else {
            ColumnType::Unknown
        }
    }
}

/// Check if dtype is numeric
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of all columns of the given kind, in frame order
pub fn columns_of_type(df: &DataFrame, kind: ColumnType) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| ColumnType::of(c.dtype()) == kind)
        .map(|c| c.name().to_string())
        .collect()
}

/// Per-column statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStats {
    pub name: String,
    pub dtype: ColumnType,
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unique_count: Option<usize>,
}

impl FeatureStats {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            count: 0,
            null_count: 0,
            mean: None,
            std: None,
            min: None,
            max: None,
            unique_count: None,
        }
    }

    /// Compute statistics for any column; numeric moments only for numeric columns
    pub fn from_series(series: &Series) -> Result<Self> {
        let mut stats = Self::new(series.name().as_str(), ColumnType::of(series.dtype()));
        stats.count = series.len();
        stats.null_count = series.null_count();
        stats.unique_count = series.n_unique().ok();

        if stats.dtype == ColumnType::Numeric {
            let casted = series.cast(&DataType::Float64)?;
            let ca = casted.f64()?;
            stats.mean = ca.mean();
            stats.std = ca.std(1);
            stats.min = ca.min();
            stats.max = ca.max();
        }

        Ok(stats)
    }

    /// Sample variance is strictly positive
    pub fn has_variance(&self) -> bool {
        self.std.map_or(false, |s| s.is_finite() && s > 0.0)
    }
}

/// Statistics for every column of the frame
pub fn describe(df: &DataFrame) -> Result<Vec<FeatureStats>> {
    df.get_columns()
        .iter()
        .map(|c| FeatureStats::from_series(c.as_materialized_series()))
        .collect()
}

/// Numeric columns with non-zero variance, for consumers such as a
/// correlation matrix that need at least `min_columns` of them
pub fn varying_numeric_columns(df: &DataFrame, min_columns: usize) -> Result<Vec<String>> {
    let qualifying: Vec<String> = describe(df)?
        .into_iter()
        .filter(|s| s.dtype == ColumnType::Numeric && s.has_variance())
        .map(|s| s.name)
        .collect();

    if qualifying.len() < min_columns {
        return Err(PredictorError::SchemaError(format!(
            "need at least {} numeric columns with non-zero variance, found {} ({:?})",
            min_columns,
            qualifying.len(),
            qualifying
        )));
    }

    Ok(qualifying)
}
