//! The eight-field feature contract shared by training and inference

use crate::preprocessing::columns;
use crate::provenance::FieldSource;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Number of model inputs
pub const N_FEATURES: usize = 8;

/// Model input names, in model order
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    columns::MOOD,
    columns::HOUR,
    columns::WEEK_FLAG,
    columns::SLEEP_HOURS,
    columns::DISTRACTIONS,
    columns::CONFIDENCE_SCORE,
    columns::COMPLETED,
    columns::DAY_OF_WEEK,
];

/// One model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureField {
    Mood,
    Hour,
    WeekFlag,
    SleepHours,
    Distractions,
    ConfidenceScore,
    Completed,
    DayOfWeek,
}

impl FeatureField {
    pub const ALL: [FeatureField; N_FEATURES] = [
        FeatureField::Mood,
        FeatureField::Hour,
        FeatureField::WeekFlag,
        FeatureField::SleepHours,
        FeatureField::Distractions,
        FeatureField::ConfidenceScore,
        FeatureField::Completed,
        FeatureField::DayOfWeek,
    ];

    /// Column and request key
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Position in the feature vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Value used when an inference request omits the field
    pub fn default_value(self) -> f64 {
        match self {
            FeatureField::Mood => 5.0,
            FeatureField::Hour => 14.0,
            FeatureField::WeekFlag => 0.0,
            FeatureField::SleepHours => 7.0,
            FeatureField::Distractions => 2.0,
            FeatureField::ConfidenceScore => 6.0,
            FeatureField::Completed => 1.0,
            FeatureField::DayOfWeek => 2.0,
        }
    }

    /// Range of random placeholders when a training log lacks the column.
    /// `None` means the field takes its default instead.
    pub fn placeholder_range(self) -> Option<RangeInclusive<i64>> {
        match self {
            FeatureField::Mood => Some(1..=10),
            FeatureField::SleepHours => Some(5..=10),
            FeatureField::Distractions => Some(0..=5),
            FeatureField::ConfidenceScore => Some(1..=10),
            FeatureField::Completed => Some(0..=1),
            FeatureField::DayOfWeek => Some(0..=6),
            FeatureField::Hour | FeatureField::WeekFlag => None,
        }
    }
}

impl std::fmt::Display for FeatureField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// "Weekday" → 0, "Weekend" → 1
pub fn week_flag_code(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.eq_ignore_ascii_case(columns::WEEKDAY) {
        Some(0.0)
    } else if text.eq_ignore_ascii_case(columns::WEEKEND) {
        Some(1.0)
    } else {
        None
    }
}

/// A single assembled model input with the origin of every value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; N_FEATURES],
    sources: [FieldSource; N_FEATURES],
}

impl FeatureVector {
    /// All defaults
    pub fn defaults() -> Self {
        Self {
            values: FeatureField::ALL.map(FeatureField::default_value),
            sources: [FieldSource::Defaulted; N_FEATURES],
        }
    }

    pub fn set(&mut self, field: FeatureField, value: f64, source: FieldSource) {
        self.values[field.index()] = value;
        self.sources[field.index()] = source;
    }

    pub fn get(&self, field: FeatureField) -> f64 {
        self.values[field.index()]
    }

    pub fn source(&self, field: FeatureField) -> FieldSource {
        self.sources[field.index()]
    }

    pub fn values(&self) -> &[f64; N_FEATURES] {
        &self.values
    }

    /// 1 × 8 matrix for the classifier
    pub fn to_row(&self) -> Array2<f64> {
        Array2::from_shape_fn((1, N_FEATURES), |(_, j)| self.values[j])
    }
}
