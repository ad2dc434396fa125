//! Task category encoding

use crate::error::{PredictorError, Result};
use super::{is_numeric_dtype, MissingColumnPolicy};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Labels used when a log carries no category column at all
pub const DEFAULT_TASK_LABELS: [&str; 6] = ["Study", "Exercise", "Social", "Leisure", "Sleep", "Work"];

/// Bidirectional code <-> label table.
///
/// Codes are dense from 0. The table built at cleaning time is the one that
/// must be persisted with the model trained on that data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMapping {
    labels: BTreeMap<i64, String>,
}

impl CategoryMapping {
    /// Assign codes in the given label order
    pub fn from_ordered_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .enumerate()
                .map(|(code, label)| (code as i64, label.into()))
                .collect(),
        }
    }

    /// Sorted distinct labels, coded in sorted order
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let distinct: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self::from_ordered_labels(distinct)
    }

    /// `{0:Study, 1:Exercise, 2:Social, 3:Leisure, 4:Sleep, 5:Work}`
    pub fn default_tasks() -> Self {
        Self::from_ordered_labels(DEFAULT_TASK_LABELS)
    }

    pub fn label(&self, code: i64) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    pub fn code(&self, label: &str) -> Option<i64> {
        self.labels.iter().find(|(_, l)| l.as_str() == label).map(|(c, _)| *c)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.labels.iter().map(|(c, l)| (*c, l.as_str()))
    }

    /// Codes are exactly `0..len`
    pub fn is_dense(&self) -> bool {
        self.labels.keys().copied().eq(0..self.labels.len() as i64)
    }

    /// Every code is known to this mapping and the mapping is dense
    pub fn validate_codes<I: IntoIterator<Item = i64>>(&self, codes: I) -> Result<()> {
        if !self.is_dense() {
            return Err(PredictorError::EncodingError(format!(
                "mapping codes are not dense from 0: {:?}",
                self.labels.keys().collect::<Vec<_>>()
            )));
        }
        for code in codes {
            if !self.labels.contains_key(&code) {
                return Err(PredictorError::EncodingError(format!(
                    "code {} has no label (mapping has {} entries)",
                    code,
                    self.len()
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for CategoryMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(c, l)| format!("{}:{}", c, l)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Output of [`CategoryEncoder::encode`]
#[derive(Debug, Clone)]
pub struct EncodedCategories {
    pub frame: DataFrame,
    pub mapping: CategoryMapping,
    /// Codes were generated because the column was absent
    pub synthesized: bool,
}

/// Replaces the category column with dense integer codes
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    column: String,
    random_state: u64,
    policy: MissingColumnPolicy,
    known_mapping: Option<CategoryMapping>,
}

impl CategoryEncoder {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            random_state: 42,
            policy: MissingColumnPolicy::Synthesize,
            known_mapping: None,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Mapping from an earlier run, used to name already-encoded codes
    pub fn with_known_mapping(mut self, mapping: Option<CategoryMapping>) -> Self {
        self.known_mapping = mapping;
        self
    }

    pub fn encode(&self, df: &DataFrame) -> Result<EncodedCategories> {
        let Ok(column) = df.column(&self.column) else {
            return self.synthesize(df);
        };
        let series = column.as_materialized_series();

        let (codes, mapping) = if is_numeric_dtype(series.dtype()) {
            self.encode_numeric(series)?
        } else {
            Self::encode_text(series)?
        };

        mapping.validate_codes(codes.iter().flatten().copied())?;

        let mut frame = df.clone();
        let ca: Int64Chunked = codes.into_iter().collect();
        frame.with_column(ca.with_name(self.column.as_str().into()).into_series())?;

        info!(column = %self.column, categories = mapping.len(), mapping = %mapping, "encoded categories");
        Ok(EncodedCategories {
            frame,
            mapping,
            synthesized: false,
        })
    }

    fn encode_text(series: &Series) -> Result<(Vec<Option<i64>>, CategoryMapping)> {
        let as_text = series.cast(&DataType::String)?;
        let ca = as_text.str()?;

        let mapping = CategoryMapping::from_labels(ca.into_iter().flatten());
        let codes = {
            let index: BTreeMap<&str, i64> = mapping.iter().map(|(c, l)| (l, c)).collect();
            ca.into_iter()
                .map(|v| v.and_then(|s| index.get(s).copied()))
                .collect()
        };

        Ok((codes, mapping))
    }

    /// Numeric labels sort numerically, so a dense `0..N` column maps onto itself
    fn encode_numeric(&self, series: &Series) -> Result<(Vec<Option<i64>>, CategoryMapping)> {
        let casted = series.cast(&DataType::Float64)?;
        let ca = casted.f64()?;
        let values: Vec<Option<f64>> = ca.into_iter().collect();

        let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();

        // Codes from an earlier run keep their values and names
        if let Some(known) = &self.known_mapping {
            let fits_known = known.is_dense()
                && distinct
                    .iter()
                    .all(|v| v.fract() == 0.0 && known.label(*v as i64).is_some());
            if fits_known {
                let codes = values.into_iter().map(|v| v.map(|x| x as i64)).collect();
                return Ok((codes, known.clone()));
            }
        }

        let mapping = CategoryMapping::from_ordered_labels(distinct.iter().map(|v| format_number(*v)));

        let codes = values
            .into_iter()
            .map(|v| {
                v.and_then(|x| {
                    distinct
                        .binary_search_by(|probe| probe.total_cmp(&x))
                        .ok()
                        .map(|i| i as i64)
                })
            })
            .collect();

        Ok((codes, mapping))
    }

    fn synthesize(&self, df: &DataFrame) -> Result<EncodedCategories> {
        if self.policy == MissingColumnPolicy::Reject {
            return Err(PredictorError::SchemaError(format!(
                "category column '{}' is absent",
                self.column
            )));
        }

        let mapping = CategoryMapping::default_tasks();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let codes: Vec<i64> = (0..df.height())
            .map(|_| rng.gen_range(0..mapping.len() as i64))
            .collect();

        warn!(
            column = %self.column,
            rows = df.height(),
            "category column absent, synthesized random codes from the default mapping"
        );

        let mut frame = df.clone();
        frame.with_column(Series::new(self.column.as_str().into(), codes))?;

        Ok(EncodedCategories {
            frame,
            mapping,
            synthesized: true,
        })
    }
}

/// Integral floats print without a fractional part
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
