//! Group-aware missing value imputation

use crate::error::Result;
use super::{columns, ColumnType};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Fills numeric gaps with per-category means and text gaps with the mode.
///
/// The grouping column itself is never imputed: a missing category is a
/// critical-field violation handled by the pipeline, not a gap to paper over.
/// Timestamp and calendar columns are left alone as well; a null timestamp is
/// a valid outcome of best-effort date parsing and the calendar columns are
/// rebuilt from the timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedImputer {
    group_column: String,
    text_placeholder: String,
}

/// What the imputer changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationSummary {
    /// Numeric cells filled
    pub numeric_cells: usize,
    /// Text cells filled
    pub text_cells: usize,
    /// Whether group means were available
    pub grouped: bool,
    /// Columns that received at least one value
    pub columns: Vec<String>,
}

enum FillValue {
    Numeric(Vec<Option<f64>>),
    Text(String),
}

impl GroupedImputer {
    pub fn new(group_column: impl Into<String>, text_placeholder: impl Into<String>) -> Self {
        Self {
            group_column: group_column.into(),
            text_placeholder: text_placeholder.into(),
        }
    }

    /// Return a copy of `df` with nulls filled
    pub fn transform(&self, df: &DataFrame) -> Result<(DataFrame, ImputationSummary)> {
        let groups = self.group_keys(df)?;
        let grouped = groups
            .as_ref()
            .map_or(false, |keys| keys.iter().any(Option::is_some));

        let mut result = df.clone();
        let mut summary = ImputationSummary {
            grouped,
            ..Default::default()
        };

        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == self.group_column
                || columns::TIMESTAMPS.contains(&name)
                || columns::DERIVED.contains(&name)
            {
                continue;
            }

            let series = column.as_materialized_series();
            let null_count = series.null_count();
            if null_count == 0 {
                continue;
            }

            let fill = match ColumnType::of(series.dtype()) {
                ColumnType::Numeric => {
                    let keys = if grouped { groups.as_deref() } else { None };
                    match Self::numeric_fill(series, keys)? {
                        Some(values) => FillValue::Numeric(values),
                        None => {
                            debug!(column = name, "no observed values, leaving numeric column as is");
                            continue;
                        }
                    }
                }
                ColumnType::Text => FillValue::Text(
                    Self::compute_mode_string(series)?
                        .unwrap_or_else(|| self.text_placeholder.clone()),
                ),
                _ => continue,
            };

            let filled = match fill {
                FillValue::Numeric(values) => {
                    summary.numeric_cells += null_count;
                    let ca: Float64Chunked = values.into_iter().collect();
                    ca.with_name(series.name().clone()).into_series()
                }
                FillValue::Text(value) => {
                    summary.text_cells += null_count;
                    let ca = series.str()?;
                    let filled: StringChunked = ca
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(value.as_str()).to_string()))
                        .collect();
                    filled.with_name(series.name().clone()).into_series()
                }
            };

            debug!(column = name, filled = null_count, "imputed column");
            summary.columns.push(name.to_string());
            result.with_column(filled)?;
        }

        Ok((result, summary))
    }

    /// Stringified group key per row, `None` when the group column is absent
    fn group_keys(&self, df: &DataFrame) -> Result<Option<Vec<Option<String>>>> {
        let Ok(column) = df.column(&self.group_column) else {
            return Ok(None);
        };

        let as_text = column.as_materialized_series().cast(&DataType::String)?;
        let keys = as_text
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();

        Ok(Some(keys))
    }

    /// Filled values for a numeric column, or `None` if nothing was observed
    fn numeric_fill(series: &Series, groups: Option<&[Option<String>]>) -> Result<Option<Vec<Option<f64>>>> {
        let casted = series.cast(&DataType::Float64)?;
        let ca = casted.f64()?;

        let Some(global_mean) = ca.mean() else {
            return Ok(None);
        };

        let mut group_stats: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        if let Some(keys) = groups {
            for (key, value) in keys.iter().zip(ca.into_iter()) {
                if let (Some(k), Some(v)) = (key, value) {
                    let entry = group_stats.entry(k.as_str()).or_insert((0.0, 0));
                    entry.0 += v;
                    entry.1 += 1;
                }
            }
        }

        let values = ca
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                Some(value.unwrap_or_else(|| {
                    groups
                        .and_then(|keys| keys[i].as_deref())
                        .and_then(|k| group_stats.get(k))
                        .map(|(sum, count)| sum / *count as f64)
                        .unwrap_or(global_mean)
                }))
            })
            .collect();

        Ok(Some(values))
    }

    /// Most frequent non-null value; ties go to the lexicographically smallest
    fn compute_mode_string(series: &Series) -> Result<Option<String>> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let ca = series.str()?;
        for val in ca.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for (value, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }

        Ok(best.map(|(v, _)| v.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imputer() -> GroupedImputer {
        GroupedImputer::new("TaskType", "Unknown")
    }

    #[test]
    fn test_global_mean_without_category() {
        let df = DataFrame::new(vec![
            Column::new("SleepHours".into(), &[Some(7.0), None, Some(9.0)]),
        ])
        .unwrap();

        let (result, summary) = imputer().transform(&df).unwrap();
        let col = result.column("SleepHours").unwrap().f64().unwrap();
        assert_eq!(col.get(1), Some(8.0));
        assert_eq!(summary.numeric_cells, 1);
        assert!(!summary.grouped);
    }

    #[test]
    fn test_group_mean_with_category() {
        let df = DataFrame::new(vec![
            Column::new("TaskType".into(), &["Work", "Work", "Work", "Sleep", "Sleep"]),
            Column::new("Mood".into(), &[Some(2.0), Some(4.0), None, Some(9.0), Some(9.0)]),
        ])
        .unwrap();

        let (result, summary) = imputer().transform(&df).unwrap();
        let col = result.column("Mood").unwrap().f64().unwrap();
        // Work group mean, not the global mean of 6.0
        assert_eq!(col.get(2), Some(3.0));
        assert!(summary.grouped);
    }

    #[test]
    fn test_singleton_group_falls_back_to_global_mean() {
        let df = DataFrame::new(vec![
            Column::new("TaskType".into(), &["Work", "Work", "Leisure"]),
            Column::new("Mood".into(), &[Some(2.0), Some(4.0), None]),
        ])
        .unwrap();

        let (result, _) = imputer().transform(&df).unwrap();
        let col = result.column("Mood").unwrap().f64().unwrap();
        assert_eq!(col.get(2), Some(3.0));
    }

    #[test]
    fn test_null_category_row_gets_global_mean_and_keeps_null_label() {
        let df = DataFrame::new(vec![
            Column::new("TaskType".into(), &[Some("Work"), Some("Work"), None]),
            Column::new("Mood".into(), &[Some(2.0), Some(4.0), None]),
        ])
        .unwrap();

        let (result, _) = imputer().transform(&df).unwrap();
        assert_eq!(result.column("Mood").unwrap().f64().unwrap().get(2), Some(3.0));
        assert_eq!(result.column("TaskType").unwrap().null_count(), 1);
    }

    #[test]
    fn test_text_mode_and_placeholder() {
        let df = DataFrame::new(vec![
            Column::new("Notes".into(), &[Some("b"), Some("a"), Some("b"), None]),
            Column::new("Empty".into(), &[None::<&str>, None, None, None]),
        ])
        .unwrap();

        let (result, summary) = imputer().transform(&df).unwrap();
        let notes = result.column("Notes").unwrap().str().unwrap();
        assert_eq!(notes.get(3), Some("b"));
        let empty = result.column("Empty").unwrap().str().unwrap();
        assert_eq!(empty.get(0), Some("Unknown"));
        assert_eq!(summary.text_cells, 5);
    }

    #[test]
    fn test_timestamps_untouched() {
        let df = DataFrame::new(vec![
            Column::new("Date".into(), &[Some("2024-05-01"), None]),
        ])
        .unwrap();

        let (result, summary) = imputer().transform(&df).unwrap();
        assert_eq!(result.column("Date").unwrap().null_count(), 1);
        assert!(summary.columns.is_empty());
    }

    #[test]
    fn test_derived_hour_untouched() {
        let df = DataFrame::new(vec![
            Column::new("Hour".into(), &[Some(9i64), None, Some(11)]),
        ])
        .unwrap();

        let (result, _) = imputer().transform(&df).unwrap();
        assert_eq!(result.column("Hour").unwrap().null_count(), 1);
    }

    #[test]
    fn test_input_not_mutated() {
        let df = DataFrame::new(vec![
            Column::new("Mood".into(), &[Some(1.0), None]),
        ])
        .unwrap();

        let _ = imputer().transform(&df).unwrap();
        assert_eq!(df.column("Mood").unwrap().null_count(), 1);
    }
}
