//! Data provenance for the cleaning pipeline
//!
//! Records what every stage did to the activity log and where each derived
//! field came from, so invented values are never mistaken for observed ones.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Origin of the values of a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    /// Taken from the input as-is
    #[default]
    Observed,
    /// Absent from the input, a documented default was used
    Defaulted,
    /// Present but not directly numeric, converted
    Coerced,
    /// Absent from the input, filled with random placeholders
    Synthesized,
    /// Some rows observed, the rest filled
    PartiallySynthesized { observed: usize, filled: usize },
    /// Neither present nor derivable
    Absent,
}

impl FieldSource {
    /// Classify a column of `total` rows of which `filled` were invented
    pub fn from_counts(total: usize, filled: usize) -> Self {
        if filled == 0 {
            FieldSource::Observed
        } else if filled >= total {
            FieldSource::Synthesized
        } else {
            FieldSource::PartiallySynthesized {
                observed: total - filled,
                filled,
            }
        }
    }

    /// Any value of the field did not come from the input
    pub fn is_invented(&self) -> bool {
        matches!(
            self,
            FieldSource::Synthesized | FieldSource::PartiallySynthesized { .. }
        )
    }
}

impl std::fmt::Display for FieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldSource::Observed => write!(f, "observed"),
            FieldSource::Defaulted => write!(f, "defaulted"),
            FieldSource::Coerced => write!(f, "coerced"),
            FieldSource::Synthesized => write!(f, "synthesized"),
            FieldSource::PartiallySynthesized { observed, filled } => {
                write!(f, "partially synthesized ({} observed, {} filled)", observed, filled)
            }
            FieldSource::Absent => write!(f, "absent"),
        }
    }
}

/// Record of a single pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationRecord {
    /// Name of the stage (e.g., "impute", "dedupe")
    pub step: String,
    /// Stage-specific details
    pub parameters: serde_json::Value,
    pub applied_at: DateTime<Utc>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub cols_before: usize,
    pub cols_after: usize,
    /// Columns whose values the stage changed
    pub columns_affected: Vec<String>,
    pub duration_ms: u64,
}

impl TransformationRecord {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Captures the frame shape when a stage starts
pub struct StageTimer {
    step: String,
    started: Instant,
    rows_before: usize,
    cols_before: usize,
}

impl StageTimer {
    pub fn start(step: impl Into<String>, df: &DataFrame) -> Self {
        Self {
            step: step.into(),
            started: Instant::now(),
            rows_before: df.height(),
            cols_before: df.width(),
        }
    }

    pub fn rows_before(&self) -> usize {
        self.rows_before
    }

    pub fn finish(
        self,
        df: &DataFrame,
        columns_affected: Vec<String>,
        parameters: serde_json::Value,
    ) -> TransformationRecord {
        TransformationRecord {
            step: self.step,
            parameters,
            applied_at: Utc::now(),
            rows_before: self.rows_before,
            rows_after: df.height(),
            cols_before: self.cols_before,
            cols_after: df.width(),
            columns_affected,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Schema information for a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Data type (e.g., "f64", "str", "i64")
    pub dtype: String,
    pub null_count: usize,
}

/// Column layout of a frame at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub columns: Vec<ColumnSchema>,
    pub rows: usize,
    pub captured_at: DateTime<Utc>,
}

impl SchemaSnapshot {
    pub fn capture(df: &DataFrame) -> Self {
        Self {
            columns: df
                .get_columns()
                .iter()
                .map(|c| ColumnSchema {
                    name: c.name().to_string(),
                    dtype: c.dtype().to_string(),
                    null_count: c.null_count(),
                })
                .collect(),
            rows: df.height(),
            captured_at: Utc::now(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Everything one cleaning run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// File the log was loaded from
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub initial_schema: Option<SchemaSnapshot>,
    pub final_schema: Option<SchemaSnapshot>,
    pub stages: Vec<TransformationRecord>,
    /// Origin of the category and calendar fields
    pub fields: BTreeMap<String, FieldSource>,
    pub imputed_cells: usize,
    pub unparseable_timestamps: usize,
    pub duplicates_dropped: usize,
    pub critical_rows_dropped: usize,
    /// Whether the result was written back to `source`
    pub persisted: bool,
}

impl CleaningReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            started_at: Utc::now(),
            initial_schema: None,
            final_schema: None,
            stages: Vec::new(),
            fields: BTreeMap::new(),
            imputed_cells: 0,
            unparseable_timestamps: 0,
            duplicates_dropped: 0,
            critical_rows_dropped: 0,
            persisted: false,
        }
    }

    pub fn record_stage(&mut self, record: TransformationRecord) {
        self.stages.push(record);
    }

    pub fn set_field(&mut self, name: impl Into<String>, source: FieldSource) {
        self.fields.insert(name.into(), source);
    }

    pub fn field(&self, name: &str) -> Option<FieldSource> {
        self.fields.get(name).copied()
    }

    /// Fields with at least one invented value
    pub fn synthesized_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, s)| s.is_invented())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn stage(&self, step: &str) -> Option<&TransformationRecord> {
        self.stages.iter().find(|s| s.step == step)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.stages.iter().map(|s| s.duration_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_source_from_counts() {
        assert_eq!(FieldSource::from_counts(10, 0), FieldSource::Observed);
        assert_eq!(FieldSource::from_counts(10, 10), FieldSource::Synthesized);
        assert_eq!(
            FieldSource::from_counts(10, 3),
            FieldSource::PartiallySynthesized { observed: 7, filled: 3 }
        );
        assert_eq!(FieldSource::from_counts(0, 0), FieldSource::Observed);
    }

    #[test]
    fn test_field_source_serializes_tagged() {
        let json = serde_json::to_string(&FieldSource::PartiallySynthesized { observed: 2, filled: 1 }).unwrap();
        assert_eq!(json, r#"{"kind":"partially_synthesized","observed":2,"filled":1}"#);
        let back: FieldSource = serde_json::from_str(r#"{"kind":"synthesized"}"#).unwrap();
        assert_eq!(back, FieldSource::Synthesized);
    }

    #[test]
    fn test_stage_timer_records_shape() {
        let before = df!("a" => &[1, 2, 3]).unwrap();
        let timer = StageTimer::start("dedupe", &before);
        let after = df!("a" => &[1, 2], "b" => &[0, 0]).unwrap();

        let record = timer.finish(&after, vec!["a".to_string()], serde_json::json!({"dropped": 1}));
        assert_eq!(record.step, "dedupe");
        assert_eq!(record.rows_before, 3);
        assert_eq!(record.rows_after, 2);
        assert_eq!(record.cols_after, 2);
        assert_eq!(record.rows_removed(), 1);
    }

    #[test]
    fn test_report_tracks_synthesized_fields() {
        let mut report = CleaningReport::new("log.csv");
        report.set_field("TaskType", FieldSource::Observed);
        report.set_field("DayOfWeek", FieldSource::Synthesized);
        report.set_field("Hour", FieldSource::Absent);

        assert_eq!(report.synthesized_fields(), vec!["DayOfWeek"]);
        assert_eq!(report.field("TaskType"), Some(FieldSource::Observed));
        assert_eq!(report.field("Mood"), None);
    }

    #[test]
    fn test_schema_snapshot_capture() {
        let df = DataFrame::new(vec![
            Column::new("Mood".into(), &[Some(1.0), None]),
        ])
        .unwrap();

        let snapshot = SchemaSnapshot::capture(&df);
        assert_eq!(snapshot.rows, 2);
        assert_eq!(snapshot.column_names(), vec!["Mood"]);
        assert_eq!(snapshot.columns[0].null_count, 1);
    }
}
