//! The ordered cleaning pipeline

use crate::error::{PredictorError, Result};
use crate::provenance::{CleaningReport, FieldSource, SchemaSnapshot, StageTimer};
use crate::utils::{lock_path_for, with_exclusive_lock, write_atomic_all, DataLoader, DataSaver};
use super::{
    columns, CategoryEncoder, CategoryMapping, CleaningConfig, GroupedImputer,
    TimeFeatureExtractor,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

/// A cleaned activity log and the label table its codes refer to
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub frame: DataFrame,
    pub mapping: CategoryMapping,
    pub report: CleaningReport,
}

/// load → parse timestamps → impute → encode → dedupe → time features →
/// trim text → drop null labels → persist
#[derive(Debug, Clone, Default)]
pub struct CleaningPipeline {
    config: CleaningConfig,
    loader: DataLoader,
}

impl CleaningPipeline {
    pub fn new(config: CleaningConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
        }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean the log at `path` and, unless disabled, write it back in place.
    ///
    /// The file and its mapping sidecar are only touched after every stage
    /// has succeeded, and are replaced together or not at all.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<CleanedDataset> {
        let path = path.as_ref();
        let source = path.display().to_string();

        let df = self.loader.load_csv(path)?;
        let known_mapping = load_mapping_sidecar(path)?;

        let mut cleaned = self.clean_frame(&df, &source, known_mapping)?;

        if self.config.persist {
            let csv = DataSaver::to_csv_bytes(&cleaned.frame)?;
            let sidecar = serde_json::to_vec_pretty(&MappingSidecar::new(&csv, cleaned.mapping.clone()))?;
            let sidecar_path = mapping_sidecar_path(path);

            with_exclusive_lock(&lock_path_for(path), || {
                write_atomic_all(&[(path, csv.as_slice()), (sidecar_path.as_path(), sidecar.as_slice())])
            })?;

            cleaned.report.persisted = true;
            info!(path = %path.display(), rows = cleaned.frame.height(), "persisted cleaned log");
        }

        Ok(cleaned)
    }

    /// Run every stage on an in-memory frame; `df` is not modified
    pub fn clean_frame(
        &self,
        df: &DataFrame,
        source: &str,
        known_mapping: Option<CategoryMapping>,
    ) -> Result<CleanedDataset> {
        let config = &self.config;
        let mut report = CleaningReport::new(source);
        report.initial_schema = Some(SchemaSnapshot::capture(df));
        info!(source, rows = df.height(), cols = df.width(), "cleaning started");

        let extractor = TimeFeatureExtractor::new(config.random_state, config.missing_columns);

        // Timestamps
        let timer = StageTimer::start("parse_timestamps", df);
        let (frame, unparseable) = extractor.normalize_timestamps(df)?;
        report.unparseable_timestamps = unparseable;
        let present: Vec<String> = columns::TIMESTAMPS
            .iter()
            .filter(|c| frame.column(c).is_ok())
            .map(|c| c.to_string())
            .collect();
        report.record_stage(timer.finish(&frame, present, json!({ "unparseable": unparseable })));

        // Imputation
        let timer = StageTimer::start("impute", &frame);
        let imputer = GroupedImputer::new(&config.category_column, &config.text_placeholder);
        let (frame, imputed) = imputer.transform(&frame)?;
        report.imputed_cells = imputed.numeric_cells + imputed.text_cells;
        info!(
            numeric = imputed.numeric_cells,
            text = imputed.text_cells,
            grouped = imputed.grouped,
            "imputed missing values"
        );
        report.record_stage(timer.finish(
            &frame,
            imputed.columns.clone(),
            json!({ "numeric_cells": imputed.numeric_cells, "text_cells": imputed.text_cells, "grouped": imputed.grouped }),
        ));

        // Encoding
        let timer = StageTimer::start("encode", &frame);
        let encoded = CategoryEncoder::new(&config.category_column)
            .with_random_state(config.random_state)
            .with_policy(config.missing_columns)
            .with_known_mapping(known_mapping)
            .encode(&frame)?;
        let (frame, mapping) = (encoded.frame, encoded.mapping);
        report.set_field(
            config.category_column.as_str(),
            if encoded.synthesized { FieldSource::Synthesized } else { FieldSource::Observed },
        );
        report.record_stage(timer.finish(
            &frame,
            vec![config.category_column.clone()],
            json!({ "categories": mapping.len(), "synthesized": encoded.synthesized }),
        ));

        // Duplicates
        let timer = StageTimer::start("dedupe", &frame);
        let frame = drop_duplicate_rows(&frame)?;
        report.duplicates_dropped = timer_rows_removed(&timer, &frame);
        info!(dropped = report.duplicates_dropped, rows = frame.height(), "dropped duplicate rows");
        report.record_stage(timer.finish(&frame, vec![], json!({ "dropped": report.duplicates_dropped })));

        // Calendar features
        let timer = StageTimer::start("time_features", &frame);
        let (frame, time_summary) = extractor.extract(&frame)?;
        report.set_field(columns::DAY_OF_WEEK, time_summary.day_of_week);
        report.set_field(columns::WEEK_FLAG, time_summary.week_flag);
        report.set_field(columns::HOUR, time_summary.hour);
        report.record_stage(timer.finish(
            &frame,
            columns::DERIVED.iter().map(|c| c.to_string()).collect(),
            serde_json::to_value(&time_summary)?,
        ));

        // Whitespace
        let timer = StageTimer::start("trim_text", &frame);
        let (frame, trimmed) = trim_text_columns(&frame)?;
        report.record_stage(timer.finish(&frame, trimmed, json!({})));

        // Critical rows
        let timer = StageTimer::start("drop_critical", &frame);
        let frame = drop_null_labels(&frame, &config.category_column)?;
        report.critical_rows_dropped = timer_rows_removed(&timer, &frame);
        if report.critical_rows_dropped > 0 {
            warn!(dropped = report.critical_rows_dropped, "dropped rows without a task category");
        }
        report.record_stage(timer.finish(
            &frame,
            vec![],
            json!({ "column": config.category_column, "dropped": report.critical_rows_dropped }),
        ));

        for name in report.synthesized_fields() {
            warn!(field = name, source = %report.fields[name], "field contains placeholder values");
        }
        report.final_schema = Some(SchemaSnapshot::capture(&frame));
        info!(
            rows = frame.height(),
            cols = frame.width(),
            mapping = %mapping,
            elapsed_ms = report.total_duration_ms(),
            "cleaning finished"
        );

        Ok(CleanedDataset { frame, mapping, report })
    }
}

/// Label table persisted next to a cleaned log, tied to the exact bytes
/// of the log it was written with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSidecar {
    /// xxh3 of the log file, hex
    pub log_digest: String,
    pub mapping: CategoryMapping,
}

impl MappingSidecar {
    pub fn new(log: &[u8], mapping: CategoryMapping) -> Self {
        Self {
            log_digest: log_digest(log),
            mapping,
        }
    }

    /// Whether `log` is the file this sidecar was written with
    pub fn describes(&self, log: &[u8]) -> bool {
        self.log_digest == log_digest(log)
    }
}

fn log_digest(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}

/// `<dir>/<stem>.mapping.json` next to the log
pub fn mapping_sidecar_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.mapping.json", stem))
}

/// The sidecar mapping, if one exists and was written for the current log
fn load_mapping_sidecar(path: &Path) -> Result<Option<CategoryMapping>> {
    let sidecar_path = mapping_sidecar_path(path);
    if !sidecar_path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&sidecar_path)?;
    let sidecar: MappingSidecar = serde_json::from_str(&content).map_err(|e| {
        PredictorError::SerializationError(format!("{}: {}", sidecar_path.display(), e))
    })?;

    if !sidecar.describes(&std::fs::read(path)?) {
        warn!(
            sidecar = %sidecar_path.display(),
            "log changed since its mapping was written, ignoring the stored mapping"
        );
        return Ok(None);
    }
    Ok(Some(sidecar.mapping))
}

fn timer_rows_removed(timer: &StageTimer, frame: &DataFrame) -> usize {
    timer.rows_before().saturating_sub(frame.height())
}

/// Drop rows identical to an earlier row, keeping the first occurrence
fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    let as_text: Vec<Series> = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series().cast(&DataType::String))
        .collect::<PolarsResult<_>>()?;
    let cells: Vec<&StringChunked> = as_text
        .iter()
        .map(|s| s.str())
        .collect::<PolarsResult<_>>()?;

    let mut seen = HashSet::with_capacity(df.height());
    let mask: BooleanChunked = (0..df.height())
        .map(|row| {
            let key: Vec<Option<&str>> = cells.iter().map(|ca| ca.get(row)).collect();
            Some(seen.insert(key))
        })
        .collect();

    Ok(df.filter(&mask)?)
}

/// Trim surrounding whitespace in every text column
fn trim_text_columns(df: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
    let mut result = df.clone();
    let mut changed = Vec::new();

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        if !matches!(series.dtype(), DataType::String) {
            continue;
        }
        let ca = series.str()?;
        let needs_trim = ca
            .into_iter()
            .flatten()
            .any(|v| v.len() != v.trim().len());
        if !needs_trim {
            continue;
        }

        let trimmed: StringChunked = ca.into_iter().map(|v| v.map(str::trim)).collect();
        result.with_column(trimmed.with_name(series.name().clone()).into_series())?;
        changed.push(series.name().to_string());
    }

    Ok((result, changed))
}

fn drop_null_labels(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let mask = df.column(column)?.as_materialized_series().is_not_null();
    Ok(df.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> CleaningPipeline {
        CleaningPipeline::new(CleaningConfig::default().without_persist())
    }

    #[test]
    fn test_drop_duplicate_rows_keeps_first() {
        let df = df!(
            "a" => &[1i64, 2, 1, 3],
            "b" => &["x", "y", "x", "x"],
        )
        .unwrap();

        let result = drop_duplicate_rows(&df).unwrap();
        let a: Vec<Option<i64>> = result.column("a").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_nulls_compare_equal_in_dedupe() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[None::<i64>, None]),
        ])
        .unwrap();
        assert_eq!(drop_duplicate_rows(&df).unwrap().height(), 1);
    }

    #[test]
    fn test_trim_text_columns() {
        let df = df!("Notes" => &["  a ", "b"], "Mood" => &[1i64, 2]).unwrap();

        let (result, changed) = trim_text_columns(&df).unwrap();
        assert_eq!(result.column("Notes").unwrap().str().unwrap().get(0), Some("a"));
        assert_eq!(changed, vec!["Notes".to_string()]);
    }

    #[test]
    fn test_clean_frame_drops_null_labels() {
        let df = DataFrame::new(vec![
            Column::new("TaskType".into(), &[Some("Work"), None, Some("Sleep")]),
            Column::new("Mood".into(), &[Some(4.0), Some(5.0), Some(6.0)]),
            Column::new("Date".into(), &["2024-05-01 10:00:00", "2024-05-02 11:00:00", "2024-05-04 12:00:00"]),
        ])
        .unwrap();

        let cleaned = pipeline().clean_frame(&df, "memory", None).unwrap();
        assert_eq!(cleaned.frame.height(), 2);
        assert_eq!(cleaned.report.critical_rows_dropped, 1);
        assert_eq!(cleaned.frame.column("TaskType").unwrap().null_count(), 0);
        assert_eq!(cleaned.mapping, CategoryMapping::from_ordered_labels(["Sleep", "Work"]));
    }

    #[test]
    fn test_clean_frame_records_every_stage() {
        let df = df!(
            "TaskType" => &["Work", "Work"],
            "Mood" => &[4.0, 4.0],
        )
        .unwrap();

        let cleaned = pipeline().clean_frame(&df, "memory", None).unwrap();
        let steps: Vec<&str> = cleaned.report.stages.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(
            steps,
            vec!["parse_timestamps", "impute", "encode", "dedupe", "time_features", "trim_text", "drop_critical"]
        );
        assert_eq!(cleaned.report.duplicates_dropped, 1);
        assert_eq!(cleaned.report.field("DayOfWeek"), Some(FieldSource::Synthesized));
        assert_eq!(cleaned.report.field("TaskType"), Some(FieldSource::Observed));
    }

    #[test]
    fn test_sidecar_describes_only_its_log() {
        let sidecar = MappingSidecar::new(b"TaskType\n0\n", CategoryMapping::from_labels(["Work"]));
        assert!(sidecar.describes(b"TaskType\n0\n"));
        assert!(!sidecar.describes(b"TaskType\n1\n"));
    }

    #[test]
    fn test_mapping_sidecar_path() {
        assert_eq!(
            mapping_sidecar_path(Path::new("data/productivity_log.csv")),
            PathBuf::from("data/productivity_log.mapping.json")
        );
    }
}
