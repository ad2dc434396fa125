//! Synthetic activity logs
//!
//! Generates bootstrap data with the shape of a real productivity log:
//! hourly timestamps, uniformly drawn task labels and ordinal features in
//! their usual ranges. Nothing in the output is correlated, so a model
//! trained on it should score close to chance.

use crate::error::{PredictorError, Result};
use crate::preprocessing::{columns, DEFAULT_TASK_LABELS};
use crate::utils::DataSaver;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use tracing::info;

/// Seeded generator for activity logs
#[derive(Debug, Clone)]
pub struct ActivityLogGenerator {
    n_rows: usize,
    random_state: u64,
    start: NaiveDateTime,
}

impl Default for ActivityLogGenerator {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ActivityLogGenerator {
    pub fn new(n_rows: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            n_rows,
            random_state: 42,
            start,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn generate(&self) -> Result<DataFrame> {
        if self.n_rows == 0 {
            return Err(PredictorError::ConfigError("cannot generate 0 rows".to_string()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let n = self.n_rows;

        let dates: Vec<String> = (0..n)
            .map(|i| {
                (self.start + Duration::hours(i as i64))
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .collect();
        let tasks: Vec<&str> = (0..n)
            .map(|_| DEFAULT_TASK_LABELS[rng.gen_range(0..DEFAULT_TASK_LABELS.len())])
            .collect();

        let mut ordinal = |low: i64, high: i64| -> Vec<i64> { (0..n).map(|_| rng.gen_range(low..=high)).collect() };
        let mood = ordinal(1, 10);
        let sleep = ordinal(5, 10);
        let distractions = ordinal(0, 5);
        let confidence = ordinal(1, 10);
        let completed = ordinal(0, 1);
        let week: Vec<&str> = ordinal(0, 1)
            .into_iter()
            .map(|w| if w == 0 { columns::WEEKDAY } else { columns::WEEKEND })
            .collect();

        let df = DataFrame::new(vec![
            Column::new(columns::DATE.into(), dates),
            Column::new(columns::TASK_TYPE.into(), tasks),
            Column::new(columns::MOOD.into(), mood),
            Column::new(columns::SLEEP_HOURS.into(), sleep),
            Column::new(columns::DISTRACTIONS.into(), distractions),
            Column::new(columns::CONFIDENCE_SCORE.into(), confidence),
            Column::new(columns::COMPLETED.into(), completed),
            Column::new(columns::WEEK_FLAG.into(), week),
        ])?;
        Ok(df)
    }

    /// Generate and write atomically to `path`
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let df = self.generate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        DataSaver::save_csv_atomic(&df, path)?;
        info!(path = %path.display(), rows = df.height(), seed = self.random_state, "wrote synthetic activity log");
        Ok(df)
    }
}
