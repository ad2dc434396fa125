//! Training matrix construction over a cleaned activity log

use crate::error::Result;
use crate::preprocessing::is_numeric_dtype;
use crate::provenance::FieldSource;
use super::schema::{week_flag_code, FeatureField, N_FEATURES};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// The 8 feature columns of a cleaned log, as numbers
#[derive(Debug, Clone)]
pub struct TrainingMatrix {
    pub features: Array2<f64>,
    pub sources: BTreeMap<FeatureField, FieldSource>,
}

impl TrainingMatrix {
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Fields with at least one invented value
    pub fn synthesized(&self) -> Vec<FeatureField> {
        self.sources
            .iter()
            .filter(|(_, s)| s.is_invented())
            .map(|(f, _)| *f)
            .collect()
    }
}

/// Guarantees every feature column, filling gaps the cleaning stage could not
#[derive(Debug, Clone)]
pub struct TrainingFeatureBuilder {
    random_state: u64,
}

impl Default for TrainingFeatureBuilder {
    fn default() -> Self {
        Self::new(42)
    }
}

impl TrainingFeatureBuilder {
    pub fn new(random_state: u64) -> Self {
        Self { random_state }
    }

    pub fn build(&self, df: &DataFrame) -> Result<TrainingMatrix> {
        let n = df.height();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut features = Array2::<f64>::zeros((n, N_FEATURES));
        let mut sources = BTreeMap::new();

        for field in FeatureField::ALL {
            let (values, source) = match df.column(field.name()) {
                Ok(column) => Self::read_column(field, column.as_materialized_series())?,
                Err(_) => Self::fill_absent(field, n, &mut rng),
            };

            if source.is_invented() {
                warn!(field = field.name(), source = %source, "training feature not fully observed");
            }
            features.column_mut(field.index()).assign(&Array1::from(values));
            sources.insert(field, source);
        }

        info!(rows = n, features = N_FEATURES, "assembled training matrix");
        Ok(TrainingMatrix { features, sources })
    }

    fn read_column(field: FeatureField, series: &Series) -> Result<(Vec<f64>, FieldSource)> {
        let numeric = is_numeric_dtype(series.dtype());

        let values: Vec<Option<f64>> = if field == FeatureField::WeekFlag && !numeric {
            let as_text = series.cast(&DataType::String)?;
            as_text
                .str()?
                .into_iter()
                .map(|v| Some(v.and_then(week_flag_code).unwrap_or(0.0)))
                .collect()
        } else {
            // non-numeric text casts to null
            let casted = series.cast(&DataType::Float64)?;
            casted.f64()?.into_iter().collect()
        };

        let missing = values.iter().filter(|v| v.is_none()).count();
        let fallback = match field {
            FeatureField::Hour => field.default_value(),
            _ => 0.0,
        };
        let filled = values.into_iter().map(|v| v.unwrap_or(fallback)).collect();

        let source = if missing > 0 {
            FieldSource::from_counts(series.len(), missing)
        } else if numeric {
            FieldSource::Observed
        } else {
            FieldSource::Coerced
        };
        Ok((filled, source))
    }

    fn fill_absent(field: FeatureField, n: usize, rng: &mut ChaCha8Rng) -> (Vec<f64>, FieldSource) {
        match field.placeholder_range() {
            Some(range) => (
                (0..n).map(|_| rng.gen_range(range.clone()) as f64).collect(),
                FieldSource::Synthesized,
            ),
            None => (vec![field.default_value(); n], FieldSource::Defaulted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_log_is_observed() {
        let df = df!(
            "Mood" => &[5i64, 7],
            "Hour" => &[9i64, 20],
            "Week(day/end)" => &["Weekday", "Weekend"],
            "SleepHours" => &[7.5, 6.0],
            "Distractions" => &[1i64, 3],
            "ConfidenceScore" => &[8i64, 4],
            "Completed" => &[1i64, 0],
            "DayOfWeek" => &[2i64, 6],
        )
        .unwrap();

        let matrix = TrainingFeatureBuilder::default().build(&df).unwrap();
        assert_eq!(matrix.features.row(0).to_vec(), vec![5.0, 9.0, 0.0, 7.5, 1.0, 8.0, 1.0, 2.0]);
        assert_eq!(matrix.features.row(1).to_vec(), vec![7.0, 20.0, 1.0, 6.0, 3.0, 4.0, 0.0, 6.0]);
        assert_eq!(matrix.sources[&FeatureField::Mood], FieldSource::Observed);
        assert_eq!(matrix.sources[&FeatureField::WeekFlag], FieldSource::Coerced);
        assert!(matrix.synthesized().is_empty());
    }

    #[test]
    fn test_absent_columns_use_placeholder_ranges() {
        let df = df!("TaskType" => &[0i64; 50]).unwrap();

        let matrix = TrainingFeatureBuilder::new(7).build(&df).unwrap();
        for row in matrix.features.rows() {
            assert!((1.0..=10.0).contains(&row[FeatureField::Mood.index()]));
            assert_eq!(row[FeatureField::Hour.index()], 14.0);
            assert_eq!(row[FeatureField::WeekFlag.index()], 0.0);
            assert!((5.0..=10.0).contains(&row[FeatureField::SleepHours.index()]));
            assert!((0.0..=5.0).contains(&row[FeatureField::Distractions.index()]));
            assert!((1.0..=10.0).contains(&row[FeatureField::ConfidenceScore.index()]));
            assert!((0.0..=1.0).contains(&row[FeatureField::Completed.index()]));
            assert!((0.0..=6.0).contains(&row[FeatureField::DayOfWeek.index()]));
        }
        assert_eq!(matrix.sources[&FeatureField::Hour], FieldSource::Defaulted);
        assert_eq!(matrix.sources[&FeatureField::Mood], FieldSource::Synthesized);
    }

    #[test]
    fn test_placeholders_are_seeded() {
        let df = df!("TaskType" => &[0i64; 20]).unwrap();
        let a = TrainingFeatureBuilder::new(3).build(&df).unwrap();
        let b = TrainingFeatureBuilder::new(3).build(&df).unwrap();
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn test_null_hour_defaults_and_bad_text_is_zero() {
        let df = DataFrame::new(vec![
            Column::new("Hour".into(), &[Some(8i64), None]),
            Column::new("Mood".into(), &["6", "happy"]),
            Column::new("Week(day/end)".into(), &["Weekend", "Holiday"]),
        ])
        .unwrap();

        let matrix = TrainingFeatureBuilder::default().build(&df).unwrap();
        let hour = matrix.features.column(FeatureField::Hour.index()).to_vec();
        assert_eq!(hour, vec![8.0, 14.0]);
        let mood = matrix.features.column(FeatureField::Mood.index()).to_vec();
        assert_eq!(mood, vec![6.0, 0.0]);
        let flag = matrix.features.column(FeatureField::WeekFlag.index()).to_vec();
        assert_eq!(flag, vec![1.0, 0.0]);
    }
}
