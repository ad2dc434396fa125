//! Integration test: Training pipeline end-to-end

use productivity_predictor::error::PredictorError;
use productivity_predictor::feature_engineering::FeatureField;
use productivity_predictor::preprocessing::{CategoryMapping, CleaningConfig, CleaningPipeline};
use productivity_predictor::provenance::FieldSource;
use productivity_predictor::synthetic::ActivityLogGenerator;
use productivity_predictor::training::{
    ArtifactStore, Classifier, ModelType, Trainer, TrainingConfig,
};
use polars::prelude::*;

/// TaskType follows Mood: low mood → Sleep, mid → Study, high → Work
fn separable_log(n: usize) -> DataFrame {
    let mood: Vec<f64> = (0..n).map(|i| (i % 9 + 1) as f64).collect();
    let task: Vec<i64> = mood.iter().map(|&m| if m <= 3.0 { 0 } else if m <= 6.0 { 1 } else { 2 }).collect();
    let hour: Vec<i64> = (0..n).map(|i| (i % 24) as i64).collect();
    let dow: Vec<i64> = (0..n).map(|i| (i % 7) as i64).collect();
    let flag: Vec<&str> = dow.iter().map(|&d| if d < 5 { "Weekday" } else { "Weekend" }).collect();
    let sleep: Vec<f64> = (0..n).map(|i| (5 + i % 5) as f64).collect();

    df!(
        "TaskType" => &task,
        "Mood" => &mood,
        "Hour" => &hour,
        "Week(day/end)" => &flag,
        "SleepHours" => &sleep,
        "Distractions" => &vec![1i64; n],
        "ConfidenceScore" => &vec![6i64; n],
        "Completed" => &vec![1i64; n],
        "DayOfWeek" => &dow,
    )
    .unwrap()
}

fn mapping() -> CategoryMapping {
    CategoryMapping::from_labels(["Sleep", "Study", "Work"])
}

#[test]
fn test_decision_tree_learns_separable_log() {
    let trainer = Trainer::new(TrainingConfig::new(ModelType::DecisionTree));
    let outcome = trainer.fit_frame(&separable_log(90), &mapping()).unwrap();

    assert_eq!(outcome.report.accuracy, 1.0);
    assert_eq!(outcome.n_train + outcome.n_test, 90);
    assert_eq!(outcome.report.class(2).unwrap().label.as_deref(), Some("Work"));
    assert!(outcome.artifacts.is_none());
}

#[test]
fn test_random_forest_learns_separable_log() {
    let config = TrainingConfig::default().with_n_estimators(25);
    let outcome = Trainer::new(config).fit_frame(&separable_log(90), &mapping()).unwrap();

    assert!(outcome.report.accuracy >= 0.9, "accuracy {}", outcome.report.accuracy);
    let ranked = outcome.ranked_importances();
    assert_eq!(ranked[0].0, "Mood");
}

#[test]
fn test_training_is_deterministic() {
    let df = separable_log(120);
    let config = TrainingConfig::default().with_n_estimators(15).with_random_state(9);

    let a = Trainer::new(config.clone()).fit_frame(&df, &mapping()).unwrap();
    let b = Trainer::new(config).fit_frame(&df, &mapping()).unwrap();

    assert_eq!(a.report, b.report);
    let x = ndarray::Array2::from_shape_fn((9, 8), |(i, j)| if j == 0 { (i + 1) as f64 } else { 1.0 });
    assert_eq!(a.model.predict(&x).unwrap(), b.model.predict(&x).unwrap());
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn test_split_is_stratified() {
    let outcome = Trainer::new(TrainingConfig::new(ModelType::DecisionTree))
        .fit_frame(&separable_log(90), &mapping())
        .unwrap();

    // 30 rows per class, round(0.2 * 30) = 6 held out each
    assert_eq!(outcome.n_test, 18);
    for class in 0..3 {
        assert_eq!(outcome.report.class(class).unwrap().support, 6);
    }
}

#[test]
fn test_train_persists_artifacts_with_one_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrainingConfig::new(ModelType::DecisionTree).with_artifact_dir(dir.path().join("model"));
    let trainer = Trainer::new(config);

    let mut outcome = trainer.fit_frame(&separable_log(60), &mapping()).unwrap();
    let paths = trainer.persist(&outcome).unwrap();
    outcome.artifacts = Some(paths.clone());

    assert!(paths.model.exists());
    assert!(paths.mapping.exists());

    let store = ArtifactStore::new(dir.path().join("model"));
    let model = store.load_model().unwrap();
    let mapping = store.load_mapping().unwrap().unwrap();
    assert_eq!(model.run_id, outcome.run_id);
    assert_eq!(mapping.run_id, outcome.run_id);
    assert_eq!(mapping.mapping.label(0), Some("Sleep"));
    assert!(outcome.generate_report().contains(&outcome.run_id));
}

#[test]
fn test_failed_persist_keeps_previous_model() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("model");
    let trainer = Trainer::new(TrainingConfig::new(ModelType::DecisionTree).with_artifact_dir(&model_dir));

    let first = trainer.fit_frame(&separable_log(60), &mapping()).unwrap();
    let paths = trainer.persist(&first).unwrap();

    // the mapping file is replaced by a directory that cannot be overwritten
    std::fs::remove_file(&paths.mapping).unwrap();
    std::fs::create_dir_all(paths.mapping.join("blocked")).unwrap();

    let second = trainer.fit_frame(&separable_log(60), &mapping()).unwrap();
    assert!(trainer.persist(&second).is_err());

    let model = ArtifactStore::new(&model_dir).load_model().unwrap();
    assert_eq!(model.run_id, first.run_id);
}

#[test]
fn test_single_sample_class_fails() {
    let mut df = separable_log(30);
    let tasks: Vec<i64> = (0..30).map(|i| if i == 0 { 2 } else { i as i64 % 2 }).collect();
    df.with_column(Series::new("TaskType".into(), tasks)).unwrap();

    let err = Trainer::default().fit_frame(&df, &mapping()).unwrap_err();
    assert!(matches!(err, PredictorError::TrainingError(_)));
}

#[test]
fn test_absent_features_are_flagged() {
    let df = df!(
        "TaskType" => &[0i64, 0, 0, 0, 1, 1, 1, 1],
        "Mood" => &[1.0, 2.0, 1.0, 2.0, 8.0, 9.0, 8.0, 9.0],
    )
    .unwrap();
    let outcome = Trainer::new(TrainingConfig::new(ModelType::DecisionTree))
        .fit_frame(&df, &CategoryMapping::from_labels(["a", "b"]))
        .unwrap();

    assert_eq!(outcome.feature_sources[&FeatureField::Mood], FieldSource::Observed);
    assert!(outcome.feature_sources[&FeatureField::SleepHours].is_invented());
    assert!(outcome.generate_report().contains("Placeholder Features"));
}

#[test]
fn test_cleaned_synthetic_log_trains() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    ActivityLogGenerator::new(300).write_csv(&path).unwrap();

    let dataset = CleaningPipeline::new(CleaningConfig::default()).run(&path).unwrap();
    let config = TrainingConfig::default()
        .with_n_estimators(10)
        .with_artifact_dir(dir.path().join("model"));
    let outcome = Trainer::new(config).train(&dataset).unwrap();

    assert_eq!(outcome.mapping.len(), 6);
    assert!(outcome.report.accuracy >= 0.0 && outcome.report.accuracy <= 1.0);
    assert!(outcome.artifacts.is_some());
    assert!(outcome.model.is_fitted());
}
