//! Integration test: serving predictions from saved artifacts

use productivity_predictor::error::PredictorError;
use productivity_predictor::feature_engineering::{FeatureAssembler, FeatureField};
use productivity_predictor::inference::{InferenceConfig, ModelHandle, Predictor};
use productivity_predictor::preprocessing::CategoryMapping;
use productivity_predictor::provenance::FieldSource;
use productivity_predictor::training::{ModelType, Trainer, TrainingConfig, MAPPING_FILE};
use polars::prelude::*;
use serde_json::json;
use std::path::Path;

/// Mood ≤ 5 → Rest (0), above → Work (1)
fn mood_log(n: usize) -> DataFrame {
    let mood: Vec<f64> = (0..n).map(|i| (i % 10 + 1) as f64).collect();
    let task: Vec<i64> = mood.iter().map(|&m| if m <= 5.0 { 0 } else { 1 }).collect();
    df!("TaskType" => &task, "Mood" => &mood).unwrap()
}

fn train_into(dir: &Path) -> String {
    let trainer = Trainer::new(TrainingConfig::new(ModelType::DecisionTree).with_artifact_dir(dir));
    let outcome = trainer
        .fit_frame(&mood_log(60), &CategoryMapping::from_labels(["Rest", "Work"]))
        .unwrap();
    trainer.persist(&outcome).unwrap();
    outcome.run_id
}

#[test]
fn test_predict_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let run_id = train_into(dir.path());

    let predictor = Predictor::load(&InferenceConfig::new(dir.path())).unwrap();
    assert_eq!(predictor.run_id(), run_id);
    assert_eq!(predictor.predict(&json!({"Mood": 9})).unwrap(), 1);
    assert_eq!(predictor.predict(&json!({"Mood": 2})).unwrap(), 0);
    assert_eq!(predictor.predict_label(&json!({"Mood": "8"})).unwrap(), "Work");
}

#[test]
fn test_empty_request_uses_defaults() {
    let assembler = FeatureAssembler::new();
    let vector = assembler.assemble(&json!({})).unwrap();
    assert_eq!(vector.values(), &[5.0, 14.0, 0.0, 7.0, 2.0, 6.0, 1.0, 2.0]);
    assert_eq!(vector.source(FeatureField::Hour), FieldSource::Defaulted);
}

#[test]
fn test_lenient_and_strict_coercion() {
    let record = json!({"Mood": "tired", "Week(day/end)": "Weekend", "Completed": true});

    let lenient = FeatureAssembler::new().assemble(&record).unwrap();
    assert_eq!(lenient.get(FeatureField::Mood), 0.0);
    assert_eq!(lenient.get(FeatureField::WeekFlag), 1.0);
    assert_eq!(lenient.get(FeatureField::Completed), 1.0);

    let err = FeatureAssembler::strict().assemble(&record).unwrap_err();
    assert!(matches!(err, PredictorError::InferenceCoercionError { ref field, .. } if field == "Mood"));
}

#[test]
fn test_missing_model_is_not_fitted() {
    let dir = tempfile::tempdir().unwrap();
    let err = Predictor::load(&InferenceConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, PredictorError::ModelNotFitted));
}

#[test]
fn test_mapping_from_other_run_cannot_decode() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    train_into(first.path());
    train_into(second.path());

    // pair the model of one run with the mapping of another
    std::fs::copy(second.path().join(MAPPING_FILE), first.path().join(MAPPING_FILE)).unwrap();

    let predictor = Predictor::load(&InferenceConfig::new(first.path())).unwrap();
    assert!(predictor.predict(&json!({"Mood": 9})).is_ok());
    let err = predictor.predict_label(&json!({"Mood": 9})).unwrap_err();
    assert!(matches!(err, PredictorError::EncodingError(_)));
}

#[test]
fn test_handle_reload_swaps_after_full_load() {
    let dir = tempfile::tempdir().unwrap();
    let first_run = train_into(dir.path());

    let handle = ModelHandle::load(InferenceConfig::new(dir.path())).unwrap();
    let before = handle.current();
    assert_eq!(before.run_id(), first_run);

    let second_run = train_into(dir.path());
    assert_eq!(handle.reload().unwrap(), second_run);
    assert_eq!(handle.current().run_id(), second_run);
    // snapshots taken earlier keep serving the old model
    assert_eq!(before.run_id(), first_run);
    assert_eq!(handle.predict(&json!({"Mood": 10})).unwrap(), 1);
}

#[test]
fn test_failed_reload_keeps_current_model() {
    let dir = tempfile::tempdir().unwrap();
    let run_id = train_into(dir.path());
    let handle = ModelHandle::load(InferenceConfig::new(dir.path())).unwrap();

    std::fs::write(dir.path().join("model.json"), b"{ not json").unwrap();
    assert!(handle.reload().is_err());
    assert_eq!(handle.current().run_id(), run_id);
}
