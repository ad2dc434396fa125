//! Integration test: Full pipeline (sample → clean → train → predict)

use clap::Parser;
use productivity_predictor::cli::{run, Cli};
use productivity_predictor::config::AppConfig;
use productivity_predictor::inference::{InferenceConfig, Predictor};
use productivity_predictor::preprocessing::{CleaningConfig, CleaningPipeline, DEFAULT_TASK_LABELS};
use productivity_predictor::synthetic::ActivityLogGenerator;
use productivity_predictor::training::{ModelType, Trainer, TrainingConfig};
use serde_json::json;
use std::fs;

#[test]
fn test_library_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("productivity_log.csv");
    let model_dir = dir.path().join("model");

    ActivityLogGenerator::new(240).with_random_state(7).write_csv(&log).unwrap();

    let dataset = CleaningPipeline::new(CleaningConfig::default()).run(&log).unwrap();
    assert_eq!(dataset.frame.height(), 240);
    assert!(dataset.report.synthesized_fields().is_empty());

    let outcome = Trainer::new(
        TrainingConfig::new(ModelType::RandomForest)
            .with_n_estimators(8)
            .with_artifact_dir(&model_dir),
    )
    .train(&dataset)
    .unwrap();

    let predictor = Predictor::load(&InferenceConfig::new(&model_dir)).unwrap();
    assert_eq!(predictor.run_id(), outcome.run_id);

    let prediction = predictor
        .predict_detailed(&json!({"Mood": 7, "Hour": 9, "Week(day/end)": "Weekday"}), true)
        .unwrap();
    let label = prediction.label.unwrap();
    assert!(DEFAULT_TASK_LABELS.contains(&label.as_str()));
    assert_eq!(outcome.mapping.code(&label), Some(prediction.code));

    // an empty request is still answered
    assert!(predictor.predict(&json!({})).is_ok());
}

#[test]
fn test_seeded_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.csv");
    ActivityLogGenerator::new(180).write_csv(&log).unwrap();

    let dataset = CleaningPipeline::new(CleaningConfig::default()).run(&log).unwrap();
    let config = TrainingConfig::default().with_n_estimators(12);

    let a = Trainer::new(config.clone()).fit(&dataset).unwrap();
    let b = Trainer::new(config).fit(&dataset).unwrap();
    assert_eq!(a.report.accuracy, b.report.accuracy);
    assert_eq!(a.report.confusion_matrix, b.report.confusion_matrix);
}

#[test]
fn test_cli_commands_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.csv");
    let model_dir = dir.path().join("model");
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"training": {"n_estimators": 5}}"#).unwrap();

    let log_arg = log.to_str().unwrap();
    let model_arg = model_dir.to_str().unwrap();
    let config_arg = config_path.to_str().unwrap();

    let invocations: Vec<Vec<&str>> = vec![
        vec!["productivity", "sample", "--output", log_arg, "--rows", "120"],
        vec!["productivity", "info", "--data", log_arg],
        vec!["productivity", "clean", "--data", log_arg],
        vec!["productivity", "--config", config_arg, "train", "--data", log_arg, "--model-dir", model_arg],
        vec!["productivity", "predict", "--model-dir", model_arg, "--input", r#"{"Mood": 4}"#, "--decode"],
    ];
    for args in invocations {
        run(Cli::try_parse_from(&args).unwrap()).unwrap();
    }

    assert!(model_dir.join("model.json").exists());
    assert!(model_dir.join("task_mapping.json").exists());
}

#[test]
fn test_cli_predict_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let model_arg = dir.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["productivity", "predict", "--model-dir", model_arg, "--input", "{}"]).unwrap();
    assert!(run(cli).is_err());
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut config = AppConfig::default();
    config.training.n_estimators = 33;
    config.inference.strict = true;
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = AppConfig::from_file(&path).unwrap();
    assert_eq!(loaded.training.n_estimators, 33);
    assert!(loaded.inference.strict);
}
