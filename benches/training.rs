use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use productivity_predictor::feature_engineering::FeatureAssembler;
use productivity_predictor::inference::Predictor;
use productivity_predictor::preprocessing::{CleanedDataset, CleaningConfig, CleaningPipeline};
use productivity_predictor::synthetic::ActivityLogGenerator;
use productivity_predictor::training::{MappingArtifact, ModelArtifact, ModelType, Trainer, TrainingConfig};
use serde_json::json;

fn cleaned_log(n_rows: usize) -> CleanedDataset {
    let df = ActivityLogGenerator::new(n_rows).generate().unwrap();
    CleaningPipeline::new(CleaningConfig::default().without_persist())
        .clean_frame(&df, "bench", None)
        .unwrap()
}

fn bench_cleaning(c: &mut Criterion) {
    let mut group = c.benchmark_group("cleaning");
    group.sample_size(10);

    for n_rows in [1000, 5000].iter() {
        let df = ActivityLogGenerator::new(*n_rows).generate().unwrap();
        let pipeline = CleaningPipeline::new(CleaningConfig::default().without_persist());

        group.bench_with_input(BenchmarkId::new("clean_frame", n_rows), &df, |b, df| {
            b.iter(|| pipeline.clean_frame(black_box(df), "bench", None).unwrap())
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000].iter() {
        let dataset = cleaned_log(*n_rows);

        for model_type in [ModelType::DecisionTree, ModelType::RandomForest] {
            let trainer = Trainer::new(TrainingConfig::new(model_type).with_n_estimators(50));
            group.bench_with_input(
                BenchmarkId::new(model_type.to_string(), n_rows),
                &dataset,
                |b, dataset| b.iter(|| trainer.fit(black_box(dataset)).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let dataset = cleaned_log(2000);
    let outcome = Trainer::new(TrainingConfig::default()).fit(&dataset).unwrap();

    let artifact = ModelArtifact {
        run_id: outcome.run_id.clone(),
        created_at: chrono::Utc::now(),
        feature_names: productivity_predictor::feature_engineering::FEATURE_NAMES
            .iter()
            .map(|s| s.to_string())
            .collect(),
        model: outcome.model.clone(),
        report: outcome.report.clone(),
        feature_sources: outcome.feature_sources.clone(),
    };
    let mapping = MappingArtifact {
        run_id: outcome.run_id.clone(),
        created_at: chrono::Utc::now(),
        mapping: outcome.mapping.clone(),
    };
    let predictor = Predictor::from_artifacts(artifact, Some(mapping), FeatureAssembler::new()).unwrap();

    let record = json!({"Mood": 7, "Hour": 10, "Week(day/end)": "Weekday", "SleepHours": 8});
    c.bench_function("predict_single", |b| {
        b.iter(|| predictor.predict(black_box(&record)).unwrap())
    });
    c.bench_function("predict_label", |b| {
        b.iter(|| predictor.predict_label(black_box(&record)).unwrap())
    });
}

criterion_group!(benches, bench_cleaning, bench_training, bench_prediction);
criterion_main!(benches);
