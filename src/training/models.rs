//! Classifier contract and the persisted model enum

use crate::error::Result;
use super::config::{ModelType, TrainingConfig};
use super::decision_tree::DecisionTree;
use super::random_forest::RandomForest;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trait for classifiers over class codes
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Predict one class code per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>>;

    /// Sorted class codes seen during fit
    fn classes(&self) -> &[i64];

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<&Array1<f64>> {
        None
    }

    fn is_fitted(&self) -> bool;
}

/// A fitted classifier of any supported type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum TrainedModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
}

impl TrainedModel {
    /// Unfitted estimator as configured
    pub fn from_config(config: &TrainingConfig) -> Self {
        match config.model_type {
            ModelType::RandomForest => {
                let mut forest = RandomForest::new(config.n_estimators)
                    .with_min_samples_split(config.min_samples_split)
                    .with_min_samples_leaf(config.min_samples_leaf)
                    .with_random_state(config.random_state);
                forest.max_depth = config.max_depth;
                TrainedModel::RandomForest(forest)
            }
            ModelType::DecisionTree => {
                let mut tree = DecisionTree::new()
                    .with_min_samples_split(config.min_samples_split)
                    .with_min_samples_leaf(config.min_samples_leaf)
                    .with_random_state(config.random_state);
                tree.max_depth = config.max_depth;
                TrainedModel::DecisionTree(tree)
            }
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::RandomForest(_) => ModelType::RandomForest,
            TrainedModel::DecisionTree(_) => ModelType::DecisionTree,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        self.inner().predict(x)
    }

    fn classes(&self) -> &[i64] {
        self.inner().classes()
    }

    fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.inner().feature_importances()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_config_respects_model_type() {
        let forest = TrainedModel::from_config(&TrainingConfig::default());
        assert_eq!(forest.model_type(), ModelType::RandomForest);
        assert!(!forest.is_fitted());

        let tree = TrainedModel::from_config(&TrainingConfig::new(ModelType::DecisionTree));
        assert_eq!(tree.model_type(), ModelType::DecisionTree);
    }

    #[test]
    fn test_tagged_json_roundtrip() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0i64, 0, 1, 1];
        let mut model = TrainedModel::from_config(&TrainingConfig::new(ModelType::DecisionTree));
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["type"], "decision_tree");

        let back: TrainedModel = serde_json::from_value(json).unwrap();
        assert_eq!(back.predict(&x).unwrap(), y);
    }
}
