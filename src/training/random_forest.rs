//! Random forest classifier

use crate::error::{PredictorError, Result};
use super::decision_tree::{Criterion, DecisionTree};
use super::models::Classifier;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split (sqrt by default)
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: u64,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
    classes: Vec<i64>,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 42,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = Array1::<f64>::zeros(self.n_features);
        for imp in self.trees.iter().filter_map(|t| t.feature_importances()) {
            total += imp;
        }

        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        self.feature_importances = Some(total);
    }

    /// Per-tree predictions, one row per tree
    fn tree_votes(&self, x: &Array2<f64>) -> Result<Vec<Array1<i64>>> {
        if self.trees.is_empty() {
            return Err(PredictorError::ModelNotFitted);
        }
        self.trees.par_iter().map(|tree| tree.predict(x)).collect()
    }

    /// Share of trees voting for each class, columns ordered as `classes()`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let votes = self.tree_votes(x)?;
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));

        for preds in &votes {
            for (i, class) in preds.iter().enumerate() {
                if let Ok(j) = self.classes.binary_search(class) {
                    proba[[i, j]] += 1.0;
                }
            }
        }
        proba /= votes.len() as f64;

        Ok(proba)
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || self.n_estimators == 0 {
            return Err(PredictorError::TrainingError(format!(
                "cannot fit {} trees on {} samples",
                self.n_estimators, n_samples
            )));
        }

        self.n_features = n_features;
        let max_features = self.compute_max_features(n_features);

        let mut classes: Vec<i64> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;

        let base_seed = self.random_state;

        // Each tree owns its seed, so the result does not depend on scheduling
        let trees: Result<Vec<DecisionTree>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<i64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_max_features(max_features)
                    .with_random_state(rng.next_u64());
                tree.max_depth = self.max_depth;

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        self.compute_feature_importances();

        Ok(())
    }

    /// Majority vote; ties go to the smallest class code
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let votes = self.tree_votes(x)?;

        Ok((0..x.nrows())
            .map(|i| {
                let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
                for preds in &votes {
                    *counts.entry(preds[i]).or_insert(0) += 1;
                }
                let mut best: Option<(i64, usize)> = None;
                for (class, count) in counts {
                    if best.map_or(true, |(_, c)| count > c) {
                        best = Some((class, count));
                    }
                }
                best.map_or(0, |(class, _)| class)
            })
            .collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_clusters() -> (Array2<f64>, Array1<i64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![3i64, 3, 3, 5, 5, 5];
        (x, y)
    }

    #[test]
    fn test_classifier() {
        let (x, y) = two_clusters();
        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(p, a)| p == a).count();
        assert!(correct >= 5, "only {} of 6 correct", correct);
        assert_eq!(rf.n_trees(), 10);
        assert_eq!(rf.classes(), &[3, 5]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let x = Array2::from_shape_fn((60, 8), |(i, j)| ((i * 31 + j * 17) % 10) as f64);
        let y: Array1<i64> = (0..60).map(|i| (i % 4) as i64).collect();

        let mut a = RandomForest::new(15).with_max_depth(10).with_random_state(42);
        let mut b = RandomForest::new(15).with_max_depth(10).with_random_state(42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let (x, y) = two_clusters();
        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (6, 2));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForest::new(3);
        assert!(matches!(rf.predict(&array![[0.0]]), Err(PredictorError::ModelNotFitted)));
    }

    #[test]
    fn test_feature_importances_normalized() {
        let (x, y) = two_clusters();
        let mut rf = RandomForest::new(10).with_random_state(1);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!((importances.sum() - 1.0).abs() < 1e-9);
    }
}
