//! Decision tree classifier

use crate::error::{PredictorError, Result};
use super::models::Classifier;
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the majority class
    Leaf {
        class: i64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    fn impurity(self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// CART classification tree.
///
/// With `max_features` set, each split considers a random feature subset
/// drawn from a generator seeded with `random_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split, all when `None`
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: u64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    /// Sorted distinct class codes seen during fit
    classes: Vec<i64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

struct SplitContext<'a> {
    x: &'a Array2<f64>,
    /// Index into `classes` per sample
    y: &'a [usize],
    n_classes: usize,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 42,
            n_features: 0,
            feature_importances: None,
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

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn build_tree(
        &self,
        ctx: &SplitContext<'_>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = class_counts(ctx, indices);
        let leaf = || TreeNode::Leaf {
            class: self.classes[majority(&counts)],
            n_samples,
        };

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;
        if should_stop {
            return leaf();
        }

        let features = self.candidate_features(rng);
        let parent_impurity = self.criterion.impurity(&counts, n_samples);

        let Some((feature, threshold, gain)) =
            self.find_best_split(ctx, indices, &features, &counts, parent_impurity)
        else {
            return leaf();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| ctx.x[[i, feature]] <= threshold);

        importances[feature] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(ctx, &left_indices, depth + 1, rng, importances));
        let right = Box::new(self.build_tree(ctx, &right_indices, depth + 1, rng, importances));

        TreeNode::Split {
            feature_idx: feature,
            threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut chosen = sample(rng, self.n_features, k.max(1)).into_vec();
                chosen.sort_unstable();
                chosen
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best (feature, threshold, gain) over the candidates; ties go to the
    /// earlier feature
    fn find_best_split(
        &self,
        ctx: &SplitContext<'_>,
        indices: &[usize],
        features: &[usize],
        parent_counts: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();

        // Each feature independently finds its best split
        let per_feature: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature| {
                let mut sorted: Vec<(f64, usize)> = indices
                    .iter()
                    .map(|&i| (ctx.x[[i, feature]], ctx.y[i]))
                    .collect();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left = vec![0usize; ctx.n_classes];
                let mut right = parent_counts.to_vec();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..n - 1 {
                    let (value, class) = sorted[pos];
                    left[class] += 1;
                    right[class] -= 1;

                    let next = sorted[pos + 1].0;
                    if next <= value {
                        continue;
                    }
                    let (n_left, n_right) = (pos + 1, n - pos - 1);
                    if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (n_left as f64 * self.criterion.impurity(&left, n_left)
                        + n_right as f64 * self.criterion.impurity(&right, n_right))
                        / n as f64;
                    let gain = parent_impurity - weighted;
                    if gain > best.map_or(0.0, |(_, g)| g) {
                        best = Some(((value + next) / 2.0, gain));
                    }
                }

                best.map(|(threshold, gain)| (feature, threshold, gain))
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
    }

    fn predict_sample(node: &TreeNode, sample: ArrayView1<'_, f64>) -> i64 {
        match node {
            TreeNode::Leaf { class, .. } => *class,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Get tree depth (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PredictorError::TrainingError("cannot fit a tree on 0 samples".to_string()));
        }

        self.n_features = x.ncols();
        let mut classes: Vec<i64> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;

        let class_index: Vec<usize> = y
            .iter()
            .map(|c| self.classes.binary_search(c).unwrap_or(0))
            .collect();
        let ctx = SplitContext {
            x,
            y: &class_index,
            n_classes: self.classes.len(),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(&ctx, &indices, 0, &mut rng, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let root = self.root.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| Self::predict_sample(root, row))
            .collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

fn class_counts(ctx: &SplitContext<'_>, indices: &[usize]) -> Vec<usize> {
    let mut counts = vec![0usize; ctx.n_classes];
    for &i in indices {
        counts[ctx.y[i]] += 1;
    }
    counts
}

/// Index of the most frequent class; ties go to the smallest code
fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}
