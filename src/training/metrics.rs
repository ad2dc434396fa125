//! Classification report

use crate::error::{PredictorError, Result};
use crate::preprocessing::CategoryMapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub label: Option<String>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of the class
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Evaluation of a classifier on held-out data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    /// Rows are true classes, columns predicted, both in `per_class` order
    pub confusion_matrix: Vec<Vec<usize>>,
    pub n_samples: usize,
}

impl ClassificationReport {
    /// Undefined ratios (no predictions or no support) count as 0
    pub fn compute(y_true: &[i64], y_pred: &[i64], mapping: Option<&CategoryMapping>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(PredictorError::TrainingError("cannot evaluate on 0 samples".to_string()));
        }

        let classes: Vec<i64> = y_true
            .iter()
            .chain(y_pred.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let k = classes.len();
        let position = |c: &i64| classes.binary_search(c).unwrap_or(0);

        let mut confusion = vec![vec![0usize; k]; k];
        for (t, p) in y_true.iter().zip(y_pred) {
            confusion[position(t)][position(p)] += 1;
        }

        let n = y_true.len();
        let correct: usize = (0..k).map(|i| confusion[i][i]).sum();

        let per_class: Vec<ClassMetrics> = classes
            .iter()
            .enumerate()
            .map(|(i, &class)| {
                let tp = confusion[i][i];
                let support: usize = confusion[i].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[i]).sum();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    class,
                    label: mapping.and_then(|m| m.label(class)).map(str::to_string),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let macro_avg = AveragedMetrics {
            precision: per_class.iter().map(|c| c.precision).sum::<f64>() / k as f64,
            recall: per_class.iter().map(|c| c.recall).sum::<f64>() / k as f64,
            f1: per_class.iter().map(|c| c.f1).sum::<f64>() / k as f64,
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            per_class.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / n as f64
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Ok(Self {
            accuracy: correct as f64 / n as f64,
            per_class,
            macro_avg,
            weighted_avg,
            confusion_matrix: confusion,
            n_samples: n,
        })
    }

    pub fn class(&self, class: i64) -> Option<&ClassMetrics> {
        self.per_class.iter().find(|c| c.class == class)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.per_class {
            let name = c.label.clone().unwrap_or_else(|| c.class.to_string());
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.n_samples)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.n_samples
            )?;
        }
        Ok(())
    }
}
