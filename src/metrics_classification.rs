//! Common metrics for performance evaluation of classifier
//!
//! Scoring is essential for classification tasks. This module implements a confusion matrix
//! over arbitrary labels and the scores derived from it: precision, accuracy, recall, f1-score
//! and the Matthews correlation coefficient.
use std::collections::HashMap;
use std::fmt;

use ndarray::prelude::*;
use ndarray::Data;

use crate::dataset::{Float, Label, Matrix};
use crate::error::{Error, Result};

/// Return the distinct labels of ground truth and prediction in order of first appearance
fn collect_classes<L: Label>(ground_truth: &[L], prediction: &[L]) -> Vec<L> {
    let mut classes: Vec<L> = Vec::new();
    for label in ground_truth.iter().chain(prediction.iter()) {
        if !classes.contains(label) {
            classes.push(label.clone());
        }
    }

    classes
}

/// Confusion matrix for label evaluation
///
/// A confusion matrix shows predictions in a matrix, where rows correspond to target and columns
/// to predicted. The diagonal entries are correct predictions.
#[derive(Clone, PartialEq)]
pub struct ConfusionMatrix<L> {
    matrix: Array2<usize>,
    members: Vec<L>,
}

impl<L: Label> ConfusionMatrix<L> {
    /// Build the matrix from pairs of ground truth and predicted labels
    pub fn from_labels(ground_truth: &[L], prediction: &[L]) -> Result<Self> {
        if ground_truth.len() != prediction.len() {
            return Err(Error::MismatchedShapes(
                ground_truth.len(),
                prediction.len(),
            ));
        }

        let members = collect_classes(ground_truth, prediction);
        let index = members
            .iter()
            .enumerate()
            .map(|(i, label)| (label, i))
            .collect::<HashMap<_, usize>>();

        let mut matrix = Array2::zeros((members.len(), members.len()));
        for (actual, predicted) in ground_truth.iter().zip(prediction.iter()) {
            matrix[(index[actual], index[predicted])] += 1;
        }

        Ok(ConfusionMatrix { matrix, members })
    }

    /// Return the labels in the order of the matrix rows and columns
    pub fn members(&self) -> &[L] {
        &self.members
    }

    /// Return the number of samples with target `actual` which were predicted as `predicted`
    pub fn count(&self, actual: &L, predicted: &L) -> usize {
        let row = self.members.iter().position(|x| x == actual);
        let col = self.members.iter().position(|x| x == predicted);

        match (row, col) {
            (Some(row), Some(col)) => self.matrix[(row, col)],
            _ => 0,
        }
    }

    /// Return the total number of evaluated samples
    pub fn nsamples(&self) -> usize {
        self.matrix.sum()
    }
}

impl<L> ConfusionMatrix<L> {
    /// Calculate precision for every class
    pub fn precision(&self) -> Array1<f32> {
        let sum = self.matrix.sum_axis(Axis(0));

        self.matrix
            .diag()
            .iter()
            .zip(sum.iter())
            .map(|(a, b)| *a as f32 / *b as f32)
            .collect()
    }

    /// Calculate recall for every class
    pub fn recall(&self) -> Array1<f32> {
        let sum = self.matrix.sum_axis(Axis(1));

        self.matrix
            .diag()
            .iter()
            .zip(sum.iter())
            .map(|(a, b)| *a as f32 / *b as f32)
            .collect()
    }

    /// Return mean accuracy
    pub fn accuracy(&self) -> f32 {
        self.matrix.diag().sum() as f32 / self.matrix.sum() as f32
    }

    /// Return beta score for every class
    pub fn f_score(&self, beta: f32) -> Array1<f32> {
        let sb = beta * beta;
        let precision = self.precision();
        let recall = self.recall();

        precision
            .iter()
            .zip(recall.iter())
            .map(|(p, r)| (1.0 + sb) * (p * r) / (sb * p + r))
            .collect()
    }

    /// Return beta=1 score for every class
    pub fn f1_score(&self) -> Array1<f32> {
        self.f_score(1.0)
    }

    /// Return the Matthew Correlation Coefficients
    ///
    /// Estimates the normalized cross-correlation between target and predicted variable
    pub fn mcc(&self) -> f32 {
        let n = self.members.len();
        let mut cov_xy = 0.0;
        for k in 0..n {
            for l in 0..n {
                for m in 0..n {
                    cov_xy += self.matrix[(k, k)] as f32 * self.matrix[(l, m)] as f32;
                    cov_xy -= self.matrix[(k, l)] as f32 * self.matrix[(m, k)] as f32;
                }
            }
        }

        let sum = self.matrix.sum();
        let sum_over_cols = self.matrix.sum_axis(Axis(0));
        let sum_over_rows = self.matrix.sum_axis(Axis(1));

        let mut cov_xx: f32 = 0.0;
        let mut cov_yy: f32 = 0.0;
        for k in 0..n {
            cov_xx += (sum_over_rows[k] * (sum - sum_over_rows[k])) as f32;
            cov_yy += (sum_over_cols[k] * (sum - sum_over_cols[k])) as f32;
        }

        cov_xy / cov_xx.sqrt() / cov_yy.sqrt()
    }
}

/// Print a confusion matrix with the target labels as rows and predictions as columns
impl<L: fmt::Debug> fmt::Debug for ConfusionMatrix<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = self
            .members
            .iter()
            .map(|x| format!("{:?}", x))
            .collect::<Vec<_>>();
        let width = names.iter().map(|x| x.len()).max().unwrap_or(0).max(8);

        write!(f, "{:>width$} |", "", width = width)?;
        for name in &names {
            write!(f, " {:>width$}", name, width = width)?;
        }
        writeln!(f)?;

        for (i, name) in names.iter().enumerate() {
            write!(f, "{:>width$} |", name, width = width)?;
            for j in 0..names.len() {
                write!(f, " {:>width$}", self.matrix[(i, j)], width = width)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Classification functions
///
/// Builds the confusion matrix of a prediction against the ground truth, all other metrics
/// are derived from its entries.
pub trait ToConfusionMatrix<L, T> {
    fn confusion_matrix(&self, ground_truth: T) -> Result<ConfusionMatrix<L>>;
}

impl<'a, L: Label> ToConfusionMatrix<L, &'a [L]> for [L] {
    fn confusion_matrix(&self, ground_truth: &'a [L]) -> Result<ConfusionMatrix<L>> {
        ConfusionMatrix::from_labels(ground_truth, self)
    }
}

impl<'a, F: Float, L: Label> ToConfusionMatrix<L, &'a Matrix<F, L>> for [L] {
    fn confusion_matrix(&self, ground_truth: &'a Matrix<F, L>) -> Result<ConfusionMatrix<L>> {
        ConfusionMatrix::from_labels(&ground_truth.targets(), self)
    }
}

impl<'a, L: Label, S: Data<Elem = L>> ToConfusionMatrix<L, &'a [L]> for ArrayBase<S, Ix1> {
    fn confusion_matrix(&self, ground_truth: &'a [L]) -> Result<ConfusionMatrix<L>> {
        ConfusionMatrix::from_labels(ground_truth, &self.to_vec())
    }
}

impl<'a, F: Float, L: Label, S: Data<Elem = L>> ToConfusionMatrix<L, &'a Matrix<F, L>>
    for ArrayBase<S, Ix1>
{
    fn confusion_matrix(&self, ground_truth: &'a Matrix<F, L>) -> Result<ConfusionMatrix<L>> {
        ConfusionMatrix::from_labels(&ground_truth.targets(), &self.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;
    use approx::assert_abs_diff_eq;

    fn assert_eq_slice(a: Array1<f32>, b: &[f32]) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_confusion_matrix() {
        let predicted = [0usize, 1, 0, 1, 0, 1];
        let ground_truth = [1usize, 1, 0, 1, 0, 1];

        let cm = predicted[..].confusion_matrix(&ground_truth[..]).unwrap();

        assert_eq!(cm.members(), &[1, 0]);
        assert_eq!(cm.count(&1, &1), 3);
        assert_eq!(cm.count(&1, &0), 1);
        assert_eq!(cm.count(&0, &0), 2);
        assert_eq!(cm.count(&0, &1), 0);
        assert_eq!(cm.nsamples(), 6);
    }

    #[test]
    fn test_cm_metrices() {
        let predicted = array!["UP", "DOWN", "UP", "DOWN", "UP", "DOWN"];
        let ground_truth = ["DOWN", "DOWN", "UP", "DOWN", "UP", "DOWN"];

        let x = predicted.confusion_matrix(&ground_truth[..]).unwrap();

        // members are ordered [DOWN, UP]
        assert_abs_diff_eq!(x.accuracy(), 5.0 / 6.0);
        assert_abs_diff_eq!(
            x.mcc(),
            (2. * 3. - 1. * 0.) / (2.0f32 * 3. * 3. * 4.).sqrt(),
            epsilon = 1e-6
        );
        assert_eq_slice(x.precision(), &[1.0, 2. / 3.]);
        assert_eq_slice(x.recall(), &[3. / 4., 1.0]);
        assert_eq_slice(x.f1_score(), &[6.0 / 7.0, 4.0 / 5.0]);
    }

    #[test]
    fn against_matrix_targets() {
        let matrix = Matrix::from_rows(vec![
            Row::new(vec![0.0], "UP"),
            Row::new(vec![1.0], "DOWN"),
        ])
        .unwrap();

        let cm = vec!["UP", "UP"][..].confusion_matrix(&matrix).unwrap();
        assert_abs_diff_eq!(cm.accuracy(), 0.5);

        assert_eq!(
            vec!["UP"][..].confusion_matrix(&matrix).unwrap_err(),
            Error::MismatchedShapes(2, 1)
        );
    }

    #[test]
    fn debug_output_lists_labels() {
        let cm = ConfusionMatrix::from_labels(&["UP", "DOWN"], &["UP", "UP"]).unwrap();
        let printed = format!("{:?}", cm);

        assert!(printed.contains("\"UP\""));
        assert!(printed.contains("\"DOWN\""));
        assert_eq!(printed.lines().count(), 3);
    }
}
