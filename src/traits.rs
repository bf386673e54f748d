//! Provide traits for different classes of algorithms
//!

use crate::dataset::{Float, Label, Matrix, Row};
use crate::error::Error;
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Ix1, Ix2};

/// Fittable algorithms
///
/// A fittable algorithm takes a labeled matrix and creates a model of it, for example a
/// decision tree or an ensemble of decision trees. The fitted object can then classify
/// unseen rows.
pub trait Fit<F: Float, L: Label, E: std::error::Error + From<Error> = Error> {
    type Object;

    fn fit(&self, dataset: &Matrix<F, L>) -> Result<Self::Object, E>;
}

/// A fitted model able to classify a single observation
///
/// Implementors only provide the per-observation rule; the [`Predict`] implementations for
/// rows, matrices and ndarray records are derived from it.
pub trait Predictor<F, L> {
    /// Predict the label of one observation given its feature values
    fn predict_features(&self, x: ArrayView1<'_, F>) -> L;
}

/// Predict with model
///
/// This trait assumes the `Predictor` implementation and provides additional input/output
/// combinations.
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}

impl<'a, F: Float, L: Label, P: Predictor<F, L>> Predict<&'a Row<F, L>, L> for P {
    fn predict(&self, row: &'a Row<F, L>) -> L {
        self.predict_features(row.features())
    }
}

impl<'a, F: Float, L: Label, P: Predictor<F, L>> Predict<&'a Matrix<F, L>, Vec<L>> for P {
    fn predict(&self, matrix: &'a Matrix<F, L>) -> Vec<L> {
        matrix
            .rows()
            .iter()
            .map(|row| self.predict_features(row.features()))
            .collect()
    }
}

impl<'a, F: Float, L: Label, D: Data<Elem = F>, P: Predictor<F, L>>
    Predict<&'a ArrayBase<D, Ix2>, Array1<L>> for P
{
    fn predict(&self, x: &'a ArrayBase<D, Ix2>) -> Array1<L> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_features(row))
            .collect()
    }
}

impl<'a, F: Float, L: Label, D: Data<Elem = F>, P: Predictor<F, L>>
    Predict<&'a ArrayBase<D, Ix1>, L> for P
{
    fn predict(&self, x: &'a ArrayBase<D, Ix1>) -> L {
        self.predict_features(x.view())
    }
}
