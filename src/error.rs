//! Error types in arbor
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("training set can't be empty")]
    EmptyTrainingSet,
    #[error("row has {got} features, expected {expected}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("found {0} distinct labels, only binary classification is supported")]
    TooManyLabels(usize),
    #[error("row label is not one of the two configured labels")]
    UnknownLabel,
    #[error("mismatched number of predictions and targets: {0} vs {1}")]
    MismatchedShapes(usize, usize),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
