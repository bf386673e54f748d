//! `arbor` provides binary classification with decision trees and random forests over
//! tabular, real-valued feature data.
//!
//! ## The big picture
//!
//! The root crate holds everything the learning algorithms share:
//!
//! * the labeled [`Row`](dataset::Row) and [`Matrix`](dataset::Matrix) data model,
//! * the [`Fit`](traits::Fit), [`Predictor`](traits::Predictor) and
//!   [`Predict`](traits::Predict) traits,
//! * hyperparameter validation through [`ParamGuard`],
//! * a [confusion matrix](metrics::ConfusionMatrix) to score predictions against held-out
//!   labels.
//!
//! The tree growing algorithms themselves live in `arbor-trees`.
//!
//! ## Example
//!
//! ```rust
//! use arbor::prelude::*;
//!
//! let matrix = Matrix::from_rows(vec![
//!     Row::new(vec![1.0, 0.5], "UP"),
//!     Row::new(vec![2.0, 0.1], "UP"),
//!     Row::new(vec![3.0, 0.4], "DOWN"),
//! ])
//! .unwrap();
//!
//! assert_eq!(matrix.median(0), Some(2.0));
//! assert_eq!(matrix.most_common_label(), Some("UP"));
//! ```
//!

pub mod dataset;
pub mod error;
mod metrics_classification;
mod param_guard;
pub mod prelude;
pub mod traits;

#[cfg(feature = "benchmarks")]
pub mod benchmarks;

pub use dataset::{Float, Label, Matrix, Row};
pub use error::Error;
pub use param_guard::ParamGuard;

/// Common metrics functions for classification
pub mod metrics {
    pub use crate::metrics_classification::{ConfusionMatrix, ToConfusionMatrix};
}
