//! Datasets
//!
//! This module implements the labeled row and matrix types consumed by the learning algorithms,
//! together with the numeric and label trait bounds used across the workspace.
use ndarray::{Array1, ArrayView1};

use num_traits::{FromPrimitive, NumAssignOps, NumCast};

use std::fmt;
use std::hash::Hash;
use std::iter::Sum;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

mod impl_matrix;

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. They are used for the feature values of
/// a row and for the thresholds of a fitted tree.
pub trait Float:
    FromPrimitive
    + num_traits::Float
    + PartialOrd
    + Sync
    + Send
    + Default
    + fmt::Display
    + fmt::Debug
    + Sum
    + NumAssignOps
    + 'static
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}

impl Float for f64 {}

/// Discrete labels
///
/// Labels are countable, comparable and hashable. Boolean, usize and string labels are
/// supported. A single training run classifies into exactly two labels.
pub trait Label: PartialEq + Eq + Hash + Clone + fmt::Debug {}

impl Label for bool {}
impl Label for usize {}
impl Label for String {}
impl Label for &str {}

/// A single labeled observation
///
/// A row holds one value per feature and the label the observation belongs to. Rows are
/// immutable once constructed and shared between a matrix and the matrices produced by
/// splitting it.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Row<F, L> {
    features: Array1<F>,
    label: L,
}

impl<F: Float, L: Label> Row<F, L> {
    /// Create a row from its feature values and label
    pub fn new(features: impl Into<Array1<F>>, label: L) -> Self {
        Row {
            features: features.into(),
            label,
        }
    }

    /// Return the value of the feature at `idx`
    ///
    /// ### Panics
    ///
    /// If `idx` is out of bounds
    pub fn feature(&self, idx: usize) -> F {
        self.features[idx]
    }

    pub fn features(&self) -> ArrayView1<'_, F> {
        self.features.view()
    }

    pub fn label(&self) -> &L {
        &self.label
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }
}

/// An ordered collection of labeled rows
///
/// All rows of a matrix have the same number of features. Operations producing new matrices,
/// like [`split`](Matrix::split), share the rows of the original matrix instead of copying
/// their feature values, and never modify the matrix they are called on.
#[derive(Debug, Clone)]
pub struct Matrix<F, L> {
    rows: Vec<Arc<Row<F, L>>>,
}

impl<F, L> Default for Matrix<F, L> {
    fn default() -> Self {
        Matrix { rows: Vec::new() }
    }
}

impl<F: PartialEq, L: PartialEq> PartialEq for Matrix<F, L> {
    fn eq(&self, other: &Self) -> bool {
        self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(other.rows.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }
}
