use arbor::{
    error::{Error, Result},
    Float, Label, ParamGuard,
};
use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::DecisionTree;

/// The metric used to determine the feature by which a node is split
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitQuality {
    /// Measures the degree of probability of a randomly chosen point in the subtree being misclassified, defined as
    /// one minus the sum over both labels of the squared probability of encountering that label.
    Gini,
    /// Measures the entropy of a subtree, defined as the sum over both labels of the probability of encountering
    /// that label times its natural logarithm, with negative sign. The entropy of a node minus the weighted sum of
    /// the entropy of its two subtrees defines the "information gain" obtained by applying the split.
    Entropy,
}

/// The features offered to the split strategy at every node
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureSampling {
    /// Every feature not yet used on the path from the root
    All,
    /// A random subset of `floor(sqrt(n))` of the `n` unused features
    Sqrt,
}

/// Validate an optional pair of explicit labels
pub(crate) fn check_labels<L: Label>(labels: Option<&(L, L)>) -> Result<()> {
    match labels {
        Some((first, second)) if first == second => Err(Error::Parameters(format!(
            "the two labels of a binary tree must differ, got {:?} twice",
            first
        ))),
        _ => Ok(()),
    }
}

/// The set of hyperparameters that can be specified for fitting a
/// [decision tree](struct.DecisionTree.html).
///
/// ### Example
///
/// ```rust
/// use arbor_trees::{DecisionTree, SplitQuality};
/// use arbor::prelude::*;
///
/// let train = Matrix::from_rows(vec![
///     Row::new(vec![1.0, 0.3], "A"),
///     Row::new(vec![2.0, 0.1], "A"),
///     Row::new(vec![3.0, 0.4], "B"),
///     Row::new(vec![4.0, 0.2], "B"),
/// ]).unwrap();
///
/// // Initialize the default set of parameters and set them to the desired values
/// let params = DecisionTree::params().split_quality(SplitQuality::Gini);
///
/// // Fit the decision tree on the training data
/// let tree = params.fit(&train).unwrap();
/// // Predict on the training data and check accuracy
/// let accuracy = tree.predict(&train).confusion_matrix(&train).unwrap().accuracy();
/// assert!(accuracy > 0.99);
/// ```
///
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug)]
pub struct DecisionTreeValidParams<F, L> {
    split_quality: SplitQuality,
    feature_sampling: FeatureSampling,
    labels: Option<(L, L)>,
    seed: u64,

    float_marker: PhantomData<F>,
}

impl<F: Float, L> DecisionTreeValidParams<F, L> {
    pub fn split_quality(&self) -> SplitQuality {
        self.split_quality
    }

    pub fn feature_sampling(&self) -> FeatureSampling {
        self.feature_sampling
    }

    pub fn labels(&self) -> Option<&(L, L)> {
        self.labels.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug)]
pub struct DecisionTreeParams<F, L>(DecisionTreeValidParams<F, L>);

impl<F: Float, L: Label> DecisionTreeParams<F, L> {
    pub fn new() -> Self {
        Self(DecisionTreeValidParams {
            split_quality: SplitQuality::Entropy,
            feature_sampling: FeatureSampling::All,
            labels: None,
            seed: 42,
            float_marker: PhantomData,
        })
    }

    /// Sets the metric used to decide the feature on which to split a node
    pub fn split_quality(mut self, split_quality: SplitQuality) -> Self {
        self.0.split_quality = split_quality;
        self
    }

    /// Sets which of the unused features are considered at every node
    pub fn feature_sampling(mut self, feature_sampling: FeatureSampling) -> Self {
        self.0.feature_sampling = feature_sampling;
        self
    }

    /// Fixes the two labels of the tree
    ///
    /// Without explicit labels they are taken from the training set, which then must not
    /// contain more than two distinct labels.
    pub fn labels(mut self, first: L, second: L) -> Self {
        self.0.labels = Some((first, second));
        self
    }

    /// Sets the seed of the feature sampling
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, L: Label> Default for DecisionTreeParams<F, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float, L: Label> DecisionTree<F, L> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `split_quality = SplitQuality::Entropy`
    /// * `feature_sampling = FeatureSampling::All`
    /// * `labels = None`
    /// * `seed = 42`
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> DecisionTreeParams<F, L> {
        DecisionTreeParams::new()
    }
}

impl<F: Float, L: Label> ParamGuard for DecisionTreeParams<F, L> {
    type Checked = DecisionTreeValidParams<F, L>;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_labels(self.0.labels.as_ref())?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
