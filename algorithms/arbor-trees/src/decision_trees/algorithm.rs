//! Binary decision trees
//!
use std::collections::HashSet;
#[cfg(feature = "serde")]
use std::convert::TryFrom;

use ndarray::ArrayView1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use super::NodeIter;
use super::{DecisionTreeValidParams, FeatureSampling};
use super::{LabelPair, RandomizedSplit, SplitStrategy};
use arbor::{
    error::{Error, Result},
    traits::*,
    Float, Label, Matrix,
};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A node in a decision tree
///
/// Internal nodes always own both children. Rows whose value of `feature_idx` is smaller than
/// `split_value` descend to the left child, all others to the right one.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode<F, L> {
    Leaf {
        prediction: L,
    },
    Internal {
        feature_idx: usize,
        split_value: F,
        impurity_decrease: F,
        left: Box<TreeNode<F, L>>,
        right: Box<TreeNode<F, L>>,
    },
}

impl<F: Float, L: Label> TreeNode<F, L> {
    pub fn leaf(prediction: L) -> Self {
        TreeNode::Leaf { prediction }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Return the predicted label of a leaf, `None` for internal nodes
    pub fn prediction(&self) -> Option<&L> {
        match self {
            TreeNode::Leaf { prediction } => Some(prediction),
            TreeNode::Internal { .. } => None,
        }
    }

    /// Return the left and right child, empty for leaves
    pub fn children(&self) -> Vec<&TreeNode<F, L>> {
        match self {
            TreeNode::Leaf { .. } => Vec::new(),
            TreeNode::Internal { left, right, .. } => vec![&**left, &**right],
        }
    }

    /// Return the triple (feature index, split value, impurity decrease) of an internal node
    pub fn split(&self) -> Option<(usize, F, F)> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Internal {
                feature_idx,
                split_value,
                impurity_decrease,
                ..
            } => Some((*feature_idx, *split_value, *impurity_decrease)),
        }
    }

    /// Number of edges on the longest path from this node down to a leaf
    pub fn height(&self) -> usize {
        self.children()
            .into_iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A fitted binary decision tree
///
/// ### Structure
///
/// Every internal node splits on one feature at the median of that feature among the training
/// rows reaching the node, and no feature is split on twice along a path. The depth of a tree
/// is therefore bounded by the number of features.
///
/// ### Algorithm
///
/// The tree is grown by a [`TreeBuilder`] from the root down. A node becomes a leaf predicting
/// the most common label of its rows when these rows all share a label or when no unused
/// feature is left. A node reached by no training row predicts the majority label of its
/// parent.
///
/// ### Predictions
///
/// To classify a row, the tree is traversed from the root, following the side of each split the
/// row falls on, until a leaf is reached. Trees implement [`Predictor`], so they can classify
/// a single [`Row`](arbor::Row), a whole [`Matrix`] or the records of a two-dimensional array.
///
/// ### Example
///
/// ```rust
/// use arbor::prelude::*;
/// use arbor_trees::{InformationGain, LabelPair, TreeBuilder};
///
/// let matrix = Matrix::from_rows(vec![
///     Row::new(vec![1.0], "A"),
///     Row::new(vec![2.0], "A"),
///     Row::new(vec![3.0], "B"),
///     Row::new(vec![4.0], "B"),
/// ]).unwrap();
///
/// let tree = TreeBuilder::new(LabelPair::new("A", "B"), InformationGain)
///     .train(&matrix)
///     .unwrap();
///
/// assert_eq!(tree.root_node().split().map(|(idx, value, _)| (idx, value)), Some((0, 2.5)));
/// assert_eq!(tree.predict(&Row::new(vec![1.5], "?")), "A");
/// assert_eq!(tree.predict(&Row::new(vec![3.5], "?")), "B");
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", try_from = "TreeRecord<F, L>")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree<F, L> {
    root_node: TreeNode<F, L>,
    num_features: usize,
}

/// A decoded tree whose splits are not yet checked against its feature count
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct TreeRecord<F, L> {
    root_node: TreeNode<F, L>,
    num_features: usize,
}

#[cfg(feature = "serde")]
impl<F, L> TryFrom<TreeRecord<F, L>> for DecisionTree<F, L> {
    type Error = Error;

    fn try_from(record: TreeRecord<F, L>) -> Result<Self> {
        let mut stack = vec![&record.root_node];
        while let Some(node) = stack.pop() {
            if let TreeNode::Internal {
                feature_idx,
                left,
                right,
                ..
            } = node
            {
                if *feature_idx >= record.num_features {
                    return Err(Error::Parameters(format!(
                        "split on feature {} of a tree with {} features",
                        feature_idx, record.num_features
                    )));
                }
                stack.push(&**left);
                stack.push(&**right);
            }
        }

        Ok(DecisionTree {
            root_node: record.root_node,
            num_features: record.num_features,
        })
    }
}

impl<F: Float, L: Label> DecisionTree<F, L> {
    /// Assemble a tree from its root node
    pub fn new(root_node: TreeNode<F, L>, num_features: usize) -> Self {
        DecisionTree {
            root_node,
            num_features,
        }
    }

    /// Create a node iterator in pre-order, left subtrees first
    pub fn iter_nodes(&self) -> NodeIter<'_, F, L> {
        // stack of nodes yet to explore
        let queue = vec![&self.root_node];

        NodeIter::new(queue)
    }

    /// Return the distinct feature indices split on by this tree
    pub fn features(&self) -> Vec<usize> {
        let mut seen = HashSet::new();

        self.iter_nodes()
            .filter_map(|node| node.split())
            .map(|(feature_idx, _, _)| feature_idx)
            .filter(|feature_idx| seen.insert(*feature_idx))
            .collect()
    }

    /// Return the mean impurity decrease for each feature
    pub fn mean_impurity_decrease(&self) -> Vec<F> {
        // total impurity decrease for each feature
        let mut impurity_decrease = vec![F::zero(); self.num_features];
        let mut num_nodes = vec![0; self.num_features];

        for (feature_idx, _, decrease) in self.iter_nodes().filter_map(|node| node.split()) {
            impurity_decrease[feature_idx] += decrease;
            num_nodes[feature_idx] += 1;
        }

        impurity_decrease
            .into_iter()
            .zip(num_nodes.into_iter())
            .map(|(val, n)| if n == 0 { F::zero() } else { val / F::cast(n) })
            .collect()
    }

    /// Return the feature importance, i.e. the relative mean impurity decrease, for each feature
    ///
    /// A tree without any useful split has zero importance for every feature.
    pub fn feature_importance(&self) -> Vec<F> {
        let mean_impurity_decrease = self.mean_impurity_decrease();
        let sum = mean_impurity_decrease.iter().cloned().sum::<F>();

        if sum <= F::zero() {
            return vec![F::zero(); self.num_features];
        }

        mean_impurity_decrease
            .into_iter()
            .map(|x| x / sum)
            .collect()
    }

    /// Return root node of the tree
    pub fn root_node(&self) -> &TreeNode<F, L> {
        &self.root_node
    }

    /// Return max depth of the tree
    pub fn max_depth(&self) -> usize {
        self.root_node.height()
    }

    /// Return the number of leaves in this tree
    pub fn num_leaves(&self) -> usize {
        self.iter_nodes().filter(|node| node.is_leaf()).count()
    }

    /// Return the number of features of the rows the tree was trained on
    pub fn num_features(&self) -> usize {
        self.num_features
    }
}

impl<F: Float, L: Label> Predictor<F, L> for DecisionTree<F, L> {
    fn predict_features(&self, x: ArrayView1<'_, F>) -> L {
        make_prediction(&x, &self.root_node)
    }
}

/// Classify a sample &x recursively using the tree node `node`.
fn make_prediction<F: Float, L: Label>(x: &ArrayView1<'_, F>, node: &TreeNode<F, L>) -> L {
    match node {
        TreeNode::Leaf { prediction } => prediction.clone(),
        TreeNode::Internal {
            feature_idx,
            split_value,
            left,
            right,
            ..
        } => {
            if x[*feature_idx] < *split_value {
                make_prediction(x, left)
            } else {
                make_prediction(x, right)
            }
        }
    }
}

/// Grows a decision tree with a pluggable split strategy
///
/// The strategy may carry state, like the random number generator of a
/// [`RandomizedSplit`], which is advanced as the tree grows.
#[derive(Debug, Clone)]
pub struct TreeBuilder<S, L> {
    labels: LabelPair<L>,
    strategy: S,
}

impl<S, L: Label> TreeBuilder<S, L> {
    pub fn new(labels: LabelPair<L>, strategy: S) -> Self {
        TreeBuilder { labels, strategy }
    }

    pub fn labels(&self) -> &LabelPair<L> {
        &self.labels
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Grow a tree on all features of `matrix`
    ///
    /// Fails with [`Error::EmptyTrainingSet`] if the matrix has no rows.
    pub fn train<F: Float>(&mut self, matrix: &Matrix<F, L>) -> Result<DecisionTree<F, L>>
    where
        S: SplitStrategy<F, L>,
    {
        let majority = matrix
            .most_common_label()
            .ok_or(Error::EmptyTrainingSet)?;

        let candidates = (0..matrix.num_features()).collect::<Vec<_>>();
        let root_node = self.grow(&candidates, matrix, &majority);

        Ok(DecisionTree::new(root_node, matrix.num_features()))
    }

    fn grow<F: Float>(
        &mut self,
        candidates: &[usize],
        rows: &Matrix<F, L>,
        parent_majority: &L,
    ) -> TreeNode<F, L>
    where
        S: SplitStrategy<F, L>,
    {
        // a node no training row reaches predicts what its parent would
        let prediction = match rows.most_common_label() {
            Some(label) => label,
            None => return TreeNode::leaf(parent_majority.clone()),
        };

        if rows.is_pure() || candidates.is_empty() {
            return TreeNode::leaf(prediction);
        }

        let best = match self
            .strategy
            .evaluate_splits(candidates, rows, &self.labels)
        {
            Some(best) => best,
            None => return TreeNode::leaf(prediction),
        };

        let remaining = candidates
            .iter()
            .copied()
            .filter(|feature_idx| *feature_idx != best.feature_idx)
            .collect::<Vec<_>>();
        if remaining.len() == candidates.len() {
            warn!(
                feature_idx = best.feature_idx,
                "split strategy chose a feature outside of the candidates, stopping here"
            );
            return TreeNode::leaf(prediction);
        }

        let (left, right) = rows.split(best.feature_idx, best.threshold);
        let left = self.grow(&remaining, &left, &prediction);
        let right = self.grow(&remaining, &right, &prediction);

        TreeNode::Internal {
            feature_idx: best.feature_idx,
            split_value: best.threshold,
            impurity_decrease: best.gain,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl<F: Float, L: Label> Fit<F, L, Error> for DecisionTreeValidParams<F, L> {
    type Object = DecisionTree<F, L>;

    /// Fit a decision tree on the labeled rows of `dataset`
    fn fit(&self, dataset: &Matrix<F, L>) -> Result<Self::Object> {
        let labels = LabelPair::resolve(self.labels(), dataset)?;

        match self.feature_sampling() {
            FeatureSampling::All => TreeBuilder::new(labels, self.split_quality()).train(dataset),
            FeatureSampling::Sqrt => {
                let rng = ChaCha8Rng::seed_from_u64(self.seed());
                TreeBuilder::new(labels, RandomizedSplit::new(self.split_quality(), rng))
                    .train(dataset)
            }
        }
    }
}
