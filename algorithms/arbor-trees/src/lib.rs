//!
//! # Decision tree learning
//! `arbor-trees` provides pure Rust implementations of binary decision trees and random
//! forests.
//!
//! # The big picture
//!
//! A [decision tree](DecisionTree) is grown top-down: at every node a [`SplitStrategy`] picks
//! one feature and a threshold (the median of that feature among the rows reaching the node),
//! the rows are partitioned on it and both halves are grown recursively. A feature is used at
//! most once on every path from the root to a leaf.
//!
//! A [random forest](RandomForestClassifier) grows many trees, each on a random subsample of
//! the training rows and considering only a random subset of the features at every node, and
//! predicts by majority vote. The [`DistributedForestBuilder`] grows the trees as
//! independent jobs on a pool of workers and merges the trees they send back.
//!
//! # Current state
//!
//! Only binary classification is supported: a training set carries exactly two labels.
//!

mod decision_trees;
#[cfg(feature = "serde")]
mod error;

// Re-export all core decision tree functionality
pub use decision_trees::*;

#[cfg(feature = "serde")]
pub use error::DistributedError;

// Re-export the common Result alias for convenience
pub use arbor::error::Result;
