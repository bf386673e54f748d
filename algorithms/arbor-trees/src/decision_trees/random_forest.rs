//! Random forests
//!
#[cfg(feature = "serde")]
use std::convert::TryFrom;
use std::marker::PhantomData;

use ndarray::ArrayView1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use super::hyperparams::check_labels;
use super::{DecisionTree, LabelPair, RandomizedSplit, SplitQuality, TreeBuilder};
use arbor::{
    error::{Error, Result},
    traits::*,
    Float, Label, Matrix, ParamGuard,
};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// One independent unit of forest training
///
/// A job carries everything needed to grow its tree apart from the training rows and the label
/// pair, so jobs can be grown in any order, or on any worker, with the same outcome.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeJob {
    /// Position of the tree in the forest
    pub job_id: usize,
    /// Seed of the row subsample and of the feature sampling
    pub seed: u64,
}

/// The set of hyperparameters that can be specified for fitting a
/// [random forest](struct.RandomForestClassifier.html).
///
/// ### Example
///
/// ```rust
/// use arbor::prelude::*;
/// use arbor_trees::RandomForestClassifier;
///
/// let train = Matrix::from_rows((0..40).map(|i| {
///     let x = i as f64;
///     Row::new(vec![x, (x * 7.0) % 5.0, (x * 3.0) % 11.0, 1.0], if i < 20 { "DOWN" } else { "UP" })
/// })).unwrap();
///
/// let forest = RandomForestClassifier::params()
///     .n_trees(9)
///     .subsample(0.66)
///     .seed(7)
///     .fit(&train)
///     .unwrap();
///
/// assert_eq!(forest.ntrees(), 9);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForestValidParams<F, L> {
    n_trees: usize,
    subsample: f64,
    split_quality: SplitQuality,
    labels: Option<(L, L)>,
    seed: u64,

    float_marker: PhantomData<F>,
}

impl<F: Float, L: Label> RandomForestValidParams<F, L> {
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    pub fn subsample(&self) -> f64 {
        self.subsample
    }

    pub fn split_quality(&self) -> SplitQuality {
        self.split_quality
    }

    pub fn labels(&self) -> Option<&(L, L)> {
        self.labels.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of rows drawn for every tree out of `nsamples` training rows
    pub fn sample_size(&self, nsamples: usize) -> usize {
        ((nsamples as f64) * self.subsample).floor() as usize
    }

    /// Derive one job per tree from the master seed
    pub fn jobs(&self) -> Vec<TreeJob> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        (0..self.n_trees)
            .map(|job_id| TreeJob {
                job_id,
                seed: rng.gen(),
            })
            .collect()
    }

    /// Check that trees can be grown on `dataset` and determine its label pair
    pub fn prepare(&self, dataset: &Matrix<F, L>) -> Result<LabelPair<L>> {
        let labels = LabelPair::resolve(self.labels(), dataset)?;

        if self.sample_size(dataset.nsamples()) == 0 {
            return Err(Error::Parameters(format!(
                "a subsample of {} of {} rows leaves no row to grow a tree on",
                self.subsample,
                dataset.nsamples()
            )));
        }

        Ok(labels)
    }

    /// Grow the tree of a single job
    ///
    /// The rows are permuted at random and the first [`sample_size`](Self::sample_size) of them
    /// are kept. At every node only a random subset of the unused features is considered.
    pub fn grow_tree(
        &self,
        job: &TreeJob,
        dataset: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Result<DecisionTree<F, L>> {
        let mut rng = ChaCha8Rng::seed_from_u64(job.seed);
        let sample = dataset.subsample(self.sample_size(dataset.nsamples()), &mut rng);

        let strategy =
            RandomizedSplit::new(self.split_quality, ChaCha8Rng::seed_from_u64(rng.gen()));
        let tree = TreeBuilder::new(labels.clone(), strategy).train(&sample)?;

        debug!(
            job_id = job.job_id,
            depth = tree.max_depth(),
            leaves = tree.num_leaves(),
            "grew tree"
        );

        Ok(tree)
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForestParams<F, L>(pub(crate) RandomForestValidParams<F, L>);

impl<F: Float, L: Label> RandomForestParams<F, L> {
    pub fn new() -> Self {
        Self(RandomForestValidParams {
            n_trees: 7,
            subsample: 0.66,
            split_quality: SplitQuality::Entropy,
            labels: None,
            seed: 42,
            float_marker: PhantomData,
        })
    }

    /// Sets the number of trees in the forest
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.0.n_trees = n_trees;
        self
    }

    /// Sets the fraction of the training rows each tree is grown on
    pub fn subsample(mut self, subsample: f64) -> Self {
        self.0.subsample = subsample;
        self
    }

    /// Sets the metric used to decide the feature on which to split a node
    pub fn split_quality(mut self, split_quality: SplitQuality) -> Self {
        self.0.split_quality = split_quality;
        self
    }

    /// Fixes the two labels of the forest
    pub fn labels(mut self, first: L, second: L) -> Self {
        self.0.labels = Some((first, second));
        self
    }

    /// Sets the master seed from which the seed of every tree is derived
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, L: Label> Default for RandomForestParams<F, L> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_forest<F, L: Label>(params: &RandomForestValidParams<F, L>) -> Result<()> {
    if params.n_trees < 1 {
        Err(Error::Parameters(format!(
            "Number of trees should be at least one, but was {}",
            params.n_trees
        )))
    } else if params.subsample > 1.0 || params.subsample <= 0.0 || params.subsample.is_nan() {
        Err(Error::Parameters(format!(
            "Subsample should be greater than zero and less than or equal to one, but was {}",
            params.subsample
        )))
    } else {
        check_labels(params.labels.as_ref())
    }
}

impl<F: Float, L: Label> ParamGuard for RandomForestParams<F, L> {
    type Checked = RandomForestValidParams<F, L>;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_forest(&self.0)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// A fitted random forest
///
/// The forest classifies a row by asking every tree and returning the label with the most
/// votes. When labels tie, the one voted for first, in tree order, wins.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", try_from = "ForestRecord<F, L>")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForestClassifier<F, L> {
    trees: Vec<DecisionTree<F, L>>,
}

/// A decoded forest that may still be empty
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct ForestRecord<F, L> {
    trees: Vec<DecisionTree<F, L>>,
}

#[cfg(feature = "serde")]
impl<F, L> TryFrom<ForestRecord<F, L>> for RandomForestClassifier<F, L> {
    type Error = Error;

    fn try_from(record: ForestRecord<F, L>) -> Result<Self> {
        RandomForestClassifier::from_trees(record.trees)
    }
}

impl<F, L> RandomForestClassifier<F, L> {
    /// Merge independently grown trees into a forest
    pub fn from_trees(trees: Vec<DecisionTree<F, L>>) -> Result<Self> {
        if trees.is_empty() {
            return Err(Error::Parameters(
                "a forest needs at least one tree".to_string(),
            ));
        }

        Ok(RandomForestClassifier { trees })
    }
}

impl<F: Float, L: Label> RandomForestClassifier<F, L> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `n_trees = 7`
    /// * `subsample = 0.66`
    /// * `split_quality = SplitQuality::Entropy`
    /// * `labels = None`
    /// * `seed = 42`
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> RandomForestParams<F, L> {
        RandomForestParams::new()
    }

    pub fn trees(&self) -> &[DecisionTree<F, L>] {
        &self.trees
    }

    pub fn ntrees(&self) -> usize {
        self.trees.len()
    }

    /// Count the votes of all trees for one observation
    ///
    /// Labels are returned in the order in which they were first voted for.
    pub fn votes(&self, x: ArrayView1<'_, F>) -> Vec<(L, usize)> {
        let mut votes: Vec<(L, usize)> = Vec::new();

        for tree in &self.trees {
            let label = tree.predict_features(x.view());
            match votes.iter_mut().find(|(voted, _)| *voted == label) {
                Some((_, count)) => *count += 1,
                None => votes.push((label, 1)),
            }
        }

        votes
    }
}

impl<F: Float, L: Label> Predictor<F, L> for RandomForestClassifier<F, L> {
    fn predict_features(&self, x: ArrayView1<'_, F>) -> L {
        let mut votes = self.votes(x);

        let mut best = 0;
        for (idx, (_, count)) in votes.iter().enumerate() {
            if *count > votes[best].1 {
                best = idx;
            }
        }

        // a forest holds at least one tree, so there is at least one vote
        votes.swap_remove(best).0
    }
}

impl<F: Float, L: Label> Fit<F, L, Error> for RandomForestValidParams<F, L> {
    type Object = RandomForestClassifier<F, L>;

    #[instrument(skip_all, fields(n_trees = self.n_trees, nsamples = dataset.nsamples()))]
    fn fit(&self, dataset: &Matrix<F, L>) -> Result<Self::Object> {
        let labels = self.prepare(dataset)?;
        info!(
            sample_size = self.sample_size(dataset.nsamples()),
            "growing random forest"
        );

        let trees = self
            .jobs()
            .iter()
            .map(|job| self.grow_tree(job, dataset, &labels))
            .collect::<Result<Vec<_>>>()?;

        info!(ntrees = trees.len(), "random forest grown");
        RandomForestClassifier::from_trees(trees)
    }
}
