use arbor::{
    error::{Error, Result},
    Float, Label, Matrix,
};
use rand::{seq::SliceRandom, Rng};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::SplitQuality;

/// The two class labels a binary tree distinguishes
///
/// Impurity is computed from the number of rows carrying the `first` label; every other row is
/// counted towards the `second` one.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct LabelPair<L> {
    first: L,
    second: L,
}

impl<L: Label> LabelPair<L> {
    pub fn new(first: L, second: L) -> Self {
        LabelPair { first, second }
    }

    /// Determine the label pair of a training set
    ///
    /// With `explicit` labels every row must carry one of them, otherwise the labels are taken
    /// from the matrix in order of first appearance. A matrix with a single label pairs it with
    /// itself.
    pub fn resolve<F: Float>(explicit: Option<&(L, L)>, matrix: &Matrix<F, L>) -> Result<Self> {
        if matrix.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        if let Some((first, second)) = explicit {
            let pair = LabelPair::new(first.clone(), second.clone());
            if matrix.rows().iter().any(|row| !pair.contains(row.label())) {
                return Err(Error::UnknownLabel);
            }
            return Ok(pair);
        }

        let labels = matrix.labels();
        match labels.as_slice() {
            [only] => Ok(LabelPair::new(only.clone(), only.clone())),
            [first, second] => Ok(LabelPair::new(first.clone(), second.clone())),
            _ => Err(Error::TooManyLabels(labels.len())),
        }
    }

    pub fn first(&self) -> &L {
        &self.first
    }

    pub fn second(&self) -> &L {
        &self.second
    }

    pub fn contains(&self, label: &L) -> bool {
        label == &self.first || label == &self.second
    }

    /// Count the rows of the first label and all remaining rows
    pub fn count<F: Float>(&self, matrix: &Matrix<F, L>) -> (usize, usize) {
        let n_first = matrix
            .rows()
            .iter()
            .filter(|row| row.label() == &self.first)
            .count();

        (n_first, matrix.nsamples() - n_first)
    }
}

/// A feature and the threshold partitioning a node on it
///
/// Rows with `value < threshold` descend to the left child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Split<F> {
    pub feature_idx: usize,
    pub threshold: F,
    /// Impurity decrease achieved on the rows it was chosen for
    pub gain: F,
}

/// Chooses the split of a node
///
/// A strategy is handed the features still available on the current path and the rows reaching
/// the node. It returns `None` when there is nothing to choose from. The returned feature is
/// always one of the `candidates`.
pub trait SplitStrategy<F: Float, L: Label> {
    fn evaluate_splits(
        &mut self,
        candidates: &[usize],
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Option<Split<F>>;
}

impl<F: Float, L: Label, S: SplitStrategy<F, L> + ?Sized> SplitStrategy<F, L> for Box<S> {
    fn evaluate_splits(
        &mut self,
        candidates: &[usize],
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Option<Split<F>> {
        (**self).evaluate_splits(candidates, data, labels)
    }
}

/// Entropy of a binary label distribution, in nats
///
/// Absent labels contribute nothing, so a pure or empty node has zero entropy.
pub fn entropy<F: Float>(n_first: usize, n_second: usize) -> F {
    let total = n_first + n_second;
    if total == 0 {
        return F::zero();
    }

    [n_first, n_second]
        .iter()
        .map(|n| F::cast(*n) / F::cast(total))
        .map(|p| if p > F::zero() { -p * p.ln() } else { F::zero() })
        .sum()
}

/// Gini impurity of a binary label distribution
pub fn gini_impurity<F: Float>(n_first: usize, n_second: usize) -> F {
    let total = n_first + n_second;
    if total == 0 {
        return F::zero();
    }

    let squared = [n_first, n_second]
        .iter()
        .map(|n| F::cast(*n) / F::cast(total))
        .map(|p| p * p)
        .sum::<F>();

    F::one() - squared
}

impl SplitQuality {
    /// Impurity of a node with the given label counts
    pub fn impurity<F: Float>(&self, n_first: usize, n_second: usize) -> F {
        match self {
            SplitQuality::Entropy => entropy(n_first, n_second),
            SplitQuality::Gini => gini_impurity(n_first, n_second),
        }
    }

    /// Impurity of `data` minus the size-weighted impurity of both sides of the split
    ///
    /// For entropy this is the information gain of the split.
    pub fn impurity_decrease<F: Float, L: Label>(
        &self,
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
        feature_idx: usize,
        threshold: F,
    ) -> F {
        if data.is_empty() {
            return F::zero();
        }

        let total = F::cast(data.nsamples());
        let weighted = |part: &Matrix<F, L>| {
            let (n_first, n_second) = labels.count(part);
            F::cast(part.nsamples()) / total * self.impurity::<F>(n_first, n_second)
        };

        let (left, right) = data.split(feature_idx, threshold);
        weighted(data) - (weighted(&left) + weighted(&right))
    }
}

/// Scan every candidate at its median and keep the largest impurity decrease
///
/// The first candidate is the fallback when no split decreases the impurity, and only a strictly
/// larger decrease replaces the current best, so earlier candidates win ties.
impl<F: Float, L: Label> SplitStrategy<F, L> for SplitQuality {
    fn evaluate_splits(
        &mut self,
        candidates: &[usize],
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Option<Split<F>> {
        let first = *candidates.first()?;
        let mut best = Split {
            feature_idx: first,
            threshold: data.median(first)?,
            gain: F::zero(),
        };

        for &feature_idx in candidates {
            let threshold = data.median(feature_idx)?;
            let gain = self.impurity_decrease(data, labels, feature_idx, threshold);

            if gain > best.gain {
                best = Split {
                    feature_idx,
                    threshold,
                    gain,
                };
            }
        }

        Some(best)
    }
}

/// Chooses the split with the largest information gain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InformationGain;

impl<F: Float, L: Label> SplitStrategy<F, L> for InformationGain {
    fn evaluate_splits(
        &mut self,
        candidates: &[usize],
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Option<Split<F>> {
        SplitQuality::Entropy.evaluate_splits(candidates, data, labels)
    }
}

/// Chooses the split with the largest decrease of Gini impurity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GiniImpurity;

impl<F: Float, L: Label> SplitStrategy<F, L> for GiniImpurity {
    fn evaluate_splits(
        &mut self,
        candidates: &[usize],
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Option<Split<F>> {
        SplitQuality::Gini.evaluate_splits(candidates, data, labels)
    }
}

/// Restricts another strategy to a random subset of the candidates
///
/// At every node `floor(sqrt(n))` of the `n` candidates are drawn without replacement and
/// handed to the inner strategy. This decorrelates the trees of a random forest.
#[derive(Clone, Debug)]
pub struct RandomizedSplit<S, R = ChaCha8Rng> {
    inner: S,
    rng: R,
}

/// Information gain evaluated on a random subset of the candidates
pub type RandomizedInformationGain<R = ChaCha8Rng> = RandomizedSplit<InformationGain, R>;

impl<S, R: Rng> RandomizedSplit<S, R> {
    pub fn new(inner: S, rng: R) -> Self {
        RandomizedSplit { inner, rng }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<F: Float, L: Label, S: SplitStrategy<F, L>, R: Rng> SplitStrategy<F, L>
    for RandomizedSplit<S, R>
{
    fn evaluate_splits(
        &mut self,
        candidates: &[usize],
        data: &Matrix<F, L>,
        labels: &LabelPair<L>,
    ) -> Option<Split<F>> {
        let n = (candidates.len() as f64).sqrt().floor() as usize;

        let mut subset = candidates.to_vec();
        subset.shuffle(&mut self.rng);
        subset.truncate(n);

        self.inner.evaluate_splits(&subset, data, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use arbor::Row;
    use rand::SeedableRng;

    fn four_rows() -> Matrix<f64, &'static str> {
        Matrix::from_rows(vec![
            Row::new(vec![1.0, 7.0], "A"),
            Row::new(vec![2.0, 5.0], "A"),
            Row::new(vec![3.0, 6.0], "B"),
            Row::new(vec![4.0, 8.0], "B"),
        ])
        .unwrap()
    }

    #[test]
    fn entropy_of_pure_node_is_zero() {
        assert_abs_diff_eq!(entropy::<f64>(5, 0), 0.0);
        assert_abs_diff_eq!(entropy::<f64>(0, 3), 0.0);
        assert_abs_diff_eq!(entropy::<f64>(0, 0), 0.0);
        assert!(!entropy::<f32>(4, 0).is_nan());

        assert_abs_diff_eq!(entropy::<f64>(2, 2), std::f64::consts::LN_2, epsilon = 1e-12);
    }

    #[test]
    fn gini_of_balanced_node() {
        assert_abs_diff_eq!(gini_impurity::<f64>(2, 2), 0.5);
        assert_abs_diff_eq!(gini_impurity::<f64>(3, 0), 0.0);
        assert_abs_diff_eq!(gini_impurity::<f64>(1, 3), 0.375);
    }

    #[test]
    fn information_gain_picks_separating_feature() {
        let data = four_rows();
        let labels = LabelPair::new("A", "B");

        let split = InformationGain
            .evaluate_splits(&[1, 0], &data, &labels)
            .unwrap();

        assert_eq!(split.feature_idx, 0);
        assert_abs_diff_eq!(split.threshold, 2.5);
        // a perfect split removes all entropy
        assert_abs_diff_eq!(split.gain, std::f64::consts::LN_2, epsilon = 1e-12);
    }

    #[test]
    fn first_candidate_is_the_fallback() {
        // no feature separates the labels
        let data = Matrix::from_rows(vec![
            Row::new(vec![1.0, 1.0], "A"),
            Row::new(vec![1.0, 1.0], "B"),
        ])
        .unwrap();
        let labels = LabelPair::new("A", "B");

        let split = InformationGain
            .evaluate_splits(&[1, 0], &data, &labels)
            .unwrap();
        assert_eq!(split.feature_idx, 1);
        assert_abs_diff_eq!(split.threshold, 1.0);
        assert_abs_diff_eq!(split.gain, 0.0);
    }

    #[test]
    fn nothing_to_choose_from() {
        let labels = LabelPair::new("A", "B");

        assert_eq!(
            InformationGain.evaluate_splits(&[], &four_rows(), &labels),
            None
        );
        assert_eq!(
            GiniImpurity.evaluate_splits(&[0], &Matrix::<f64, &str>::new(), &labels),
            None
        );
    }

    #[test]
    fn gain_is_never_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let data = Matrix::from_rows((0..40).map(|_| {
            let features = (0..5).map(|_| rng.gen_range(0.0..1.0)).collect::<Vec<f64>>();
            let label = if rng.gen_bool(0.4) { "A" } else { "B" };
            Row::new(features, label)
        }))
        .unwrap();
        let labels = LabelPair::resolve(None, &data).unwrap();

        for quality in &mut [SplitQuality::Entropy, SplitQuality::Gini] {
            let split = quality
                .evaluate_splits(&[0, 1, 2, 3, 4], &data, &labels)
                .unwrap();
            assert!(split.gain >= 0.0);
            assert_abs_diff_eq!(
                split.gain,
                quality.impurity_decrease(&data, &labels, split.feature_idx, split.threshold),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn gini_agrees_on_perfect_split() {
        let labels = LabelPair::new("A", "B");
        let split = GiniImpurity
            .evaluate_splits(&[1, 0], &four_rows(), &labels)
            .unwrap();

        assert_eq!(split.feature_idx, 0);
        assert_abs_diff_eq!(split.gain, 0.5);
    }

    #[test]
    fn randomized_draws_sqrt_of_candidates() {
        struct Recorder(Vec<Vec<usize>>);

        impl SplitStrategy<f64, &'static str> for Recorder {
            fn evaluate_splits(
                &mut self,
                candidates: &[usize],
                _: &Matrix<f64, &'static str>,
                _: &LabelPair<&'static str>,
            ) -> Option<Split<f64>> {
                self.0.push(candidates.to_vec());
                None
            }
        }

        let labels = LabelPair::new("A", "B");
        let mut strategy = RandomizedSplit::new(Recorder(Vec::new()), ChaCha8Rng::seed_from_u64(1));

        let candidates = (0..10).collect::<Vec<_>>();
        strategy.evaluate_splits(&candidates, &four_rows(), &labels);
        strategy.evaluate_splits(&candidates[..3], &four_rows(), &labels);
        strategy.evaluate_splits(&[], &four_rows(), &labels);

        let drawn = &strategy.inner().0;
        assert_eq!(drawn[0].len(), 3);
        assert!(drawn[0].iter().all(|f| candidates.contains(f)));
        assert_eq!(drawn[1].len(), 1);
        assert!(drawn[2].is_empty());
    }

    #[test]
    fn randomized_is_reproducible() {
        let data = four_rows();
        let labels = LabelPair::new("A", "B");
        let candidates = [0, 1, 0, 1];

        let mut a = RandomizedInformationGain::new(InformationGain, ChaCha8Rng::seed_from_u64(9));
        let mut b = RandomizedInformationGain::new(InformationGain, ChaCha8Rng::seed_from_u64(9));
        for _ in 0..5 {
            assert_eq!(
                a.evaluate_splits(&candidates, &data, &labels),
                b.evaluate_splits(&candidates, &data, &labels)
            );
        }
    }

    #[test]
    fn resolve_labels() {
        let data = four_rows();
        assert_eq!(
            LabelPair::resolve(None, &data).unwrap(),
            LabelPair::new("A", "B")
        );
        assert_eq!(
            LabelPair::resolve(Some(&("B", "A")), &data).unwrap(),
            LabelPair::new("B", "A")
        );
        assert_eq!(
            LabelPair::resolve(Some(&("A", "C")), &data).unwrap_err(),
            Error::UnknownLabel
        );
        assert_eq!(
            LabelPair::resolve(None, &Matrix::<f64, &str>::new()).unwrap_err(),
            Error::EmptyTrainingSet
        );

        let mut three = data;
        three.add_row(Row::new(vec![0.0, 0.0], "C")).unwrap();
        assert_eq!(
            LabelPair::resolve(None, &three).unwrap_err(),
            Error::TooManyLabels(3)
        );
    }

    #[test]
    fn count_treats_foreign_labels_as_second() {
        let data = four_rows();
        assert_eq!(LabelPair::new("A", "X").count(&data), (2, 2));
        assert_eq!(LabelPair::new("B", "A").count(&data), (2, 2));
        assert_eq!(LabelPair::new("Z", "A").count(&data), (0, 4));
    }
}
