use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Float, Label, Matrix, Row};
use crate::error::{Error, Result};

impl<F: Float, L: Label> Matrix<F, L> {
    /// Create an empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matrix from an iterator of rows
    ///
    /// Fails with [`Error::ShapeMismatch`] if the rows differ in their number of features.
    pub fn from_rows<I: IntoIterator<Item = Row<F, L>>>(rows: I) -> Result<Self> {
        let mut matrix = Self::new();
        for row in rows {
            matrix.add_row(row)?;
        }

        Ok(matrix)
    }

    /// Create a matrix from a two-dimensional array of records and one label per record
    pub fn from_records<D, I>(records: &ArrayBase<D, Ix2>, labels: I) -> Result<Self>
    where
        D: Data<Elem = F>,
        I: IntoIterator<Item = L>,
    {
        let labels = labels.into_iter().collect::<Vec<_>>();
        if labels.len() != records.nrows() {
            return Err(Error::Parameters(format!(
                "{} labels given for {} records",
                labels.len(),
                records.nrows()
            )));
        }

        Self::from_rows(
            records
                .rows()
                .into_iter()
                .zip(labels.into_iter())
                .map(|(features, label)| Row::new(features.to_owned(), label)),
        )
    }

    /// Append a row to the matrix
    ///
    /// The row must have as many features as the rows already present, otherwise
    /// [`Error::ShapeMismatch`] is returned and the matrix is left untouched.
    pub fn add_row(&mut self, row: Row<F, L>) -> Result<()> {
        if let Some(expected) = self.rows.first().map(|first| first.num_features()) {
            if row.num_features() != expected {
                return Err(Error::ShapeMismatch {
                    expected,
                    got: row.num_features(),
                });
            }
        }
        self.rows.push(Arc::new(row));

        Ok(())
    }

    /// Return the number of rows
    pub fn nsamples(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return the number of features per row, zero for an empty matrix
    pub fn num_features(&self) -> usize {
        self.rows.first().map(|row| row.num_features()).unwrap_or(0)
    }

    pub fn get(&self, idx: usize) -> Option<&Row<F, L>> {
        self.rows.get(idx).map(|row| row.as_ref())
    }

    pub fn rows(&self) -> &[Arc<Row<F, L>>] {
        &self.rows
    }

    /// Returns true if all rows share the same label
    ///
    /// Empty matrices and matrices with a single row are pure.
    pub fn is_pure(&self) -> bool {
        match self.rows.split_first() {
            None => true,
            Some((first, rest)) => rest.iter().all(|row| row.label() == first.label()),
        }
    }

    /// Count the occurrences of each label
    ///
    /// Labels are returned in the order in which they first appear in the matrix.
    pub fn label_frequencies(&self) -> Vec<(L, usize)> {
        let mut position = HashMap::new();
        let mut frequencies: Vec<(L, usize)> = Vec::new();

        for row in &self.rows {
            let idx = *position.entry(row.label().clone()).or_insert_with(|| {
                frequencies.push((row.label().clone(), 0));
                frequencies.len() - 1
            });
            frequencies[idx].1 += 1;
        }

        frequencies
    }

    /// Return the distinct labels in order of first appearance
    pub fn labels(&self) -> Vec<L> {
        self.label_frequencies()
            .into_iter()
            .map(|(label, _)| label)
            .collect()
    }

    /// Return the label appearing most often, `None` for an empty matrix
    ///
    /// If several labels share the highest count, the one appearing first in the matrix wins.
    pub fn most_common_label(&self) -> Option<L> {
        self.label_frequencies()
            .into_iter()
            .fold(None, |best: Option<(L, usize)>, (label, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((label, count)),
            })
            .map(|(label, _)| label)
    }

    /// Project the values of one feature, preserving the row order
    ///
    /// ### Panics
    ///
    /// If `feature_idx` is out of bounds for a non-empty matrix
    pub fn feature_values(&self, feature_idx: usize) -> Array1<F> {
        self.rows
            .iter()
            .map(|row| row.feature(feature_idx))
            .collect()
    }

    /// Return the median of a feature, `None` for an empty matrix
    ///
    /// For an even number of rows this is the mean of the two central values.
    pub fn median(&self, feature_idx: usize) -> Option<F> {
        let mut values = self.feature_values(feature_idx).to_vec();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Greater));

        let middle = values.len() / 2;
        if values.len() % 2 == 1 {
            Some(values[middle])
        } else {
            Some((values[middle - 1] + values[middle]) / F::cast(2.0))
        }
    }

    /// Partition the rows on a feature threshold
    ///
    /// Rows with `feature < threshold` go to the left matrix, all others to the right one. The
    /// relative order of the rows is kept and either side may end up empty.
    pub fn split(&self, feature_idx: usize, threshold: F) -> (Self, Self) {
        let (left, right): (Vec<_>, Vec<_>) = self
            .rows
            .iter()
            .cloned()
            .partition(|row| row.feature(feature_idx) < threshold);

        (Matrix { rows: left }, Matrix { rows: right })
    }

    /// Collect the feature values into a dense array with one row per observation
    pub fn records(&self) -> Result<Array2<F>> {
        let flat = self
            .rows
            .iter()
            .flat_map(|row| row.features().to_vec())
            .collect::<Vec<_>>();

        Ok(Array2::from_shape_vec(
            (self.nsamples(), self.num_features()),
            flat,
        )?)
    }

    pub fn targets(&self) -> Vec<L> {
        self.rows.iter().map(|row| row.label().clone()).collect()
    }

    /// Return a matrix with the same rows in random order
    pub fn shuffle<R: Rng>(&self, rng: &mut R) -> Self {
        let mut rows = self.rows.clone();
        rows.shuffle(rng);

        Matrix { rows }
    }

    /// Draw `n` distinct rows at random
    ///
    /// The rows are permuted and the first `n` are kept, so this samples without replacement.
    /// If `n` exceeds the number of rows, all rows are returned in random order.
    pub fn subsample<R: Rng>(&self, n: usize, rng: &mut R) -> Self {
        let mut shuffled = self.shuffle(rng);
        shuffled.rows.truncate(n);

        shuffled
    }

    /// Split the matrix into two parts
    ///
    /// The first `floor(nsamples * ratio)` rows form the first matrix, the remaining rows the
    /// second one. Combine with [`shuffle`](Matrix::shuffle) to draw a random train/test split.
    pub fn split_with_ratio(&self, ratio: f32) -> (Self, Self) {
        let n = ((self.nsamples() as f32) * ratio).floor() as usize;
        let n = n.min(self.nsamples());

        let (first, second) = self.rows.split_at(n);
        (
            Matrix {
                rows: first.to_vec(),
            },
            Matrix {
                rows: second.to_vec(),
            },
        )
    }
}

impl<F: Float, L: Label> From<Row<F, L>> for Matrix<F, L> {
    fn from(row: Row<F, L>) -> Self {
        Matrix {
            rows: vec![Arc::new(row)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn single_feature(values: &[f64], labels: &[&'static str]) -> Matrix<f64, &'static str> {
        Matrix::from_rows(
            values
                .iter()
                .zip(labels.iter())
                .map(|(v, l)| Row::new(vec![*v], *l)),
        )
        .unwrap()
    }

    #[test]
    fn add_row_rejects_wrong_feature_count() {
        let mut matrix = Matrix::new();
        matrix.add_row(Row::new(vec![1.0, 2.0], "A")).unwrap();

        let err = matrix.add_row(Row::new(vec![1.0], "B")).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                expected: 2,
                got: 1
            }
        );
        assert_eq!(matrix.nsamples(), 1);
    }

    #[test]
    fn purity() {
        assert!(Matrix::<f64, &str>::new().is_pure());
        assert!(single_feature(&[1.0], &["A"]).is_pure());
        assert!(single_feature(&[1.0, 2.0, 3.0], &["A", "A", "A"]).is_pure());
        assert!(!single_feature(&[1.0, 2.0, 3.0], &["A", "A", "B"]).is_pure());
    }

    #[test]
    fn median_odd_and_even() {
        let odd = single_feature(&[3.0, 1.0, 2.0], &["A", "A", "B"]);
        assert_abs_diff_eq!(odd.median(0).unwrap(), 2.0);

        let even = single_feature(&[4.0, 1.0, 3.0, 2.0], &["A", "A", "B", "B"]);
        assert_abs_diff_eq!(even.median(0).unwrap(), 2.5);
        // sorting happens on a copy, a second call gives the same value
        assert_abs_diff_eq!(even.median(0).unwrap(), 2.5);
        assert_eq!(even.feature_values(0), array![4.0, 1.0, 3.0, 2.0]);

        assert_eq!(Matrix::<f64, &str>::new().median(0), None);
    }

    #[test]
    fn split_on_median_partitions_rows() {
        let matrix = single_feature(&[1.0, 2.0, 3.0, 4.0], &["A", "A", "B", "B"]);
        let median = matrix.median(0).unwrap();
        let (left, right) = matrix.split(0, median);

        assert_eq!(left.feature_values(0), array![1.0, 2.0]);
        assert_eq!(right.feature_values(0), array![3.0, 4.0]);
        assert_eq!(left.labels(), vec!["A"]);
        assert_eq!(right.labels(), vec!["B"]);

        // rows are shared with the parent, not copied
        assert!(Arc::ptr_eq(&left.rows()[0], &matrix.rows()[0]));
        assert!(Arc::ptr_eq(&right.rows()[1], &matrix.rows()[3]));
        assert_eq!(matrix.nsamples(), 4);
    }

    #[test]
    fn split_keeps_every_row_once() {
        let mut rng = SmallRng::seed_from_u64(7);
        let matrix = Matrix::from_rows((0..31).map(|i| {
            let x: f64 = rng.gen_range(-5.0..5.0);
            Row::new(vec![x, i as f64], if i % 3 == 0 { "A" } else { "B" })
        }))
        .unwrap();

        for feature in 0..2 {
            let (left, right) = matrix.split(feature, matrix.median(feature).unwrap());
            assert_eq!(left.nsamples() + right.nsamples(), matrix.nsamples());

            for row in matrix.rows() {
                let occurrences = left
                    .rows()
                    .iter()
                    .chain(right.rows().iter())
                    .filter(|other| Arc::ptr_eq(row, other))
                    .count();
                assert_eq!(occurrences, 1);
            }
        }
    }

    #[test]
    fn split_at_minimum_leaves_left_empty() {
        let matrix = single_feature(&[2.0, 2.0, 5.0], &["A", "B", "B"]);
        let (left, right) = matrix.split(0, 2.0);

        assert!(left.is_empty());
        assert_eq!(right.nsamples(), 3);
    }

    #[test]
    fn most_common_label() {
        let matrix = single_feature(&[1.0, 2.0, 3.0], &["B", "A", "A"]);
        assert_eq!(matrix.most_common_label(), Some("A"));
        assert_eq!(matrix.label_frequencies(), vec![("B", 1), ("A", 2)]);

        // ties go to the label seen first
        let tied = single_feature(&[1.0, 2.0, 3.0, 4.0], &["B", "A", "A", "B"]);
        assert_eq!(tied.most_common_label(), Some("B"));

        assert_eq!(Matrix::<f64, &str>::new().most_common_label(), None);
    }

    #[test]
    fn records_round_trip() {
        let records = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let matrix = Matrix::from_records(&records, vec![true, false, true]).unwrap();

        assert_eq!(matrix.num_features(), 2);
        assert_eq!(matrix.records().unwrap(), records);
        assert_eq!(matrix.targets(), vec![true, false, true]);

        assert!(Matrix::from_records(&records, vec![true]).is_err());
    }

    #[test]
    fn shuffle_and_split_with_ratio() {
        let matrix = Matrix::from_records(
            &Array2::from_shape_fn((10, 1), |(i, _)| i as f64),
            0..10usize,
        )
        .unwrap();

        let mut rng = SmallRng::seed_from_u64(42);
        let shuffled = matrix.shuffle(&mut rng);
        let mut seen = shuffled.targets();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        let (train, test) = shuffled.split_with_ratio(0.8);
        assert_eq!(train.nsamples(), 8);
        assert_eq!(test.nsamples(), 2);

        let sample = matrix.subsample(6, &mut rng);
        let mut drawn = sample.targets();
        drawn.sort_unstable();
        drawn.dedup();
        assert_eq!(drawn.len(), 6);
    }
}
