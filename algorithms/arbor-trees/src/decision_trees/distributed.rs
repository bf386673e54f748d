//! Random forests grown by a pool of workers
//!
//! Every tree of a forest is an independent job. The jobs are handed to a dedicated thread pool,
//! each worker grows its tree and sends it back serialized, the way it would cross a process
//! boundary, and the coordinator merges whatever arrives into one forest.
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use serde_crate::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument, warn};

use super::random_forest::check_forest;
use super::{
    DecisionTree, LabelPair, RandomForestClassifier, RandomForestParams, RandomForestValidParams,
    TreeJob,
};
use crate::error::{DistributedError, Result};
use arbor::{error::Error, traits::Fit, Float, Label, Matrix, ParamGuard};

/// Checked parameters of a [`DistributedForestBuilder`]
#[derive(Clone, Debug, PartialEq)]
pub struct DistributedForestValidParams<F, L> {
    forest: RandomForestValidParams<F, L>,
    n_workers: usize,
    deadline: Option<Duration>,
}

impl<F: Float, L: Label> DistributedForestValidParams<F, L> {
    pub fn forest(&self) -> &RandomForestValidParams<F, L> {
        &self.forest
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

/// Grows the trees of a random forest in parallel
///
/// The forest parameters, including the master seed, are the same as for sequential training
/// and a complete run produces the same forest. Trees are ordered by job, not by the order in
/// which the workers finish.
///
/// With a `deadline`, jobs still running when it passes are abandoned and the forest is
/// returned with the trees grown so far. Jobs that fail are skipped as well. Only when no tree
/// at all arrives does training fail, with [`DistributedError::NoTreesGrown`].
///
/// ### Example
///
/// ```rust
/// use std::time::Duration;
///
/// use arbor::prelude::*;
/// use arbor_trees::{DistributedForestBuilder, RandomForestClassifier};
///
/// let train = Matrix::from_rows((0..30).map(|i| {
///     let x = i as f64;
///     Row::new(vec![x, (x * 3.0) % 7.0], i >= 15)
/// })).unwrap();
///
/// let forest = DistributedForestBuilder::new(RandomForestClassifier::params().n_trees(4))
///     .n_workers(2)
///     .deadline(Some(Duration::from_secs(60)))
///     .fit(&train)
///     .unwrap();
///
/// assert_eq!(forest.ntrees(), 4);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DistributedForestBuilder<F, L>(DistributedForestValidParams<F, L>);

impl<F: Float, L: Label> DistributedForestBuilder<F, L> {
    /// Distribute the training of a forest with the given parameters
    ///
    /// Defaults are provided if the optional parameters are not specified:
    /// * `n_workers = 0`, as many workers as rayon picks for the machine
    /// * `deadline = None`
    pub fn new(forest: RandomForestParams<F, L>) -> Self {
        DistributedForestBuilder(DistributedForestValidParams {
            forest: forest.0,
            n_workers: 0,
            deadline: None,
        })
    }

    /// Sets the number of worker threads, zero picks rayon's default
    pub fn n_workers(mut self, n_workers: usize) -> Self {
        self.0.n_workers = n_workers;
        self
    }

    /// Sets the time after which unfinished jobs are abandoned
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.0.deadline = deadline;
        self
    }
}

impl<F: Float, L: Label> ParamGuard for DistributedForestBuilder<F, L> {
    type Checked = DistributedForestValidParams<F, L>;
    type Error = Error;

    fn check_ref(&self) -> std::result::Result<&Self::Checked, Error> {
        check_forest(&self.0.forest)?;
        Ok(&self.0)
    }

    fn check(self) -> std::result::Result<Self::Checked, Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Grow the tree of one job and encode it for the trip back to the coordinator
fn run_job<F, L>(
    params: &RandomForestValidParams<F, L>,
    job: &TreeJob,
    dataset: &Matrix<F, L>,
    labels: &LabelPair<L>,
) -> Result<String>
where
    F: Float + Serialize,
    L: Label + Serialize,
{
    let tree = params.grow_tree(job, dataset, labels)?;

    Ok(serde_json::to_string(&tree)?)
}

impl<F, L> Fit<F, L, DistributedError> for DistributedForestValidParams<F, L>
where
    F: Float + Serialize + DeserializeOwned,
    L: Label + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    type Object = RandomForestClassifier<F, L>;

    #[instrument(skip_all, fields(n_trees = self.forest.n_trees(), n_workers = self.n_workers))]
    fn fit(&self, dataset: &Matrix<F, L>) -> Result<Self::Object> {
        let labels = Arc::new(self.forest.prepare(dataset)?);
        let jobs = self.forest.jobs();
        let requested = jobs.len();

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.n_workers)
            .thread_name(|idx| format!("arbor-worker-{}", idx))
            .build()?;
        info!(
            workers = pool.current_num_threads(),
            nsamples = dataset.nsamples(),
            "dispatching tree growing jobs"
        );

        let dataset = Arc::new(dataset.clone());
        let params = Arc::new(self.forest.clone());
        let (sender, receiver) = mpsc::channel();

        for job in jobs {
            let (dataset, params, labels) =
                (Arc::clone(&dataset), Arc::clone(&params), Arc::clone(&labels));
            let sender = sender.clone();

            pool.spawn(move || {
                let outcome = run_job(&params, &job, &dataset, &labels);
                // the coordinator is gone once its deadline passed
                let _ = sender.send((job.job_id, outcome));
            });
        }
        drop(sender);

        let deadline = self.deadline.map(|deadline| Instant::now() + deadline);
        let mut messages = Vec::with_capacity(requested);

        while messages.len() < requested {
            let message = match deadline {
                Some(deadline) => {
                    match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => {
                            warn!(
                                missing = requested - messages.len(),
                                "deadline passed, abandoning unfinished jobs"
                            );
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match receiver.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            messages.push(message);
        }

        merge_trees(requested, messages)
    }
}

/// Merge the outcomes of tree growing jobs into a forest
///
/// Failed jobs are skipped and missing jobs are ignored, the trees which did arrive are decoded
/// and ordered by job id.
fn merge_trees<F, L>(
    requested: usize,
    messages: Vec<(usize, Result<String>)>,
) -> Result<RandomForestClassifier<F, L>>
where
    F: Float + DeserializeOwned,
    L: Label + DeserializeOwned,
{
    let mut encoded = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            (job_id, Ok(tree)) => {
                debug!(job_id, bytes = tree.len(), "received tree");
                encoded.push((job_id, tree));
            }
            (job_id, Err(err)) => warn!(job_id, error = %err, "tree growing job failed"),
        }
    }

    encoded.sort_by_key(|(job_id, _)| *job_id);
    let trees = encoded
        .iter()
        .map(|(_, tree)| serde_json::from_str::<DecisionTree<F, L>>(tree))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if trees.is_empty() {
        return Err(DistributedError::NoTreesGrown { requested });
    }
    if trees.len() < requested {
        warn!(
            grown = trees.len(),
            requested, "returning a forest with fewer trees than requested"
        );
    }

    info!(ntrees = trees.len(), "merged distributed forest");
    Ok(RandomForestClassifier::from_trees(trees)?)
}
