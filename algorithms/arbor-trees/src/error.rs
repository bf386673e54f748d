//! Error types of distributed forest training
//!
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DistributedError>;

#[derive(Error, Debug)]
pub enum DistributedError {
    #[error(transparent)]
    BaseCrate(#[from] arbor::Error),
    #[error("failed to transfer a tree: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("none of the {requested} tree growing jobs delivered a tree")]
    NoTreesGrown { requested: usize },
}
