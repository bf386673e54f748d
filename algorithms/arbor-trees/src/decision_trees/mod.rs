mod algorithm;
#[cfg(feature = "serde")]
mod distributed;
mod hyperparams;
mod iter;
mod random_forest;
mod split;

pub use algorithm::*;
#[cfg(feature = "serde")]
pub use distributed::*;
pub use hyperparams::*;
pub use iter::*;
pub use random_forest::*;
pub use split::*;
