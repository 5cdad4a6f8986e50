use tracing::debug;

use crate::config::{Effort, KnnConfig, Strategy, TreeParams};
use crate::error::{KnnError, Result};
use crate::kdtree::TreeIndex;
use crate::linear::LinearIndex;
use crate::matrix::{Matrix, Scalar};
use crate::metric::Metric;
use crate::types::Neighbor;

/// Capability shared by every search strategy.
pub trait NeighborIndex<T: Scalar>: Sync {
    /// Dataset the index was built over.
    fn data(&self) -> &Matrix<T>;
    /// Up to `k` nearest rows to `q`, ascending by (distance, index).
    fn knn(&self, q: &[T], k: usize, effort: Effort) -> Vec<Neighbor>;
}

impl<T: Scalar> NeighborIndex<T> for LinearIndex<'_, T> {
    fn data(&self) -> &Matrix<T> { LinearIndex::data(self) }
    fn knn(&self, q: &[T], k: usize, effort: Effort) -> Vec<Neighbor> {
        LinearIndex::search(self, q, k, effort)
    }
}

impl<T: Scalar> NeighborIndex<T> for TreeIndex<'_, T> {
    fn data(&self) -> &Matrix<T> { TreeIndex::data(self) }
    fn knn(&self, q: &[T], k: usize, effort: Effort) -> Vec<Neighbor> {
        TreeIndex::search(self, q, k, effort)
    }
}

/// An index built under the strategy chosen at construction time.
/// Borrows the dataset, which must outlive it.
pub enum IndexHandle<'a, T> {
    Linear(LinearIndex<'a, T>),
    Tree(TreeIndex<'a, T>),
}

impl<'a, T: Scalar> IndexHandle<'a, T> {
    pub fn build(data: &'a Matrix<T>, strategy: Strategy, tree: TreeParams) -> Result<Self> {
        if data.is_empty() {
            return Err(KnnError::config("cannot build an index over an empty dataset"));
        }
        debug!(?strategy, rows = data.rows(), cols = data.cols(), "building index");
        match strategy {
            Strategy::Linear => Ok(IndexHandle::Linear(LinearIndex::new(data, Metric::SquaredL2))),
            Strategy::Tree => TreeIndex::build(data, Metric::SquaredL2, tree).map(IndexHandle::Tree),
        }
    }

    /// Build from a full run configuration, checking the record width too.
    pub fn from_config(data: &'a Matrix<T>, cfg: &KnnConfig) -> Result<Self> {
        cfg.validate()?;
        if data.cols() != cfg.record_width {
            return Err(KnnError::config(format!(
                "dataset has {} columns, config expects {}",
                data.cols(),
                cfg.record_width
            )));
        }
        Self::build(data, cfg.strategy, cfg.tree)
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            IndexHandle::Linear(_) => Strategy::Linear,
            IndexHandle::Tree(_) => Strategy::Tree,
        }
    }
}

impl<T: Scalar> NeighborIndex<T> for IndexHandle<'_, T> {
    fn data(&self) -> &Matrix<T> {
        match self {
            IndexHandle::Linear(i) => i.data(),
            IndexHandle::Tree(i) => i.data(),
        }
    }

    fn knn(&self, q: &[T], k: usize, effort: Effort) -> Vec<Neighbor> {
        match self {
            IndexHandle::Linear(i) => i.search(q, k, effort),
            IndexHandle::Tree(i) => i.search(q, k, effort),
        }
    }
}
