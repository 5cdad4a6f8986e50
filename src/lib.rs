//! tiny_knn — deterministic exact k-nearest-neighbor search over raw
//! fixed-width records (flattened tiny images, GIST descriptors).
//!
//! Modules:
//! - `codec`: raw bytes to a typed row-major matrix.
//! - `matrix`: owned Matrix<T> and the Scalar sample trait.
//! - `metric`: squared L2 distance.
//! - `types`: Neighbor, TopK, stable_top_k.
//! - `seed`: SplitMix64 and seeded query sampling.
//! - `linear`: LinearIndex (exhaustive scan).
//! - `kdtree`: TreeIndex (randomized kd-forest, checks budget).
//! - `index`: NeighborIndex trait and IndexHandle strategy selection.
//! - `query`: search / search_parallel into KnnResult matrices.
//! - `eval`: recall@k and Wilson lower bound.
//! - `persist`: save/load result directories, JSON dump.

pub mod error;
pub mod config;
pub mod matrix;
pub mod codec;
pub mod metric;
pub mod types;
pub mod seed;
pub mod linear;
pub mod kdtree;
pub mod index;
pub mod par;
pub mod query;
pub mod eval;
pub mod header;
pub mod persist;

pub use error::{KnnError, Result};
pub use config::{Effort, KnnConfig, RecordGeometry, Strategy, TreeParams, GIST_DIMS, TINY_IMAGE};
pub use matrix::{Matrix, Scalar};
pub use codec::{decode, decode_f32_le, RecordFormat};
pub use metric::Metric;
pub use types::{Neighbor, TopK, stable_top_k, NO_NEIGHBOR};
pub use linear::LinearIndex;
pub use kdtree::TreeIndex;
pub use index::{IndexHandle, NeighborIndex};
pub use query::{search, search_parallel, KnnResult};
pub use header::ResultHeader;
