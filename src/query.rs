//! Query engine: runs every query row against an index and packs the
//! answers into two parallel `rows x k` matrices.

use tracing::debug;

use crate::config::Effort;
use crate::error::{KnnError, Result};
use crate::index::NeighborIndex;
use crate::matrix::{Matrix, Scalar};
use crate::par::parallel_map_indexed;
use crate::types::{Neighbor, NO_NEIGHBOR};

/// Neighbor ids and distances, one row per query, ascending by distance.
/// Slots past the dataset size hold `NO_NEIGHBOR` / `f64::INFINITY`.
#[derive(Clone, Debug, PartialEq)]
pub struct KnnResult {
    pub indices: Matrix<i32>,
    pub distances: Matrix<f64>,
}

impl KnnResult {
    pub fn rows(&self) -> usize { self.indices.rows() }
    pub fn k(&self) -> usize { self.indices.cols() }

    /// Filled (index, distance) pairs of one query row.
    pub fn neighbors(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices
            .row(row)
            .iter()
            .zip(self.distances.row(row))
            .take_while(|(&i, _)| i != NO_NEIGHBOR)
            .map(|(&i, &d)| (i as usize, d))
    }

    /// FNV-1a over shape, ids and distance bits.
    pub fn fingerprint(&self) -> u64 {
        let mut h: u64 = 0xcbf29ce484222325;
        #[inline] fn h64(h: &mut u64, x: u64) { *h ^= x; *h = h.wrapping_mul(0x100000001b3); }
        h64(&mut h, self.rows() as u64);
        h64(&mut h, self.k() as u64);
        for &i in self.indices.as_slice() { h64(&mut h, i as u32 as u64); }
        for &d in self.distances.as_slice() { h64(&mut h, d.to_bits()); }
        h
    }

    fn allocate(rows: usize, k: usize) -> Result<Self> {
        Ok(Self {
            indices: Matrix::filled(rows, k, NO_NEIGHBOR)?,
            distances: Matrix::filled(rows, k, f64::INFINITY)?,
        })
    }

    fn write_row(&mut self, row: usize, hits: &[Neighbor]) {
        let ids = self.indices.row_mut(row);
        for (slot, h) in ids.iter_mut().zip(hits) { *slot = h.index as i32; }
        let ds = self.distances.row_mut(row);
        for (slot, h) in ds.iter_mut().zip(hits) { *slot = h.distance; }
    }
}

fn check_args<T: Scalar, I: NeighborIndex<T> + ?Sized>(
    index: &I,
    queries: &Matrix<T>,
    k: usize,
    effort: Effort,
) -> Result<()> {
    if k == 0 {
        return Err(KnnError::config("k must be at least 1"));
    }
    if effort == Effort::Checks(0) {
        return Err(KnnError::config("checks must be positive"));
    }
    let data = index.data();
    if queries.cols() != data.cols() {
        return Err(KnnError::config(format!(
            "query width {} does not match dataset width {}",
            queries.cols(),
            data.cols()
        )));
    }
    if data.rows() > i32::MAX as usize {
        return Err(KnnError::config("dataset too large for i32 neighbor ids"));
    }
    Ok(())
}

/// Run all queries in order on the calling thread.
pub fn search<T: Scalar, I: NeighborIndex<T> + ?Sized>(
    index: &I,
    queries: &Matrix<T>,
    k: usize,
    effort: Effort,
) -> Result<KnnResult> {
    check_args(index, queries, k, effort)?;
    let mut out = KnnResult::allocate(queries.rows(), k)?;
    for (r, q) in queries.rows_iter().enumerate() {
        let hits = index.knn(q, k, effort);
        out.write_row(r, &hits);
    }
    debug!(queries = queries.rows(), k, %effort, "search finished");
    Ok(out)
}

/// Same result as [`search`], with query rows spread over `threads` workers.
pub fn search_parallel<T: Scalar, I: NeighborIndex<T> + ?Sized>(
    index: &I,
    queries: &Matrix<T>,
    k: usize,
    effort: Effort,
    threads: usize,
) -> Result<KnnResult> {
    check_args(index, queries, k, effort)?;
    let mut out = KnnResult::allocate(queries.rows(), k)?;
    let rows = parallel_map_indexed(queries.rows(), threads, |r| index.knn(queries.row(r), k, effort));
    for (r, hits) in rows.iter().enumerate() {
        out.write_row(r, hits);
    }
    debug!(queries = queries.rows(), k, %effort, threads, "parallel search finished");
    Ok(out)
}
