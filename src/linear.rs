use crate::config::Effort;
use crate::matrix::{Matrix, Scalar};
use crate::metric::Metric;
use crate::types::{Neighbor, TopK};

/// Exact exhaustive scan over a borrowed dataset.
#[derive(Clone, Copy, Debug)]
pub struct LinearIndex<'a, T> {
    metric: Metric,
    data: &'a Matrix<T>,
}

impl<'a, T: Scalar> LinearIndex<'a, T> {
    pub fn new(data: &'a Matrix<T>, metric: Metric) -> Self {
        Self { metric, data }
    }

    pub fn len(&self) -> usize { self.data.rows() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
    pub fn dim(&self) -> usize { self.data.cols() }
    pub fn data(&self) -> &'a Matrix<T> { self.data }

    /// Effort is ignored; every row is scored.
    pub fn search(&self, q: &[T], k: usize, _effort: Effort) -> Vec<Neighbor> {
        debug_assert_eq!(q.len(), self.dim());
        let mut top = TopK::new(k);
        for (i, row) in self.data.rows_iter().enumerate() {
            let d = self.metric.distance(q, row);
            top.push(Neighbor { index: i, distance: d });
        }
        top.into_sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::stable_top_k;

    #[test]
    fn scan_matches_full_sort() {
        let m = Matrix::from_vec(vec![0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0, 5.0, 5.0], 2).unwrap();
        let idx = LinearIndex::new(&m, Metric::SquaredL2);
        let hits = idx.search(&[0.0, 0.0], 4, Effort::Unbounded);
        let all: Vec<Neighbor> = (0..4)
            .map(|i| Neighbor { index: i, distance: Metric::SquaredL2.distance(&[0.0, 0.0], m.row(i)) })
            .collect();
        assert_eq!(hits, stable_top_k(all, 4));
        assert_eq!(hits[1], Neighbor { index: 1, distance: 1.0 });
        assert_eq!(hits[2], Neighbor { index: 2, distance: 1.0 });
    }

    #[test]
    fn k_larger_than_rows_returns_all() {
        let m = Matrix::from_vec(vec![1i32, 2, 3], 1).unwrap();
        let idx = LinearIndex::new(&m, Metric::SquaredL2);
        assert_eq!(idx.search(&[2], 10, Effort::Unbounded).len(), 3);
    }
}
