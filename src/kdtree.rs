//! Randomized kd-forest.
//!
//! Each tree shuffles the row order with its own seed, then recursively
//! splits on a dimension drawn at random from the few highest-variance
//! dimensions of a sample, cutting at the sample mean. Queries run a single
//! best-bin-first traversal over all trees, sharing one branch queue and one
//! visited set.
//!
//! Invariant relied on by the search: every point under a split's left child
//! has `x[dim] <= value` and every point under its right child has
//! `x[dim] >= value`. That makes `(q[dim] - value)^2` a lower bound for the
//! far side, so pruning on it never drops a true neighbor.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use tracing::debug;

use crate::config::{Effort, TreeParams};
use crate::error::{KnnError, Result};
use crate::matrix::{Matrix, Scalar};
use crate::metric::Metric;
use crate::seed::SplitMix64;
use crate::types::{Neighbor, TopK};

/// Points sampled per node to estimate mean and variance.
const SAMPLE_MEAN: usize = 100;
/// Split dimension is drawn from this many highest-variance candidates.
const RAND_DIM: usize = 5;

#[derive(Clone, Debug)]
enum Node {
    Leaf { start: usize, end: usize },
    Split { dim: usize, value: f64, left: usize, right: usize },
}

#[derive(Clone, Debug)]
struct KdTree {
    nodes: Vec<Node>,
    order: Vec<usize>, // row ids, leaves own contiguous ranges
    root: usize,
}

pub struct TreeIndex<'a, T> {
    metric: Metric,
    params: TreeParams,
    data: &'a Matrix<T>,
    trees: Vec<KdTree>,
}

impl<'a, T: Scalar> TreeIndex<'a, T> {
    pub fn build(data: &'a Matrix<T>, metric: Metric, params: TreeParams) -> Result<Self> {
        params.validate()?;
        if data.is_empty() {
            return Err(KnnError::config("cannot build a tree index over an empty dataset"));
        }
        let trees = (0..params.trees)
            .map(|t| {
                let mut rng = SplitMix64::new(params.seed ^ (t as u64).wrapping_mul(0x9E3779B97F4A7C15));
                build_tree(data, params.leaf_size, &mut rng)
            })
            .collect::<Vec<_>>();
        debug!(
            trees = trees.len(),
            nodes = trees.iter().map(|t| t.nodes.len()).sum::<usize>(),
            rows = data.rows(),
            "built kd-forest"
        );
        Ok(Self { metric, params, data, trees })
    }

    pub fn len(&self) -> usize { self.data.rows() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
    pub fn dim(&self) -> usize { self.data.cols() }
    pub fn data(&self) -> &'a Matrix<T> { self.data }
    pub fn params(&self) -> &TreeParams { &self.params }

    /// Best-bin-first search. With `Effort::Checks(n)` the traversal stops once
    /// `n` distinct points were scored and `k` results are held; with
    /// `Effort::Unbounded` it runs until no branch can beat the k-th result.
    pub fn search(&self, q: &[T], k: usize, effort: Effort) -> Vec<Neighbor> {
        debug_assert_eq!(q.len(), self.dim());
        let limit = effort.limit();
        let mut top = TopK::new(k);
        let mut visited = Visited::new(self.data.rows(), limit);
        let mut checks = 0usize;
        let mut branches: BinaryHeap<Reverse<Branch>> = BinaryHeap::new();

        for (t, tree) in self.trees.iter().enumerate() {
            branches.push(Reverse(Branch { bound: 0.0, tree: t, node: tree.root }));
        }

        let exhausted = |checks: usize, top: &TopK| matches!(limit, Some(max) if checks >= max && top.is_full());

        'outer: while let Some(Reverse(branch)) = branches.pop() {
            if branch.bound > top.worst_distance() {
                // queue is ordered by bound, nothing left can improve
                break;
            }
            if exhausted(checks, &top) {
                break;
            }
            let tree = &self.trees[branch.tree];
            let mut node = branch.node;
            loop {
                match tree.nodes[node] {
                    Node::Split { dim, value, left, right } => {
                        let diff = q[dim].to_f64() - value;
                        let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                        let far_bound = branch.bound.max(diff * diff);
                        if far_bound <= top.worst_distance() {
                            branches.push(Reverse(Branch { bound: far_bound, tree: branch.tree, node: far }));
                        }
                        node = near;
                    }
                    Node::Leaf { start, end } => {
                        for &id in &tree.order[start..end] {
                            if visited.contains(id) { continue; }
                            if exhausted(checks, &top) { break 'outer; }
                            visited.insert(id);
                            let d = self.metric.distance(q, self.data.row(id));
                            top.push(Neighbor { index: id, distance: d });
                            checks += 1;
                        }
                        break;
                    }
                }
            }
        }
        top.into_sorted()
    }
}

/// Rows already scored by the current query. A bounded search touches at
/// most about `checks` rows, so it keeps a hash set sized to that instead of
/// a per-row flag vector.
enum Visited {
    Dense(Vec<bool>),
    Sparse(HashSet<usize>),
}

impl Visited {
    fn new(rows: usize, limit: Option<usize>) -> Self {
        match limit {
            Some(max) if max < rows / 8 => Visited::Sparse(HashSet::with_capacity(max * 2)),
            _ => Visited::Dense(vec![false; rows]),
        }
    }

    #[inline]
    fn contains(&self, id: usize) -> bool {
        match self {
            Visited::Dense(v) => v[id],
            Visited::Sparse(s) => s.contains(&id),
        }
    }

    #[inline]
    fn insert(&mut self, id: usize) {
        match self {
            Visited::Dense(v) => v[id] = true,
            Visited::Sparse(s) => { s.insert(id); }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Branch {
    bound: f64,
    tree: usize,
    node: usize,
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}
impl Eq for Branch {}
impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then(self.tree.cmp(&other.tree))
            .then(self.node.cmp(&other.node))
    }
}

fn build_tree<T: Scalar>(data: &Matrix<T>, leaf_size: usize, rng: &mut SplitMix64) -> KdTree {
    let mut order: Vec<usize> = (0..data.rows()).collect();
    rng.shuffle(&mut order);
    let mut nodes = Vec::new();
    let mut scratch = SplitScratch::new(data.cols());
    let root = divide(data, &mut order, 0, leaf_size, rng, &mut scratch, &mut nodes);
    KdTree { nodes, order, root }
}

/// Per-dimension buffers reused by every node of one tree build.
struct SplitScratch {
    mean: Vec<f64>,
    var: Vec<f64>,
    dims: Vec<usize>,
}

impl SplitScratch {
    fn new(cols: usize) -> Self {
        Self { mean: vec![0.0; cols], var: vec![0.0; cols], dims: (0..cols).collect() }
    }
}

/// Build the subtree over `ids` (which start at `offset` in the tree order)
/// and return its node id.
fn divide<T: Scalar>(
    data: &Matrix<T>,
    ids: &mut [usize],
    offset: usize,
    leaf_size: usize,
    rng: &mut SplitMix64,
    scratch: &mut SplitScratch,
    nodes: &mut Vec<Node>,
) -> usize {
    if ids.len() <= leaf_size {
        nodes.push(Node::Leaf { start: offset, end: offset + ids.len() });
        return nodes.len() - 1;
    }

    let (dim, mean) = choose_split(data, ids, rng, scratch);
    let value_of = |id: usize| data.row(id)[dim].to_f64();

    // left: x < mean, right: x >= mean
    let mut lo = 0usize;
    for i in 0..ids.len() {
        if value_of(ids[i]) < mean {
            ids.swap(i, lo);
            lo += 1;
        }
    }

    let (mid, value) = if lo == 0 || lo == ids.len() {
        // degenerate cut: fall back to a median split on the same dimension
        ids.sort_by(|&a, &b| value_of(a).total_cmp(&value_of(b)).then(a.cmp(&b)));
        let mid = ids.len() / 2;
        (mid, value_of(ids[mid]))
    } else {
        (lo, mean)
    };

    let slot = nodes.len();
    nodes.push(Node::Leaf { start: 0, end: 0 }); // placeholder, patched below
    let (left_ids, right_ids) = ids.split_at_mut(mid);
    let left = divide(data, left_ids, offset, leaf_size, rng, scratch, nodes);
    let right = divide(data, right_ids, offset + mid, leaf_size, rng, scratch, nodes);
    nodes[slot] = Node::Split { dim, value, left, right };
    slot
}

/// Pick a split dimension among the top-variance ones and return it with
/// the sample mean along it.
fn choose_split<T: Scalar>(
    data: &Matrix<T>,
    ids: &[usize],
    rng: &mut SplitMix64,
    scratch: &mut SplitScratch,
) -> (usize, f64) {
    let cols = data.cols();
    let sample = &ids[..ids.len().min(SAMPLE_MEAN)];
    let n = sample.len() as f64;
    let SplitScratch { mean, var, dims } = scratch;

    mean.fill(0.0);
    for &id in sample {
        for (m, x) in mean.iter_mut().zip(data.row(id)) { *m += x.to_f64(); }
    }
    for m in mean.iter_mut() { *m /= n; }

    var.fill(0.0);
    for &id in sample {
        for ((v, m), x) in var.iter_mut().zip(mean.iter()).zip(data.row(id)) {
            let d = x.to_f64() - m;
            *v += d * d;
        }
    }

    // top RAND_DIM dims by (variance desc, dim asc), in that order
    let top = RAND_DIM.min(cols);
    let by_var = |a: &usize, b: &usize| var[*b].total_cmp(&var[*a]).then(a.cmp(b));
    if top < cols {
        dims.select_nth_unstable_by(top - 1, by_var);
    }
    dims[..top].sort_by(by_var);
    let pick = dims[rng.gen_range(top)];
    (pick, mean[pick])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Matrix<f32> {
        let mut v = Vec::new();
        for i in 0..n { for j in 0..n { v.push(i as f32); v.push(j as f32); } }
        Matrix::from_vec(v, 2).unwrap()
    }

    fn check_partition(tree: &KdTree, data: &Matrix<f32>, node: usize) -> Vec<usize> {
        match tree.nodes[node] {
            Node::Leaf { start, end } => tree.order[start..end].to_vec(),
            Node::Split { dim, value, left, right } => {
                let l = check_partition(tree, data, left);
                let r = check_partition(tree, data, right);
                assert!(l.iter().all(|&i| (data.row(i)[dim] as f64) <= value));
                assert!(r.iter().all(|&i| (data.row(i)[dim] as f64) >= value));
                l.into_iter().chain(r).collect()
            }
        }
    }

    #[test]
    fn every_row_lands_in_exactly_one_leaf() {
        let data = grid(9);
        let idx = TreeIndex::build(&data, Metric::SquaredL2, TreeParams { trees: 3, leaf_size: 2, seed: 5 }).unwrap();
        for tree in &idx.trees {
            let mut ids = check_partition(tree, &data, tree.root);
            ids.sort_unstable();
            assert_eq!(ids, (0..data.rows()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn identical_points_terminate() {
        let data = Matrix::from_vec(vec![3.0f32; 2 * 64], 2).unwrap();
        let idx = TreeIndex::build(&data, Metric::SquaredL2, TreeParams::default()).unwrap();
        let hits = idx.search(&[3.0, 3.0], 5, Effort::Unbounded);
        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(hits.iter().all(|h| h.distance == 0.0));
    }

    #[test]
    fn empty_dataset_rejected() {
        let data = Matrix::<f32>::from_vec(vec![], 4).unwrap();
        let err = TreeIndex::build(&data, Metric::SquaredL2, TreeParams::default()).err();
        assert!(matches!(err, Some(KnnError::InvalidConfig(_))));
    }

    #[test]
    fn bad_params_rejected() {
        let data = grid(3);
        let p = TreeParams { trees: 0, ..Default::default() };
        assert!(TreeIndex::build(&data, Metric::SquaredL2, p).is_err());
    }

    #[test]
    fn bounded_checks_caps_work() {
        let data = grid(20);
        let idx = TreeIndex::build(&data, Metric::SquaredL2, TreeParams::default()).unwrap();
        let hits = idx.search(&[7.2, 3.9], 3, Effort::Checks(8));
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].cmp_rank(&w[1]) == Ordering::Less));
    }

    #[test]
    fn split_dims_come_from_top_variance() {
        // dims 0..5 vary, the remaining 40 are constant
        let cols = 45usize;
        let mut v = Vec::new();
        for r in 0..200usize {
            for c in 0..cols { v.push(if c < 5 { ((r * (c + 3)) % 17) as f32 } else { 1.0 }); }
        }
        let data = Matrix::from_vec(v, cols).unwrap();
        let idx = TreeIndex::build(&data, Metric::SquaredL2, TreeParams { trees: 3, leaf_size: 4, seed: 2 }).unwrap();
        for tree in &idx.trees {
            for node in &tree.nodes {
                if let Node::Split { dim, .. } = node { assert!(*dim < 5, "split on constant dim {dim}"); }
            }
        }
    }

    #[test]
    fn small_budget_uses_sparse_visited_set() {
        let mut v = Visited::new(10_000, Some(32));
        assert!(matches!(v, Visited::Sparse(_)));
        assert!(!v.contains(9_999));
        v.insert(9_999);
        assert!(v.contains(9_999));
        assert!(matches!(Visited::new(10_000, None), Visited::Dense(_)));
        assert!(matches!(Visited::new(100, Some(50)), Visited::Dense(_)));
    }

    #[test]
    fn sparse_and_dense_budgets_agree_with_exact_when_covering() {
        let data = grid(30);
        let idx = TreeIndex::build(&data, Metric::SquaredL2, TreeParams::default()).unwrap();
        let exact = idx.search(&[11.5, 17.25], 6, Effort::Unbounded);
        assert_eq!(idx.search(&[11.5, 17.25], 6, Effort::Checks(data.rows())), exact);
        let small = idx.search(&[11.5, 17.25], 6, Effort::Checks(20));
        assert_eq!(small.len(), 6);
    }
}
