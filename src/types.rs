use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Index reported for an unfilled result slot.
pub const NO_NEIGHBOR: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor { pub index: usize, pub distance: f64 }

impl Neighbor {
    /// Total order by (distance asc, index asc).
    #[inline]
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.index.cmp(&other.index))
    }
}

impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering { self.cmp_rank(other) }
}

/// Stable top-k by (distance asc, index asc) for determinism.
pub fn stable_top_k(mut hits: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    hits.sort_by(Neighbor::cmp_rank);
    hits.truncate(k.min(hits.len()));
    hits
}

/// Bounded collector keeping the k best neighbors seen so far.
/// The heap top is the current worst kept entry.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Neighbor>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { k, heap: BinaryHeap::with_capacity(k + 1) }
    }

    #[inline] pub fn len(&self) -> usize { self.heap.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.heap.is_empty() }
    #[inline] pub fn is_full(&self) -> bool { self.heap.len() >= self.k }

    /// Distance a candidate must not exceed to enter; infinite until full.
    #[inline]
    pub fn worst_distance(&self) -> f64 {
        if self.is_full() { self.heap.peek().map_or(f64::INFINITY, |n| n.distance) } else { f64::INFINITY }
    }

    #[inline]
    pub fn push(&mut self, n: Neighbor) {
        if self.k == 0 { return; }
        if !self.is_full() {
            self.heap.push(n);
        } else if let Some(top) = self.heap.peek() {
            if n.cmp_rank(top) == Ordering::Less {
                self.heap.pop();
                self.heap.push(n);
            }
        }
    }

    pub fn into_sorted(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(index: usize, distance: f64) -> Neighbor { Neighbor { index, distance } }

    #[test]
    fn ties_break_by_index() {
        let hits = vec![n(3, 1.0), n(1, 1.0), n(0, 0.0), n(2, 5.0)];
        let top = stable_top_k(hits, 3);
        assert_eq!(top, vec![n(0, 0.0), n(1, 1.0), n(3, 1.0)]);
    }

    #[test]
    fn topk_matches_full_sort() {
        let all: Vec<Neighbor> = (0..50).map(|i| n(i, ((i * 7) % 11) as f64)).collect();
        let mut tk = TopK::new(8);
        for h in all.iter().rev() { tk.push(*h); }
        assert_eq!(tk.into_sorted(), stable_top_k(all, 8));
    }

    #[test]
    fn worst_distance_infinite_until_full() {
        let mut tk = TopK::new(2);
        tk.push(n(0, 3.0));
        assert_eq!(tk.worst_distance(), f64::INFINITY);
        tk.push(n(1, 1.0));
        assert_eq!(tk.worst_distance(), 3.0);
        tk.push(n(2, 2.0));
        assert_eq!(tk.worst_distance(), 2.0);
        assert_eq!(tk.len(), 2);
    }
}
