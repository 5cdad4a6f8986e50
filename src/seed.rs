use crate::error::{KnnError, Result};

/// SplitMix64 for deterministic RNG (tiny, portable, reproducible).
#[derive(Clone, Copy, Debug)]
pub struct SplitMix64 { state: u64 }

impl SplitMix64 {
    pub fn new(seed: u64) -> Self { Self { state: seed } }
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut z = { self.state = self.state.wrapping_add(0x9E3779B97F4A7C15); self.state };
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
    #[inline]
    pub fn gen_range(&mut self, end: usize) -> usize {
        (self.next_u64() % (end as u64)) as usize
    }

    /// Fisher-Yates in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}

/// Pick `nq` distinct row ids out of `n`, returned in ascending order.
pub fn select_queries(n: usize, nq: usize, seed: u64) -> Result<Vec<usize>> {
    if nq > n {
        return Err(KnnError::config(format!("cannot sample {nq} queries from {n} rows")));
    }
    let mut ids: Vec<usize> = (0..n).collect();
    SplitMix64::new(seed).shuffle(&mut ids);
    ids.truncate(nq);
    ids.sort_unstable();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SplitMix64::new(9);
        let mut b = SplitMix64::new(9);
        for _ in 0..16 { assert_eq!(a.next_u64(), b.next_u64()); }
    }

    #[test]
    fn queries_are_distinct_sorted_and_seeded() {
        let q = select_queries(100, 20, 1).unwrap();
        assert_eq!(q.len(), 20);
        assert!(q.windows(2).all(|w| w[0] < w[1]));
        assert!(q.iter().all(|&i| i < 100));
        assert_eq!(q, select_queries(100, 20, 1).unwrap());
        assert!(select_queries(5, 6, 1).is_err());
        assert_eq!(select_queries(4, 4, 3).unwrap(), vec![0, 1, 2, 3]);
    }
}
