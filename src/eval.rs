use crate::error::{KnnError, Result};
use crate::query::KnnResult;
use crate::types::NO_NEIGHBOR;

/// Recall@k: fraction of true neighbors (from an exact scan) recovered by an
/// approximate result row. Sentinel slots are ignored.
pub fn recall_at_k(true_ids: &[i32], ann_ids: &[i32]) -> f32 {
    let truth: Vec<i32> = true_ids.iter().copied().filter(|&i| i != NO_NEIGHBOR).collect();
    if truth.is_empty() { return 1.0; }
    let hit = truth.iter().filter(|id| ann_ids.contains(id)).count();
    (hit as f32) / (truth.len() as f32)
}

/// Pooled recall over all rows plus the raw (hits, possible) counts.
pub fn mean_recall(truth: &KnnResult, ann: &KnnResult) -> Result<(f32, usize, usize)> {
    if truth.rows() != ann.rows() || truth.k() != ann.k() {
        return Err(KnnError::config(format!(
            "result shapes differ: {}x{} vs {}x{}",
            truth.rows(), truth.k(), ann.rows(), ann.k()
        )));
    }
    let mut hits = 0usize;
    let mut possible = 0usize;
    for r in 0..truth.rows() {
        let a = ann.indices.row(r);
        for id in truth.indices.row(r).iter().filter(|&&i| i != NO_NEIGHBOR) {
            if a.contains(id) { hits += 1; }
            possible += 1;
        }
    }
    let recall = if possible == 0 { 1.0 } else { hits as f32 / possible as f32 };
    Ok((recall, hits, possible))
}

/// Wilson score lower bound for a Bernoulli proportion.
pub fn wilson_lower_bound(successes: usize, trials: usize, z: f64) -> f64 {
    if trials == 0 { return 0.0; }
    let n = trials as f64;
    let phat = (successes as f64) / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = phat + z2 / (2.0 * n);
    let margin = z * ((phat * (1.0 - phat) + z2 / (4.0 * n)) / n).sqrt();
    (center - margin) / denom
}
