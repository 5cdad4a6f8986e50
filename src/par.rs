// src/par.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

/// Parallel map over `0..n`, keeping output order deterministic.
/// Spawns `threads` workers; with `threads <= 1` it runs serially.
///
/// T: Send because results cross thread boundaries into the shared slots
/// F: Sync so all workers can borrow the same callable
pub fn parallel_map_indexed<T, F>(n: usize, threads: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    if n == 0 || threads <= 1 {
        return (0..n).map(&f).collect();
    }

    let slots: Vec<Mutex<Option<T>>> = (0..n).map(|_| Mutex::new(None)).collect();
    let next = AtomicUsize::new(0);

    // Scoped threads let us borrow `slots` and `f` (no 'static required)
    thread::scope(|scope| {
        for _ in 0..threads.min(n) {
            scope.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= n { break; }
                let res = f(i);
                // each slot is written by exactly one worker
                *slots[i].lock().unwrap_or_else(|p| p.into_inner()) = Some(res);
            });
        }
    });

    // scope joined all workers; a worker panic has already propagated
    slots
        .into_iter()
        .filter_map(|s| s.into_inner().unwrap_or_else(|p| p.into_inner()))
        .collect()
}
