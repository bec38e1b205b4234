//! Bounded worker pool for independent per-file jobs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::thread;

use tracing::{debug, error};

use crate::error::{AnalysisError, Result};

/// Worker count when none is configured.
pub fn default_jobs() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Runs `work` over `items` on at most `jobs` threads and returns the
/// results in input order. Workers pull the next index from a shared
/// counter, so a slow item only stalls the worker holding it.
pub fn run_pool<T, R, F>(items: &[T], jobs: usize, work: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = jobs.max(1).min(items.len());
    if workers <= 1 {
        return Ok(items.iter().map(&work).collect());
    }

    let next = AtomicUsize::new(0);
    let (result_tx, result_rx) = channel::<(usize, R)>();
    thread::scope(|scope| -> Result<()> {
        for worker in 0..workers {
            let result_tx = result_tx.clone();
            let next = &next;
            let work = &work;
            thread::Builder::new()
                .name(format!("analysis-{worker}"))
                .spawn_scoped(scope, move || loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(idx) else {
                        break;
                    };
                    if result_tx.send((idx, work(item))).is_err() {
                        break;
                    }
                })
                .map_err(|err| {
                    error!(error = %err, "failed to spawn analysis worker");
                    AnalysisError::Io(err.to_string())
                })?;
        }
        debug!(workers, items = items.len(), "worker pool started");
        Ok(())
    })?;
    drop(result_tx);

    let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
    for (idx, result) in result_rx {
        slots[idx] = Some(result);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.ok_or_else(|| AnalysisError::Io(format!("worker dropped item {idx}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_input_order() {
        let items: Vec<u64> = (0..50).collect();
        let squares = run_pool(&items, 4, |&n| {
            if n % 7 == 0 {
                thread::sleep(std::time::Duration::from_millis(2));
            }
            n * n
        })
        .unwrap();
        assert_eq!(squares, items.iter().map(|n| n * n).collect::<Vec<_>>());
    }

    #[test]
    fn single_job_and_empty_input() {
        assert_eq!(run_pool(&[1, 2, 3], 1, |n| n + 1).unwrap(), vec![2, 3, 4]);
        let empty: [i32; 0] = [];
        assert!(run_pool(&empty, 8, |n| *n).unwrap().is_empty());
    }
}
