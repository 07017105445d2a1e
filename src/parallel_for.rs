use std::{num::NonZeroUsize, ops::Range, thread};

use thiserror::Error;

/// Used when the hardware concurrency cannot be detected.
const FALLBACK_WORKER_COUNT: usize = 8;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WorkerCount {
    #[default]
    Auto,
    Manual(NonZeroUsize),
}

impl WorkerCount {
    pub fn get(&self) -> usize {
        match self {
            WorkerCount::Auto => match num_cpus::get() {
                0 => FALLBACK_WORKER_COUNT,
                n => n,
            },
            WorkerCount::Manual(n) => n.get(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParallelForError<E> {
    #[error("Failed to spawn a worker thread")]
    Spawn(#[source] std::io::Error),
    #[error("Worker task failed")]
    Worker(#[source] E),
}

/// Contiguous batches of equal size, one per worker, and the leftover elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub batches: Vec<Range<usize>>,
    pub remainder: Range<usize>,
}

/// Splits `0..n` into `workers` batches of `n / workers` elements followed by the remainder.
/// Empty batches are dropped.
pub fn partition(n: usize, workers: usize) -> Partition {
    let workers = workers.max(1);
    let batch_size = n / workers;
    let batches = if batch_size == 0 {
        Vec::new()
    } else {
        (0..workers)
            .map(|i| i * batch_size..(i + 1) * batch_size)
            .collect()
    };
    Partition {
        batches,
        remainder: workers * batch_size..n,
    }
}

/// Calls `f` on ranges covering `0..n`, each batch in its own scoped thread
/// and the remainder on the calling thread.
/// With `parallel == false` the same ranges run in order on the calling thread.
pub fn parallel_for<F, E>(
    n: usize,
    worker_count: WorkerCount,
    parallel: bool,
    f: F,
) -> Result<(), ParallelForError<E>>
where
    F: Fn(Range<usize>) -> Result<(), E> + Sync,
    E: Send,
{
    let Partition { batches, remainder } = partition(n, worker_count.get());
    log::trace!(
        "Splitting {n} items into {} batches and {} remaining",
        batches.len(),
        remainder.len()
    );

    if !parallel {
        for range in batches.into_iter().chain(std::iter::once(remainder)) {
            f(range).map_err(ParallelForError::Worker)?;
        }
        return Ok(());
    }

    let f = &f;
    thread::scope(|scope| -> Result<(), ParallelForError<E>> {
        let handles = batches
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                thread::Builder::new()
                    .name(format!("worker{i}"))
                    .spawn_scoped(scope, move || f(range))
                    .map_err(ParallelForError::Spawn)
            })
            .collect::<Vec<_>>();

        let remainder_result = f(remainder).map_err(ParallelForError::Worker);
        join_all(handles)?;
        remainder_result
    })
}

/// Like `parallel_for`, but hands each call a disjoint mutable chunk of `items`
/// together with the index of its first element.
pub fn parallel_for_slice<T, F, E>(
    items: &mut [T],
    worker_count: WorkerCount,
    parallel: bool,
    f: F,
) -> Result<(), ParallelForError<E>>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<(), E> + Sync,
    E: Send,
{
    let Partition { batches, remainder } = partition(items.len(), worker_count.get());
    log::trace!(
        "Splitting {} items into {} batches and {} remaining",
        items.len(),
        batches.len(),
        remainder.len()
    );

    let (batched, rest) = items.split_at_mut(remainder.start);
    let chunks = split_chunks(batched, &batches);

    if !parallel {
        for (start, chunk) in chunks.into_iter().chain(std::iter::once((remainder.start, rest))) {
            f(start, chunk).map_err(ParallelForError::Worker)?;
        }
        return Ok(());
    }

    let f = &f;
    thread::scope(|scope| -> Result<(), ParallelForError<E>> {
        let handles = chunks
            .into_iter()
            .enumerate()
            .map(|(i, (start, chunk))| {
                thread::Builder::new()
                    .name(format!("worker{i}"))
                    .spawn_scoped(scope, move || f(start, chunk))
                    .map_err(ParallelForError::Spawn)
            })
            .collect::<Vec<_>>();

        let remainder_result = f(remainder.start, rest).map_err(ParallelForError::Worker);
        join_all(handles)?;
        remainder_result
    })
}

/// Cuts `items` into consecutive chunks matching `ranges`, which must tile a prefix of it.
fn split_chunks<'a, T>(
    mut items: &'a mut [T],
    ranges: &[Range<usize>],
) -> Vec<(usize, &'a mut [T])> {
    ranges
        .iter()
        .map(|range| {
            let (chunk, rest) = std::mem::take(&mut items).split_at_mut(range.len());
            items = rest;
            (range.start, chunk)
        })
        .collect()
}

/// Waits for every spawned worker, resuming panics on the calling thread.
/// Returns the first error, spawn failures first.
fn join_all<E>(
    handles: Vec<Result<thread::ScopedJoinHandle<'_, Result<(), E>>, ParallelForError<E>>>,
) -> Result<(), ParallelForError<E>> {
    let mut result = Ok(());
    for handle in handles {
        let outcome = match handle {
            Ok(handle) => match handle.join() {
                Ok(worker_result) => worker_result.map_err(ParallelForError::Worker),
                Err(panic) => std::panic::resume_unwind(panic),
            },
            Err(spawn_error) => Err(spawn_error),
        };
        if result.is_ok() {
            result = outcome;
        }
    }
    result
}
