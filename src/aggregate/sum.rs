// ABOUTME: Sequential and chunked parallel sums over matching records.
// ABOUTME: Workers share nothing but one atomic accumulator.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::record::Record;

/// Records per worker below which extra workers stop paying off.
pub const MIN_CHUNK: usize = 100;

/// Sum `value` over records matching `(category, group_key)` on this thread.
pub fn sequential_sum(records: &[Record], category: &str, group_key: i64) -> i64 {
    records
        .iter()
        .filter(|r| r.matches(category, group_key))
        .map(|r| r.value)
        .sum()
}

/// Number of contiguous chunks for `len` records on `parallelism` cores.
///
/// `min(parallelism, len / MIN_CHUNK)`, never less than one.
pub fn chunk_count(len: usize, parallelism: usize) -> usize {
    parallelism.min(len / MIN_CHUNK).max(1)
}

/// Sum matching records across `available_parallelism()` worker threads.
pub fn parallel_sum(records: &[Record], category: &str, group_key: i64) -> i64 {
    let chunks = chunk_count(records.len(), available_parallelism());
    parallel_sum_with(records, category, group_key, chunks)
}

/// Sum matching records split into exactly `chunks` contiguous slices.
///
/// The last slice absorbs the remainder. The result equals
/// `sequential_sum` for every chunk count.
pub fn parallel_sum_with(records: &[Record], category: &str, group_key: i64, chunks: usize) -> i64 {
    let chunks = chunks.max(1);
    if chunks == 1 || records.is_empty() {
        return sequential_sum(records, category, group_key);
    }

    let chunk_size = records.len() / chunks;
    let total = AtomicI64::new(0);

    thread::scope(|s| {
        for i in 0..chunks {
            let start = i * chunk_size;
            let end = if i == chunks - 1 {
                records.len()
            } else {
                start + chunk_size
            };
            let slice = &records[start..end];
            let total = &total;
            s.spawn(move || {
                let local = sequential_sum(slice, category, group_key);
                total.fetch_add(local, Ordering::Relaxed);
            });
        }
    });

    total.into_inner()
}

/// Both sums over one data set, with timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Records summed.
    pub records: usize,
    /// Chunks the parallel sum used.
    pub chunks: usize,
    /// Sequential result.
    pub sequential: i64,
    /// Parallel result.
    pub parallel: i64,
    /// Sequential wall time.
    pub sequential_time: Duration,
    /// Parallel wall time.
    pub parallel_time: Duration,
}

impl Comparison {
    /// Whether both sums agree.
    pub fn agrees(&self) -> bool {
        self.sequential == self.parallel
    }
}

/// Run the sequential and parallel sums back to back.
pub fn compare(records: &[Record], category: &str, group_key: i64) -> Comparison {
    let chunks = chunk_count(records.len(), available_parallelism());

    let start = Instant::now();
    let sequential = sequential_sum(records, category, group_key);
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = parallel_sum_with(records, category, group_key, chunks);
    let parallel_time = start.elapsed();

    Comparison {
        records: records.len(),
        chunks,
        sequential,
        parallel,
        sequential_time,
        parallel_time,
    }
}

fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
