// ABOUTME: Parallel aggregation utility - filtered sums over immutable records.
// ABOUTME: Stateless fan-out/fan-in; checked against the sequential sum.

mod record;
mod sum;

pub use record::{CATEGORIES, Record, generate_records};
pub use sum::{
    Comparison, MIN_CHUNK, chunk_count, compare, parallel_sum, parallel_sum_with, sequential_sum,
};
