// ABOUTME: Think and eat duration bounds, sampled once per cycle.
// ABOUTME: Equal bounds give a fixed duration without touching the RNG.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive millisecond bounds for one phase of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    /// Shortest duration in milliseconds.
    pub min_ms: u64,
    /// Longest duration in milliseconds.
    pub max_ms: u64,
}

impl DurationRange {
    /// Create a range from inclusive bounds.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields `ms`.
    pub fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// A range that always yields zero.
    pub fn zero() -> Self {
        Self::fixed(0)
    }

    /// Whether `min_ms <= max_ms`.
    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    /// Pick a duration within the bounds.
    ///
    /// An inverted range yields `min_ms`; configs are validated before they
    /// get here.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}

/// Duration bounds for both idle phases of an agent's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// How long an agent thinks before requesting.
    pub think: DurationRange,
    /// How long an agent holds its pair.
    pub eat: DurationRange,
}

impl Timing {
    /// Zero think and eat time, for driving the arbiter as hard as possible.
    pub fn instant() -> Self {
        Self {
            think: DurationRange::zero(),
            eat: DurationRange::zero(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            think: DurationRange::new(1000, 2000),
            eat: DurationRange::new(1000, 2000),
        }
    }
}
