// ABOUTME: RunControl - the stop conditions agents check between cycles.
// ABOUTME: Combines a cancellation token, cycle cap, grant budget, and deadline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Default interval at which a waiting agent re-checks for cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why an agent left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The run was cancelled.
    Cancelled,
    /// The agent ate its allotted number of meals.
    CyclesDone,
    /// The system-wide grant budget ran out.
    BudgetSpent,
    /// The run deadline passed.
    DeadlinePassed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::CyclesDone => write!(f, "cycles done"),
            StopReason::BudgetSpent => write!(f, "budget spent"),
            StopReason::DeadlinePassed => write!(f, "deadline passed"),
        }
    }
}

/// Shared stop conditions for one run.
///
/// Agents consult it at the thinking boundary only, so a cycle that has
/// started always finishes with its pair released. With no limits set the
/// run goes on until cancelled.
#[derive(Debug)]
pub struct RunControl {
    cancel: CancellationToken,
    max_cycles: Option<u64>,
    grants_left: Option<AtomicU64>,
    deadline: Option<Instant>,
    poll_interval: Duration,
    starvation_threshold: Option<Duration>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    /// An unbounded run with its own cancellation token.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            max_cycles: None,
            grants_left: None,
            deadline: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            starvation_threshold: None,
        }
    }

    /// Stop each agent after `cycles` meals.
    pub fn max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Stop the whole run after `grants` meals across all agents.
    pub fn grant_budget(mut self, grants: u64) -> Self {
        self.grants_left = Some(AtomicU64::new(grants));
        self
    }

    /// Stop starting new cycles once `deadline` has passed.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// How often a waiting agent wakes to check for cancellation.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be positive");
        self.poll_interval = interval;
        self
    }

    /// Log a warning when a single wait runs longer than `threshold`.
    pub fn starvation_threshold(mut self, threshold: Duration) -> Self {
        self.starvation_threshold = Some(threshold);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token that cancels this run.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel the run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the run is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Interval between cancellation checks while waiting.
    pub fn wait_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait length after which a starvation warning is logged.
    pub fn starvation_limit(&self) -> Option<Duration> {
        self.starvation_threshold
    }

    /// Grants still available, if a budget was set.
    pub fn grants_remaining(&self) -> Option<u64> {
        self.grants_left
            .as_ref()
            .map(|left| left.load(Ordering::SeqCst))
    }

    /// Decide whether an agent that has eaten `meals` times may start another
    /// cycle. Admission consumes one unit of the grant budget.
    pub fn admit(&self, meals: u64) -> Result<(), StopReason> {
        if self.is_cancelled() {
            return Err(StopReason::Cancelled);
        }
        if self.max_cycles.is_some_and(|max| meals >= max) {
            return Err(StopReason::CyclesDone);
        }
        if self.deadline.is_some_and(|at| Instant::now() >= at) {
            return Err(StopReason::DeadlinePassed);
        }
        if let Some(left) = &self.grants_left {
            left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .map_err(|_| StopReason::BudgetSpent)?;
        }
        Ok(())
    }
}
