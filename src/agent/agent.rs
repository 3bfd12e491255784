// ABOUTME: Agent - runs the think/request/eat cycle against a shared Arbiter.
// ABOUTME: Eating happens under a PairGuard so the pair is always returned.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;

use super::control::{RunControl, StopReason};
use super::state::{AgentId, AgentState};
use super::timing::Timing;
use crate::arbiter::{Arbiter, Pair, PairGuard};
use crate::error::ArbiterError;

/// Summary of one agent's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    /// The agent.
    pub agent: AgentId,

    /// The pair it ate with.
    pub pair: Pair,

    /// Completed grant/release cycles.
    pub meals: u64,

    /// Longest single wait in the requesting state, in milliseconds.
    pub longest_wait_ms: u64,

    /// Why the loop ended.
    pub stopped_by: StopReason,
}

/// One competitor for an adjacent pair of resources.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    pair: Pair,
    state: AgentState,
    meals: u64,
    longest_wait: Duration,
}

impl Agent {
    /// Create a thinking agent that will request `pair`.
    pub fn new(id: AgentId, pair: Pair) -> Self {
        Self {
            id,
            pair,
            state: AgentState::Thinking,
            meals: 0,
            longest_wait: Duration::ZERO,
        }
    }

    /// Create agent `id` with its adjacent pair in `arbiter`'s ring.
    pub fn seated(id: AgentId, arbiter: &Arbiter) -> Self {
        Self::new(id, arbiter.pair_for(id))
    }

    /// The agent ID.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// The pair this agent requests.
    pub fn pair(&self) -> Pair {
        self.pair
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Completed cycles so far.
    pub fn meals(&self) -> u64 {
        self.meals
    }

    /// Cycle until `control` says stop.
    ///
    /// Returns the agent's report, or the first contract violation the
    /// arbiter reported. A violation ends the loop with nothing held.
    pub fn dine<R: Rng + ?Sized>(
        &mut self,
        arbiter: &Arbiter,
        timing: &Timing,
        control: &RunControl,
        rng: &mut R,
    ) -> Result<AgentReport, ArbiterError> {
        let stopped_by = loop {
            if let Err(reason) = control.admit(self.meals) {
                break reason;
            }

            tracing::info!(agent = %self.id, "thinking");
            pause(timing.think.sample(rng));

            self.transition(AgentState::Requesting);
            let Some(guard) = self.wait_for_pair(arbiter, control)? else {
                self.transition(AgentState::Thinking);
                break StopReason::Cancelled;
            };

            self.transition(AgentState::Eating);
            pause(timing.eat.sample(rng));
            guard.release()?;
            tracing::info!(agent = %self.id, pair = %self.pair, "released");

            self.meals += 1;
            self.transition(AgentState::Thinking);
        };

        tracing::debug!(agent = %self.id, meals = self.meals, reason = %stopped_by, "agent stopped");
        Ok(self.report(stopped_by))
    }

    /// Summary of the run so far.
    pub fn report(&self, stopped_by: StopReason) -> AgentReport {
        AgentReport {
            agent: self.id,
            pair: self.pair,
            meals: self.meals,
            longest_wait_ms: self.longest_wait.as_millis() as u64,
            stopped_by,
        }
    }

    /// Wait in short deadline slices so cancellation is noticed.
    ///
    /// Returns `Ok(None)` if the run was cancelled first; nothing is held in
    /// that case.
    fn wait_for_pair<'a>(
        &mut self,
        arbiter: &'a Arbiter,
        control: &RunControl,
    ) -> Result<Option<PairGuard<'a>>, ArbiterError> {
        let started = Instant::now();
        let mut warned = false;

        loop {
            let deadline = Instant::now() + control.wait_interval();
            match arbiter.acquire_until(self.id, self.pair, deadline) {
                Ok(guard) => {
                    self.longest_wait = self.longest_wait.max(started.elapsed());
                    return Ok(Some(guard));
                }
                Err(ArbiterError::TimedOut) => {
                    if control.is_cancelled() {
                        return Ok(None);
                    }
                    if let Some(limit) = control.starvation_limit() {
                        let waited = started.elapsed();
                        if !warned && waited >= limit {
                            tracing::warn!(
                                agent = %self.id,
                                pair = %self.pair,
                                waited_ms = waited.as_millis() as u64,
                                "agent starving"
                            );
                            warned = true;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn transition(&mut self, next: AgentState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
        match next {
            AgentState::Requesting => {
                tracing::info!(agent = %self.id, pair = %self.pair, "requesting")
            }
            AgentState::Eating => tracing::info!(agent = %self.id, pair = %self.pair, "eating"),
            AgentState::Thinking => {}
        }
    }
}

fn pause(duration: Duration) {
    if duration.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(duration);
    }
}
