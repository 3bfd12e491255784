// ABOUTME: The Arbiter - one mutex and one condvar guarding the resource ring.
// ABOUTME: Grants adjacent pairs all-or-nothing and broadcasts on every release.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use super::observer::{ArbiterObserver, NoopObserver};
use super::resource::{Pair, ResourceSet};
use crate::agent::AgentId;
use crate::error::ArbiterError;

/// Counters kept alongside the ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArbiterStats {
    /// Pairs granted since creation.
    pub grants: u64,
    /// Pairs released since creation.
    pub releases: u64,
    /// Resources held right now.
    pub held: usize,
}

/// Mutable state, protected by the arbiter's single mutex.
struct ArbiterState {
    resources: ResourceSet,
    grants: u64,
    releases: u64,
}

impl ArbiterState {
    fn validate_request(&self, agent: AgentId, pair: Pair) -> Result<(), ArbiterError> {
        self.resources.check(pair)?;
        for resource in pair.indices() {
            if self.resources.owner(resource) == Some(agent) {
                return Err(ArbiterError::AlreadyHeld { resource, agent });
            }
        }
        Ok(())
    }
}

/// Central broker for a ring of mutually-exclusive resources.
///
/// Agents never lock individual resources. They ask the arbiter for both
/// resources of a pair at once and either get both or keep waiting holding
/// nothing, so no agent can sit on one resource while blocking for another.
///
/// # Wake Semantics
///
/// - **Broadcast release:** `release()` wakes every waiter, since one freed
///   resource can complete two different pairs.
/// - **Re-check on wake:** a woken waiter re-tests its pair under the lock and
///   goes back to sleep if a neighbour got there first.
/// - **No ordering:** whichever waiter re-acquires the lock first wins. An
///   agent can in principle be postponed indefinitely.
pub struct Arbiter {
    size: usize,
    state: Mutex<ArbiterState>,
    released: Condvar,
    observer: Arc<dyn ArbiterObserver>,
}

impl Arbiter {
    /// Create an arbiter for a ring of `size` free resources.
    ///
    /// Returns `Err(ArbiterError::TooFewResources)` if `size < 2`.
    pub fn new(size: usize) -> Result<Self, ArbiterError> {
        Self::with_observer(size, Arc::new(NoopObserver))
    }

    /// Create an arbiter that reports every grant and release to `observer`.
    pub fn with_observer(
        size: usize,
        observer: Arc<dyn ArbiterObserver>,
    ) -> Result<Self, ArbiterError> {
        let resources = ResourceSet::new(size)?;
        Ok(Self {
            size,
            state: Mutex::new(ArbiterState {
                resources,
                grants: 0,
                releases: 0,
            }),
            released: Condvar::new(),
            observer,
        })
    }

    /// Number of resources in the ring.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The adjacent pair `agent` needs in this ring.
    pub fn pair_for(&self, agent: AgentId) -> Pair {
        Pair::for_agent(agent, self.size)
    }

    /// Block until both resources of `pair` are free, then take both.
    ///
    /// Returns `Err` without waiting if the pair is malformed or if `agent`
    /// already holds one of its resources.
    pub fn request(&self, agent: AgentId, pair: Pair) -> Result<(), ArbiterError> {
        let mut state = self.state.lock();
        state.validate_request(agent, pair)?;

        while !state.resources.is_free(pair) {
            self.released.wait(&mut state);
        }

        self.grant(&mut state, agent, pair);
        Ok(())
    }

    /// Like `request`, but gives up at `deadline`.
    ///
    /// Returns `Err(ArbiterError::TimedOut)` if the pair was not granted in
    /// time. On timeout nothing in the ring has been touched.
    pub fn request_until(
        &self,
        agent: AgentId,
        pair: Pair,
        deadline: Instant,
    ) -> Result<(), ArbiterError> {
        let mut state = self.state.lock();
        state.validate_request(agent, pair)?;

        while !state.resources.is_free(pair) {
            if Instant::now() >= deadline {
                return Err(ArbiterError::TimedOut);
            }
            // Timing out here just falls through to the re-check above.
            let _ = self.released.wait_until(&mut state, deadline);
        }

        self.grant(&mut state, agent, pair);
        Ok(())
    }

    /// Blocking request that returns a guard releasing the pair on drop.
    pub fn acquire(&self, agent: AgentId, pair: Pair) -> Result<PairGuard<'_>, ArbiterError> {
        self.request(agent, pair)?;
        Ok(PairGuard::new(self, agent, pair))
    }

    /// Deadline-bounded request that returns a guard releasing the pair on drop.
    pub fn acquire_until(
        &self,
        agent: AgentId,
        pair: Pair,
        deadline: Instant,
    ) -> Result<PairGuard<'_>, ArbiterError> {
        self.request_until(agent, pair, deadline)?;
        Ok(PairGuard::new(self, agent, pair))
    }

    /// Return both resources of `pair` and wake every waiter.
    ///
    /// Returns `Err(ArbiterError::NotOwner)` if `agent` does not hold both
    /// resources; in that case nothing is released.
    pub fn release(&self, agent: AgentId, pair: Pair) -> Result<(), ArbiterError> {
        let mut state = self.state.lock();
        state.resources.check(pair)?;

        for resource in pair.indices() {
            let owner = state.resources.owner(resource);
            if owner != Some(agent) {
                return Err(ArbiterError::NotOwner {
                    resource,
                    owner,
                    requester: agent,
                });
            }
        }

        state.resources.mark_free(pair);
        state.releases += 1;
        self.released.notify_all();
        self.observer.released(agent, pair);

        tracing::trace!(agent = %agent, pair = %pair, "pair released");
        Ok(())
    }

    /// Current owner of resource `index`.
    pub fn owner(&self, index: usize) -> Result<Option<AgentId>, ArbiterError> {
        let state = self.state.lock();
        state.resources.check_index(index)?;
        Ok(state.resources.owner(index))
    }

    /// Owners of every resource, read in one critical section.
    pub fn snapshot(&self) -> Vec<Option<AgentId>> {
        self.state.lock().resources.owners().to_vec()
    }

    /// Grant/release counters and the number of resources held now.
    pub fn stats(&self) -> ArbiterStats {
        let state = self.state.lock();
        ArbiterStats {
            grants: state.grants,
            releases: state.releases,
            held: state.resources.held(),
        }
    }

    fn grant(&self, state: &mut ArbiterState, agent: AgentId, pair: Pair) {
        self.observer.granted(agent, pair);
        state.resources.mark_held(pair, agent);
        state.grants += 1;

        tracing::trace!(agent = %agent, pair = %pair, "pair granted");
    }
}

impl std::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbiter")
            .field("size", &self.size)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A granted pair that goes back to the arbiter when dropped.
///
/// Dropping covers every exit path out of the eating step, including a panic
/// unwinding through it, so a crashed agent never strands its neighbours.
#[must_use = "dropping the guard releases the pair immediately"]
pub struct PairGuard<'a> {
    arbiter: &'a Arbiter,
    agent: AgentId,
    pair: Pair,
    held: bool,
}

impl<'a> PairGuard<'a> {
    fn new(arbiter: &'a Arbiter, agent: AgentId, pair: Pair) -> Self {
        Self {
            arbiter,
            agent,
            pair,
            held: true,
        }
    }

    /// The agent holding this pair.
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    /// The pair held.
    pub fn pair(&self) -> Pair {
        self.pair
    }

    /// Release now and report the outcome instead of logging it.
    pub fn release(mut self) -> Result<(), ArbiterError> {
        self.held = false;
        self.arbiter.release(self.agent, self.pair)
    }
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        if let Err(e) = self.arbiter.release(self.agent, self.pair) {
            tracing::error!(agent = %self.agent, pair = %self.pair, error = %e, "guard release failed");
        }
    }
}
