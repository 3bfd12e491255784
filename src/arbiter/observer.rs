// ABOUTME: Observer hooks called by the Arbiter inside its critical section.
// ABOUTME: HoldLedger is an auditing observer that cross-checks every grant.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use super::resource::Pair;
use crate::agent::AgentId;

/// Hooks fired on every grant and release.
///
/// Both methods run while the arbiter's lock is held, so the sequence of
/// calls an observer sees is exactly the order in which the ring changed.
/// Implementations must be quick and must not call back into the arbiter.
pub trait ArbiterObserver: Send + Sync {
    /// `agent` was granted `pair`. Called before the ring is updated.
    fn granted(&self, _agent: AgentId, _pair: Pair) {}

    /// `agent` returned `pair`. Called after the ring is updated.
    fn released(&self, _agent: AgentId, _pair: Pair) {}
}

/// An observer that does nothing.
pub struct NoopObserver;

impl ArbiterObserver for NoopObserver {}

/// Result of an audited run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Grants seen.
    pub grants: u64,
    /// Releases seen.
    pub releases: u64,
    /// Grants of a resource that the ledger already had an owner for, or
    /// releases by an agent the ledger did not record as owner.
    pub violations: u64,
    /// Most resources held at the same instant.
    pub peak_held: usize,
}

/// Keeps an independent copy of who holds what and counts any grant that
/// would overlap with a current holder.
pub struct HoldLedger {
    holders: Mutex<Vec<Option<AgentId>>>,
    grants: AtomicU64,
    releases: AtomicU64,
    violations: AtomicU64,
    peak_held: Mutex<usize>,
}

impl HoldLedger {
    /// Create a ledger for a ring of `size` resources.
    pub fn new(size: usize) -> Self {
        Self {
            holders: Mutex::new(vec![None; size]),
            grants: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            peak_held: Mutex::new(0),
        }
    }

    /// Snapshot of the counters.
    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            grants: self.grants.load(Ordering::SeqCst),
            releases: self.releases.load(Ordering::SeqCst),
            violations: self.violations.load(Ordering::SeqCst),
            peak_held: *self.peak_held.lock(),
        }
    }

    fn violation(&self, agent: AgentId, resource: usize, what: &str) {
        self.violations.fetch_add(1, Ordering::SeqCst);
        tracing::error!(agent = %agent, resource, "ledger violation: {}", what);
    }
}

impl ArbiterObserver for HoldLedger {
    fn granted(&self, agent: AgentId, pair: Pair) {
        self.grants.fetch_add(1, Ordering::SeqCst);
        let mut holders = self.holders.lock();
        for index in pair.indices() {
            match holders.get(index).copied() {
                Some(None) => holders[index] = Some(agent),
                Some(Some(_)) => {
                    self.violation(agent, index, "resource granted while held");
                    holders[index] = Some(agent);
                }
                None => self.violation(agent, index, "resource outside ledger"),
            }
        }

        let held = holders.iter().filter(|h| h.is_some()).count();
        let mut peak = self.peak_held.lock();
        if held > *peak {
            *peak = held;
        }
    }

    fn released(&self, agent: AgentId, pair: Pair) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        let mut holders = self.holders.lock();
        for index in pair.indices() {
            match holders.get(index).copied() {
                Some(Some(owner)) if owner == agent => holders[index] = None,
                Some(_) => {
                    self.violation(agent, index, "released by non-holder");
                    holders[index] = None;
                }
                None => self.violation(agent, index, "resource outside ledger"),
            }
        }
    }
}
