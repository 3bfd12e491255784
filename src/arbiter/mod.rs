// ABOUTME: Arbiter module for pair arbitration over a ring of resources.
// ABOUTME: Contains the resource ring, the Arbiter monitor, and observer hooks.

mod arbiter;
mod observer;
mod resource;

pub use arbiter::{Arbiter, ArbiterStats, PairGuard};
pub use observer::{ArbiterObserver, AuditSummary, HoldLedger, NoopObserver};
pub use resource::Pair;
