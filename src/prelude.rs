// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use dining::prelude::*;` to get started quickly.

pub use crate::agent::{
    Agent, AgentId, AgentReport, AgentState, DurationRange, RunControl, StopReason, Timing,
};
pub use crate::aggregate::{Record, generate_records, parallel_sum, sequential_sum};
pub use crate::arbiter::{
    Arbiter, ArbiterObserver, ArbiterStats, AuditSummary, HoldLedger, NoopObserver, Pair,
    PairGuard,
};
pub use crate::error::{ArbiterError, ConfigError, DiningError, HarnessError};
pub use crate::harness::{
    Harness, HarnessConfig, HarnessHandle, RunReport, RunStatus, run_with_cancel,
};
