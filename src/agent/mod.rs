// ABOUTME: Agent module - the competitors that cycle through the arbiter.
// ABOUTME: Provides identity, lifecycle states, timing, and run control.

mod agent;
mod control;
mod state;
mod timing;

pub use agent::{Agent, AgentReport};
pub use control::{DEFAULT_POLL_INTERVAL, RunControl, StopReason};
pub use state::{AgentId, AgentState};
pub use timing::{DurationRange, Timing};
