// ABOUTME: Root module for dining - pair arbitration for a ring of agents.
// ABOUTME: Re-exports the arbiter, agents, harness, and aggregation utility.

pub mod agent;
pub mod aggregate;
pub mod arbiter;
pub mod error;
pub mod harness;
pub mod prelude;

pub use error::DiningError;
