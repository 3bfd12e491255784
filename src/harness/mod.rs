// ABOUTME: Harness module - runs a ring of agents on OS threads.
// ABOUTME: Contains configuration, run status, and the spawn/join runner.

mod config;
mod runner;
mod status;

pub use config::HarnessConfig;
pub use runner::{Harness, HarnessHandle, RunReport, run_with_cancel};
pub use status::RunStatus;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod runner_test;
