// ABOUTME: Defines all error types for the dining library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under DiningError.

use crate::agent::AgentId;

/// Top-level error type for the dining library.
#[derive(Debug, thiserror::Error)]
pub enum DiningError {
    #[error("Arbiter error: {0}")]
    Arbiter(#[from] ArbiterError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Harness error: {0}")]
    Harness(#[from] HarnessError),
}

/// Errors from arbiter operations.
///
/// Every variant except `TimedOut` is a contract violation by the caller.
/// None of them leave the resource ring modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArbiterError {
    #[error("a ring needs at least 2 resources, got {0}")]
    TooFewResources(usize),

    #[error("resource {index} is out of range for a ring of {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("pair names resource {0} twice")]
    DegeneratePair(usize),

    #[error("{requester} does not hold resource {resource} (owner: {})", owner_label(.owner))]
    NotOwner {
        resource: usize,
        owner: Option<AgentId>,
        requester: AgentId,
    },

    #[error("{agent} already holds resource {resource}")]
    AlreadyHeld { resource: usize, agent: AgentId },

    #[error("pair not granted before the deadline")]
    TimedOut,
}

fn owner_label(owner: &Option<AgentId>) -> String {
    match owner {
        Some(agent) => agent.to_string(),
        None => "free".to_string(),
    }
}

/// Errors from harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least 2 agents are required, got {0}")]
    TooFewAgents(usize),

    #[error("invalid {name} range: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidRange {
        name: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("poll interval must be positive")]
    ZeroPollInterval,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from running the agent harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Arbiter setup failed: {0}")]
    Arbiter(#[from] ArbiterError),

    #[error("Failed to spawn {agent}: {source}")]
    Spawn {
        agent: AgentId,
        #[source]
        source: std::io::Error,
    },

    #[error("{agent} stopped on a contract violation: {source}")]
    Agent {
        agent: AgentId,
        #[source]
        source: ArbiterError,
    },

    #[error("{0} panicked")]
    AgentPanicked(AgentId),

    #[error("Harness supervisor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
