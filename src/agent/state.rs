// ABOUTME: Agent identity and the thinking/requesting/eating lifecycle.
// ABOUTME: AgentState encodes which transitions the state machine allows.

use serde::{Deserialize, Serialize};

/// Identity of an agent, `0..N` around the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(usize);

impl AgentId {
    /// Wrap a ring position.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Ring position of this agent.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for AgentId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Where an agent is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Idle, touching no shared state.
    Thinking,
    /// Suspended in the arbiter waiting for its pair.
    Requesting,
    /// Holding both resources of its pair.
    Eating,
}

impl AgentState {
    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// `Requesting -> Thinking` covers a request abandoned on cancellation,
    /// which leaves nothing held.
    pub fn can_transition_to(self, next: AgentState) -> bool {
        matches!(
            (self, next),
            (AgentState::Thinking, AgentState::Requesting)
                | (AgentState::Requesting, AgentState::Eating)
                | (AgentState::Requesting, AgentState::Thinking)
                | (AgentState::Eating, AgentState::Thinking)
        )
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Thinking => write!(f, "thinking"),
            AgentState::Requesting => write!(f, "requesting"),
            AgentState::Eating => write!(f, "eating"),
        }
    }
}
