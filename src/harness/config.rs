// ABOUTME: HarnessConfig - agent count, timing, run bounds, and audit switch.
// ABOUTME: Loads from JSON with defaults for every field and validates limits.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::agent::{DurationRange, RunControl, Timing};
use crate::error::ConfigError;

/// Configuration for one harness run.
///
/// Every field has a default, so a config file only needs the fields it
/// changes. With no bound set the run lasts until it is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Number of agents, and resources, around the ring.
    pub agents: usize,

    /// Think and eat duration bounds.
    pub timing: Timing,

    /// Meals per agent before it stops.
    pub cycles: Option<u64>,

    /// Meals across all agents before the run stops.
    pub total_grants: Option<u64>,

    /// Wall-clock bound in milliseconds, checked between cycles.
    pub duration_ms: Option<u64>,

    /// Seed for per-agent RNGs. Random when unset.
    pub seed: Option<u64>,

    /// How often a waiting agent checks for cancellation.
    pub poll_interval_ms: u64,

    /// Warn when one wait exceeds this many milliseconds.
    pub starvation_warn_ms: Option<u64>,

    /// Cross-check every grant with a HoldLedger.
    pub audit: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            timing: Timing::default(),
            cycles: None,
            total_grants: None,
            duration_ms: None,
            seed: None,
            poll_interval_ms: 50,
            starvation_warn_ms: Some(10_000),
            audit: false,
        }
    }
}

impl HarnessConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of agents.
    pub fn agents(mut self, agents: usize) -> Self {
        self.agents = agents;
        self
    }

    /// Set think and eat bounds.
    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Set the think bounds.
    pub fn think(mut self, range: DurationRange) -> Self {
        self.timing.think = range;
        self
    }

    /// Set the eat bounds.
    pub fn eat(mut self, range: DurationRange) -> Self {
        self.timing.eat = range;
        self
    }

    /// Stop each agent after `cycles` meals.
    pub fn cycles(mut self, cycles: u64) -> Self {
        self.cycles = Some(cycles);
        self
    }

    /// Stop after `grants` meals system-wide.
    pub fn total_grants(mut self, grants: u64) -> Self {
        self.total_grants = Some(grants);
        self
    }

    /// Stop starting cycles after `duration`.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    /// Seed the agents' RNGs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attach a HoldLedger to the arbiter.
    pub fn audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    /// Whether any bound is set.
    pub fn is_bounded(&self) -> bool {
        self.cycles.is_some() || self.total_grants.is_some() || self.duration_ms.is_some()
    }

    /// Check the limits a run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents < 2 {
            return Err(ConfigError::TooFewAgents(self.agents));
        }
        for (name, range) in [("think", self.timing.think), ("eat", self.timing.eat)] {
            if !range.is_valid() {
                return Err(ConfigError::InvalidRange {
                    name,
                    min_ms: range.min_ms,
                    max_ms: range.max_ms,
                });
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Build the stop conditions for a run starting now.
    pub(crate) fn run_control(&self, token: CancellationToken) -> RunControl {
        let mut control = RunControl::new()
            .with_token(token)
            .poll_interval(Duration::from_millis(self.poll_interval_ms.max(1)));
        if let Some(cycles) = self.cycles {
            control = control.max_cycles(cycles);
        }
        if let Some(grants) = self.total_grants {
            control = control.grant_budget(grants);
        }
        if let Some(ms) = self.duration_ms {
            control = control.deadline(Instant::now() + Duration::from_millis(ms));
        }
        if let Some(ms) = self.starvation_warn_ms {
            control = control.starvation_threshold(Duration::from_millis(ms));
        }
        control
    }
}
