// ABOUTME: Harness - spawns one OS thread per agent around a shared Arbiter.
// ABOUTME: HarnessHandle joins or cancels the run and assembles the RunReport.

use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::HarnessConfig;
use super::status::{RunStatus, StatusCell};
use crate::agent::{Agent, AgentId, AgentReport};
use crate::arbiter::{
    Arbiter, ArbiterObserver, ArbiterStats, AuditSummary, HoldLedger, NoopObserver, Pair,
};
use crate::error::{ArbiterError, HarnessError};

type AgentResult = Result<AgentReport, ArbiterError>;

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Identifier attached to every log line of the run.
    pub run_id: Uuid,

    /// How the run ended.
    pub status: RunStatus,

    /// Wall-clock time from spawn to the last join, in milliseconds.
    pub elapsed_ms: u64,

    /// Arbiter counters at the end of the run.
    pub stats: ArbiterStats,

    /// One entry per agent, in ring order.
    pub agents: Vec<AgentReport>,

    /// Ledger counters when the run was audited.
    pub audit: Option<AuditSummary>,
}

impl RunReport {
    /// Meals eaten across all agents.
    pub fn total_meals(&self) -> u64 {
        self.agents.iter().map(|a| a.meals).sum()
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let meals: Vec<String> = self.agents.iter().map(|a| a.meals.to_string()).collect();
        format!(
            "run {} {} in {}ms: {} grants, {} releases, meals per agent [{}]",
            self.run_id,
            self.status,
            self.elapsed_ms,
            self.stats.grants,
            self.stats.releases,
            meals.join(", ")
        )
    }
}

/// Fans arbiter events out to several observers.
struct ObserverChain(Vec<Arc<dyn ArbiterObserver>>);

impl ArbiterObserver for ObserverChain {
    fn granted(&self, agent: AgentId, pair: Pair) {
        for observer in &self.0 {
            observer.granted(agent, pair);
        }
    }

    fn released(&self, agent: AgentId, pair: Pair) {
        for observer in &self.0 {
            observer.released(agent, pair);
        }
    }
}

/// Builds and launches a run.
pub struct Harness {
    config: HarnessConfig,
    observers: Vec<Arc<dyn ArbiterObserver>>,
}

impl Harness {
    /// Create a harness from a validated config.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self {
            config,
            observers: Vec::new(),
        })
    }

    /// Report every grant and release of the run to `observer`.
    pub fn observer(mut self, observer: Arc<dyn ArbiterObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// The config this harness will run.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Spawn the run and block until it ends.
    pub fn run(self) -> Result<RunReport, HarnessError> {
        self.spawn()?.join()
    }

    /// Spawn the run and wait for it on tokio, cancelling when `cancel`
    /// completes.
    ///
    /// Dropping the returned future before it resolves cancels the run too,
    /// so a `timeout` or a lost `select!` branch never leaves agents behind.
    pub async fn run_until<F>(self, cancel: F) -> Result<RunReport, HarnessError>
    where
        F: Future<Output = ()>,
    {
        let handle = self.spawn()?;
        let token = handle.cancellation_token();
        let cancel_on_drop = token.clone().drop_guard();
        let wait = handle.wait();

        tokio::pin!(cancel);
        tokio::pin!(wait);

        let result = tokio::select! {
            biased;
            result = &mut wait => result,
            () = &mut cancel => {
                tracing::info!("cancellation requested, waiting for agents to finish their cycle");
                token.cancel();
                wait.await
            }
        };
        let _ = cancel_on_drop.disarm();
        result
    }

    /// Spawn one thread per agent and return a handle to the run.
    ///
    /// If a thread cannot be spawned the agents already started are
    /// cancelled and joined before the error is returned.
    pub fn spawn(self) -> Result<HarnessHandle, HarnessError> {
        let Harness {
            config,
            mut observers,
        } = self;
        let size = config.agents;

        let ledger = config.audit.then(|| Arc::new(HoldLedger::new(size)));
        if let Some(ledger) = &ledger {
            observers.push(ledger.clone());
        }
        let observer: Arc<dyn ArbiterObserver> = match observers.len() {
            0 => Arc::new(NoopObserver),
            1 => observers.remove(0),
            _ => Arc::new(ObserverChain(observers)),
        };

        let arbiter = Arc::new(Arbiter::with_observer(size, observer)?);
        let token = CancellationToken::new();
        let control = Arc::new(config.run_control(token.clone()));
        let status = Arc::new(StatusCell::new(RunStatus::Running));
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);

        tracing::info!(
            parent: &span,
            agents = size,
            bounded = config.is_bounded(),
            audit = config.audit,
            "starting run"
        );

        let started = Instant::now();
        let mut workers: Vec<(AgentId, JoinHandle<AgentResult>)> = Vec::with_capacity(size);
        for index in 0..size {
            let id = AgentId::new(index);
            let arbiter = arbiter.clone();
            let control = control.clone();
            let timing = config.timing;
            let seed = config.seed;
            let span = span.clone();

            let spawned = thread::Builder::new()
                .name(id.to_string())
                .spawn(move || {
                    let _entered = span.enter();
                    // A failing agent takes the rest of the run down with it
                    let failure = control.token().clone().drop_guard();

                    let mut rng = match seed {
                        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                        None => StdRng::from_entropy(),
                    };
                    let mut agent = Agent::seated(id, &arbiter);
                    let result = agent.dine(&arbiter, &timing, &control, &mut rng);

                    if let Err(e) = &result {
                        tracing::error!(agent = %id, error = %e, "agent stopped on error");
                    } else {
                        let _ = failure.disarm();
                    }
                    result
                });

            match spawned {
                Ok(handle) => workers.push((id, handle)),
                Err(source) => {
                    token.cancel();
                    for (_, handle) in workers {
                        let _ = handle.join();
                    }
                    return Err(HarnessError::Spawn { agent: id, source });
                }
            }
        }

        Ok(HarnessHandle {
            run_id,
            status,
            token,
            arbiter,
            ledger,
            workers,
            started,
        })
    }
}

/// Handle to a run in progress.
///
/// Dropping the handle without joining leaves the agents running until
/// their bound is reached.
pub struct HarnessHandle {
    run_id: Uuid,
    status: Arc<StatusCell>,
    token: CancellationToken,
    arbiter: Arc<Arbiter>,
    ledger: Option<Arc<HoldLedger>>,
    workers: Vec<(AgentId, JoinHandle<AgentResult>)>,
    started: Instant,
}

impl HarnessHandle {
    /// Identifier of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current run status.
    pub fn status(&self) -> RunStatus {
        self.status.get()
    }

    /// The arbiter the agents share.
    pub fn arbiter(&self) -> Arc<Arbiter> {
        self.arbiter.clone()
    }

    /// A token that cancels this run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Ask every agent to stop at its next thinking boundary.
    ///
    /// Returns true if the run was still running when cancel was called.
    pub fn cancel(&self) -> bool {
        let was_running = self
            .status
            .transition(RunStatus::Running, RunStatus::Cancelled);
        self.token.cancel();
        was_running
    }

    /// Returns true once every agent thread has exited.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Block until every agent has stopped.
    ///
    /// Returns the first agent failure if any agent hit a contract violation
    /// or panicked; the remaining agents are cancelled in that case.
    pub fn join(self) -> Result<RunReport, HarnessError> {
        let mut agents = Vec::with_capacity(self.workers.len());
        let mut failure = None;

        for (id, handle) in self.workers {
            match handle.join() {
                Ok(Ok(report)) => agents.push(report),
                Ok(Err(source)) => {
                    self.token.cancel();
                    failure.get_or_insert(HarnessError::Agent { agent: id, source });
                }
                Err(_) => {
                    self.token.cancel();
                    failure.get_or_insert(HarnessError::AgentPanicked(id));
                }
            }
        }

        if let Some(error) = failure {
            self.status.set(RunStatus::Failed);
            tracing::error!(run_id = %self.run_id, error = %error, "run failed");
            return Err(error);
        }

        let status = if self.token.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        self.status.set(status);

        let report = RunReport {
            run_id: self.run_id,
            status,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            stats: self.arbiter.stats(),
            agents,
            audit: self.ledger.as_ref().map(|ledger| ledger.summary()),
        };
        tracing::info!(
            run_id = %report.run_id,
            status = %report.status,
            grants = report.stats.grants,
            "run finished"
        );
        Ok(report)
    }

    /// Wait for the run on tokio's blocking pool.
    pub async fn wait(self) -> Result<RunReport, HarnessError> {
        tokio::task::spawn_blocking(move || self.join()).await?
    }
}

/// Run `config` to its bound, or until `cancel` completes.
///
/// Cancellation lets every agent finish the cycle it is in, so the report
/// of a cancelled run still balances grants against releases.
pub async fn run_with_cancel<F>(config: HarnessConfig, cancel: F) -> Result<RunReport, HarnessError>
where
    F: Future<Output = ()>,
{
    Harness::new(config)?.run_until(cancel).await
}
