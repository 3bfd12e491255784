// ABOUTME: Tests for the harness runner: bounds, cancellation, and reporting.
// ABOUTME: Runs real agent threads with zero or tiny think/eat durations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::config::HarnessConfig;
use super::runner::{Harness, run_with_cancel};
use super::status::RunStatus;
use crate::agent::{AgentId, DurationRange, StopReason, Timing};
use crate::arbiter::{ArbiterObserver, Pair};
use crate::error::{ConfigError, HarnessError};

fn fast_config() -> HarnessConfig {
    HarnessConfig::default().timing(Timing::instant()).seed(42)
}

#[test]
fn test_run_completes_cycle_bound() {
    let report = Harness::new(fast_config().cycles(20)).unwrap().run().unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.agents.len(), 5);
    for (i, agent) in report.agents.iter().enumerate() {
        assert_eq!(agent.agent, AgentId::new(i));
        assert_eq!(agent.meals, 20);
        assert_eq!(agent.stopped_by, StopReason::CyclesDone);
    }
    assert_eq!(report.stats.grants, 100);
    assert_eq!(report.stats.releases, 100);
    assert_eq!(report.stats.held, 0);
    assert!(report.audit.is_none());
}

#[test]
fn test_grant_budget_is_exact_system_wide() {
    let config = fast_config().total_grants(1000).audit(true);
    let report = Harness::new(config).unwrap().run().unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.total_meals(), 1000);
    assert_eq!(report.stats.grants, 1000);
    assert_eq!(report.stats.releases, 1000);

    let audit = report.audit.expect("audited run has a summary");
    assert_eq!(audit.grants, 1000);
    assert_eq!(audit.releases, 1000);
    assert_eq!(audit.violations, 0);
}

#[test]
fn test_duration_bound_stops_every_agent() {
    let config = fast_config()
        .think(DurationRange::fixed(1))
        .eat(DurationRange::fixed(1))
        .duration(Duration::from_millis(100));
    let report = Harness::new(config).unwrap().run().unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(
        report
            .agents
            .iter()
            .all(|a| a.stopped_by == StopReason::DeadlinePassed)
    );
    assert_eq!(report.stats.grants, report.stats.releases);
}

#[test]
fn test_cancel_unbounded_run() {
    let config = fast_config()
        .think(DurationRange::fixed(1))
        .eat(DurationRange::fixed(1));
    let handle = Harness::new(config).unwrap().spawn().unwrap();
    assert_eq!(handle.status(), RunStatus::Running);

    std::thread::sleep(Duration::from_millis(50));
    assert!(handle.cancel());
    assert_eq!(handle.status(), RunStatus::Cancelled);
    // Second cancel finds the run no longer running
    assert!(!handle.cancel());

    let report = handle.join().unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.stats.grants, report.stats.releases);
    assert_eq!(report.stats.held, 0);
    assert!(
        report
            .agents
            .iter()
            .all(|a| a.stopped_by == StopReason::Cancelled)
    );
}

#[test]
fn test_external_token_cancels_run() {
    let handle = Harness::new(fast_config()).unwrap().spawn().unwrap();
    let token = handle.cancellation_token();
    token.cancel();

    let report = handle.join().unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
}

#[test]
fn test_harness_rejects_invalid_config() {
    let result = Harness::new(HarnessConfig::default().agents(1));
    assert!(matches!(
        result,
        Err(HarnessError::Config(ConfigError::TooFewAgents(1)))
    ));
}

struct Counter {
    grants: AtomicU64,
    releases: AtomicU64,
}

impl ArbiterObserver for Counter {
    fn granted(&self, _agent: AgentId, _pair: Pair) {
        self.grants.fetch_add(1, Ordering::SeqCst);
    }

    fn released(&self, _agent: AgentId, _pair: Pair) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_observer_and_audit_both_see_run() {
    let counter = Arc::new(Counter {
        grants: AtomicU64::new(0),
        releases: AtomicU64::new(0),
    });
    let config = fast_config().agents(6).total_grants(300).audit(true);
    let report = Harness::new(config)
        .unwrap()
        .observer(counter.clone())
        .run()
        .unwrap();

    assert_eq!(counter.grants.load(Ordering::SeqCst), 300);
    assert_eq!(counter.releases.load(Ordering::SeqCst), 300);
    assert_eq!(report.audit.unwrap().grants, 300);
}

#[test]
fn test_handle_exposes_shared_arbiter() {
    let handle = Harness::new(fast_config().cycles(5)).unwrap().spawn().unwrap();
    let arbiter = handle.arbiter();
    assert_eq!(arbiter.size(), 5);

    let run_id = handle.run_id();
    let report = handle.join().unwrap();
    assert_eq!(report.run_id, run_id);
    assert_eq!(arbiter.stats().grants, 25);
}

#[test]
fn test_report_summary_and_json() {
    let report = Harness::new(fast_config().agents(3).cycles(2))
        .unwrap()
        .run()
        .unwrap();

    let summary = report.summary();
    assert!(summary.contains("completed"));
    assert!(summary.contains("6 grants"));
    assert!(summary.contains("[2, 2, 2]"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "completed");
    assert_eq!(json["stats"]["grants"], 6);
    assert_eq!(json["agents"][0]["stopped_by"], "cycles_done");
    assert_eq!(json["agents"][2]["pair"]["right"], 0);
}

#[test]
fn test_wait_with_blocking_executor() {
    let handle = Harness::new(fast_config().cycles(3)).unwrap().spawn().unwrap();
    let report = tokio_test::block_on(handle.wait()).unwrap();
    assert_eq!(report.total_meals(), 15);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_cancel_reaches_bound() {
    let report = run_with_cancel(fast_config().total_grants(200), std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stats.grants, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_cancel_stops_unbounded_run() {
    let config = fast_config()
        .think(DurationRange::fixed(1))
        .eat(DurationRange::fixed(1));
    let cancel = tokio::time::sleep(Duration::from_millis(50));

    let report = tokio::time::timeout(Duration::from_secs(10), run_with_cancel(config, cancel))
        .await
        .expect("run should stop after cancellation")
        .unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.stats.grants, report.stats.releases);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropped_run_future_stops_agents() {
    let counter = Arc::new(Counter {
        grants: AtomicU64::new(0),
        releases: AtomicU64::new(0),
    });
    let harness = Harness::new(
        fast_config()
            .think(DurationRange::fixed(1))
            .eat(DurationRange::fixed(1)),
    )
    .unwrap()
    .observer(counter.clone());

    let run = harness.run_until(std::future::pending::<()>());
    let timed_out = tokio::time::timeout(Duration::from_millis(100), run).await;
    assert!(timed_out.is_err());
    assert!(counter.grants.load(Ordering::SeqCst) > 0);

    // Agents finish the cycle they are in, then stay stopped
    tokio::time::sleep(Duration::from_millis(300)).await;
    let grants = counter.grants.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(counter.grants.load(Ordering::SeqCst), grants);
    assert_eq!(counter.releases.load(Ordering::SeqCst), grants);
}

#[test]
fn test_status_is_running_until_joined() {
    let handle = Harness::new(fast_config().cycles(2)).unwrap().spawn().unwrap();
    assert_eq!(handle.status(), RunStatus::Running);
    assert!(!handle.status().is_terminal());

    let report = handle.join().unwrap();
    assert!(report.status.is_terminal());
}

#[tokio::test]
async fn test_run_with_cancel_rejects_invalid_config() {
    let result = run_with_cancel(HarnessConfig::default().agents(0), async {}).await;
    assert!(matches!(result, Err(HarnessError::Config(_))));
}
