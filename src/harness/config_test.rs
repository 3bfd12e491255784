// ABOUTME: Tests for HarnessConfig defaults, validation, and file loading.
// ABOUTME: Uses tempfile for JSON config files.

use std::io::Write;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::HarnessConfig;
use crate::agent::{DurationRange, StopReason, Timing};
use crate::error::ConfigError;

#[test]
fn test_default_is_five_agents_unbounded() {
    let config = HarnessConfig::default();
    assert_eq!(config.agents, 5);
    assert_eq!(config.timing, Timing::default());
    assert!(!config.is_bounded());
    assert!(!config.audit);
    assert!(config.validate().is_ok());
}

#[test]
fn test_builder_sets_bounds() {
    let config = HarnessConfig::default()
        .agents(7)
        .cycles(3)
        .total_grants(100)
        .duration(Duration::from_secs(2))
        .seed(9)
        .audit(true)
        .think(DurationRange::fixed(5))
        .eat(DurationRange::new(1, 4));

    assert_eq!(config.agents, 7);
    assert_eq!(config.cycles, Some(3));
    assert_eq!(config.total_grants, Some(100));
    assert_eq!(config.duration_ms, Some(2000));
    assert_eq!(config.seed, Some(9));
    assert!(config.audit);
    assert_eq!(config.timing.think, DurationRange::fixed(5));
    assert_eq!(config.timing.eat, DurationRange::new(1, 4));
    assert!(config.is_bounded());
}

#[test]
fn test_validate_rejects_single_agent() {
    let config = HarnessConfig::default().agents(1);
    match config.validate().unwrap_err() {
        ConfigError::TooFewAgents(n) => assert_eq!(n, 1),
        other => panic!("Expected TooFewAgents, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_inverted_range() {
    let config = HarnessConfig::default().eat(DurationRange::new(10, 2));
    match config.validate().unwrap_err() {
        ConfigError::InvalidRange {
            name,
            min_ms,
            max_ms,
        } => {
            assert_eq!(name, "eat");
            assert_eq!(min_ms, 10);
            assert_eq!(max_ms, 2);
        }
        other => panic!("Expected InvalidRange, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_zero_poll_interval() {
    let config = HarnessConfig {
        poll_interval_ms: 0,
        ..HarnessConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ZeroPollInterval)
    ));
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config: HarnessConfig = serde_json::from_str(
        r#"{"agents": 8, "total_grants": 500, "timing": {"eat": {"min_ms": 0, "max_ms": 0}}}"#,
    )
    .unwrap();

    assert_eq!(config.agents, 8);
    assert_eq!(config.total_grants, Some(500));
    assert_eq!(config.timing.eat, DurationRange::zero());
    assert_eq!(config.timing.think, DurationRange::new(1000, 2000));
    assert_eq!(config.poll_interval_ms, 50);
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<HarnessConfig, _> = serde_json::from_str(r#"{"philosophers": 5}"#);
    assert!(result.is_err());
}

#[test]
fn test_from_file_loads_and_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"agents": 3, "cycles": 10, "seed": 1}}"#).unwrap();

    let config = HarnessConfig::from_file(file.path()).unwrap();
    assert_eq!(config.agents, 3);
    assert_eq!(config.cycles, Some(10));
    assert_eq!(config.seed, Some(1));
}

#[test]
fn test_from_file_rejects_invalid_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"agents": 1}}"#).unwrap();

    let result = HarnessConfig::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::TooFewAgents(1))));
}

#[test]
fn test_from_file_reports_bad_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    let result = HarnessConfig::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Json(_))));
}

#[test]
fn test_from_file_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = HarnessConfig::from_file(dir.path().join("missing.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_run_control_carries_bounds() {
    let config = HarnessConfig::default().cycles(2).total_grants(10);
    let token = CancellationToken::new();
    let control = config.run_control(token.clone());

    assert_eq!(control.grants_remaining(), Some(10));
    assert!(control.admit(0).is_ok());
    assert_eq!(control.admit(2), Err(StopReason::CyclesDone));
    assert_eq!(control.wait_interval(), Duration::from_millis(50));
    assert_eq!(control.starvation_limit(), Some(Duration::from_secs(10)));

    token.cancel();
    assert_eq!(control.admit(0), Err(StopReason::Cancelled));
}

#[test]
fn test_config_round_trips_through_json() {
    let config = HarnessConfig::default().agents(4).seed(3);
    let json = serde_json::to_string(&config).unwrap();
    let back: HarnessConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
