// ABOUTME: RunStatus for a harness run, stored in an atomic for lock-free reads.
// ABOUTME: Shared between the handle and whoever polls it while agents run.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Where a harness run stands.
///
/// A run is `Running` from the moment `spawn` returns its handle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Agents are cycling.
    Running,
    /// Every agent reached its bound.
    Completed,
    /// An agent hit a contract violation or panicked.
    Failed,
    /// The run was cancelled before reaching its bound.
    Cancelled,
}

impl RunStatus {
    /// Indexed by discriminant.
    const BY_CODE: [RunStatus; 4] = [
        RunStatus::Running,
        RunStatus::Completed,
        RunStatus::Failed,
        RunStatus::Cancelled,
    ];

    /// Whether the run is over.
    pub fn is_terminal(self) -> bool {
        self != RunStatus::Running
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// RunStatus behind an `AtomicU8`, shared by the handle and its pollers.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new(status: RunStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn get(&self) -> RunStatus {
        let code = self.0.load(Ordering::SeqCst);
        // Only `set` and `transition` write the cell, so the code is in range
        RunStatus::BY_CODE
            .get(usize::from(code))
            .copied()
            .unwrap_or(RunStatus::Failed)
    }

    pub(crate) fn set(&self, status: RunStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }

    /// Move from `current` to `next` only if nobody changed it meanwhile.
    pub(crate) fn transition(&self, current: RunStatus, next: RunStatus) -> bool {
        self.0
            .compare_exchange(current as u8, next as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_reads_back_every_status() {
        let cell = StatusCell::new(RunStatus::Running);
        for status in RunStatus::BY_CODE {
            cell.set(status);
            assert_eq!(cell.get(), status);
        }
    }

    #[test]
    fn test_only_running_is_live() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_cancel_loses_to_earlier_finish() {
        let cell = StatusCell::new(RunStatus::Running);
        cell.set(RunStatus::Completed);
        assert!(!cell.transition(RunStatus::Running, RunStatus::Cancelled));
        assert_eq!(cell.get(), RunStatus::Completed);
    }

    #[test]
    fn test_cancel_wins_while_running() {
        let cell = StatusCell::new(RunStatus::Running);
        assert!(cell.transition(RunStatus::Running, RunStatus::Cancelled));
        assert_eq!(cell.get(), RunStatus::Cancelled);
    }

    #[test]
    fn test_labels_match_json() {
        for status in RunStatus::BY_CODE {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
