//! View state owned by the store.

use serde::Serialize;

use linewatch_core::model::{FailureRecord, ProductionLine, ProductionMetrics, Severity};
use linewatch_core::types::{DbId, Timestamp};

/// Lifecycle of the store's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No cycle has run yet.
    Uninitialized,
    /// The initial load is in flight.
    Loading,
    /// At least one cycle has committed.
    Ready,
    /// No cycle has ever committed and the last attempt failed.
    Error,
}

/// Result of one successful sync cycle, committed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub lines: Vec<ProductionLine>,
    pub metrics: ProductionMetrics,
    pub failures: Vec<FailureRecord>,
    pub synced_at: Timestamp,
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub lines: Vec<ProductionLine>,
    pub metrics: ProductionMetrics,
    pub failures: Vec<FailureRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub phase: SyncPhase,
    pub last_synced_at: Option<Timestamp>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            metrics: ProductionMetrics::default(),
            failures: Vec::new(),
            is_loading: false,
            error: None,
            phase: SyncPhase::Uninitialized,
            last_synced_at: None,
        }
    }
}

impl SyncState {
    /// Replace lines, metrics and failures in one step and clear any error.
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.lines = snapshot.lines;
        self.metrics = snapshot.metrics;
        self.failures = snapshot.failures;
        self.last_synced_at = Some(snapshot.synced_at);
        self.error = None;
        self.phase = SyncPhase::Ready;
    }

    /// Record a failed cycle. Data from the last commit is kept; the phase
    /// only becomes [`SyncPhase::Error`] when there is no such data.
    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.phase = if self.last_synced_at.is_some() {
            SyncPhase::Ready
        } else {
            SyncPhase::Error
        };
    }

    pub fn line(&self, line_id: DbId) -> Option<&ProductionLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: DbId) -> Option<&mut ProductionLine> {
        self.lines.iter_mut().find(|l| l.id == line_id)
    }

    /// Failures with `duration_ms` and `severity` recomputed as of `now`.
    pub fn failures_at(&self, now: Timestamp) -> Vec<FailureRecord> {
        self.failures
            .iter()
            .map(|f| {
                let duration_ms = f.duration_at(now);
                FailureRecord {
                    duration_ms,
                    severity: Severity::from_duration_ms(duration_ms),
                    ..f.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use linewatch_core::model::FailureStatus;

    use super::*;

    fn snapshot(at: Timestamp) -> Snapshot {
        Snapshot {
            lines: Vec::new(),
            metrics: ProductionMetrics::default(),
            failures: Vec::new(),
            synced_at: at,
        }
    }

    #[test]
    fn failure_before_first_commit_is_error_phase() {
        let mut state = SyncState::default();
        state.fail("boom".into());
        assert_eq!(state.phase, SyncPhase::Error);

        let at = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        state.commit(snapshot(at));
        assert_eq!(state.phase, SyncPhase::Ready);
        assert_eq!(state.error, None);
        assert_eq!(state.last_synced_at, Some(at));
    }

    #[test]
    fn failure_after_commit_keeps_ready_phase() {
        let mut state = SyncState::default();
        state.commit(snapshot(Utc::now()));
        state.phase = SyncPhase::Loading;
        state.fail("timeout".into());
        assert_eq!(state.phase, SyncPhase::Ready);
        assert_eq!(state.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn live_failure_durations_grow() {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let mut state = SyncState::default();
        state.failures.push(FailureRecord {
            id: 1,
            line_id: 1,
            stage: 2,
            start_time: start,
            end_time: None,
            duration_ms: 0,
            status: FailureStatus::Open,
            description: "Falta de peça".into(),
            severity: Severity::Low,
        });

        let first = state.failures_at(start + Duration::minutes(1));
        let second = state.failures_at(start + Duration::minutes(90));
        assert!(second[0].duration_ms > first[0].duration_ms);
        assert_eq!(first[0].severity, Severity::Low);
        assert_eq!(second[0].severity, Severity::High);
    }
}
