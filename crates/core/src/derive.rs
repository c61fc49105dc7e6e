//! Pure derivation of view-model figures from backend facts.
//!
//! No I/O. The sync engine fetches raw data and passes it in; everything
//! that turns counts and failures into percentages and statuses lives here.

use std::collections::BTreeMap;

use crate::model::{
    FailureRecord, LineStatus, ProductStatus, ProductionLine, ProductionMetrics,
};
use crate::types::{DbId, StageId, Timestamp, STAGE_COUNT};

/// Milliseconds per minute.
const MS_PER_MINUTE: f64 = 60_000.0;

// ---------------------------------------------------------------------------
// Efficiency
// ---------------------------------------------------------------------------

/// `round(produced / target * 100)`, or `0` when `target` is `0`.
///
/// Not clamped: a line over its target reports more than 100.
pub fn efficiency(produced: u32, target: u32) -> u32 {
    if target == 0 {
        return 0;
    }
    (f64::from(produced) / f64::from(target) * 100.0).round() as u32
}

/// Alias used by the goal widgets, which call the same figure "completion".
pub fn completion_percentage(produced: u32, target: u32) -> u32 {
    efficiency(produced, target)
}

// ---------------------------------------------------------------------------
// Line status and issues
// ---------------------------------------------------------------------------

/// Open failures belonging to `line_id`, in input order.
pub fn open_failures_for_line<'a>(
    failures: &'a [FailureRecord],
    line_id: DbId,
) -> impl Iterator<Item = &'a FailureRecord> + 'a {
    failures
        .iter()
        .filter(move |f| f.line_id == line_id && f.is_open())
}

/// `Stopped` if the line has any open failure, `Running` otherwise.
pub fn derive_line_status(failures: &[FailureRecord], line_id: DbId) -> LineStatus {
    if open_failures_for_line(failures, line_id).next().is_some() {
        LineStatus::Stopped
    } else {
        LineStatus::Running
    }
}

/// Descriptions of the line's open failures.
pub fn line_issues(failures: &[FailureRecord], line_id: DbId) -> Vec<String> {
    open_failures_for_line(failures, line_id)
        .map(|f| f.description.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Product stage
// ---------------------------------------------------------------------------

/// Current stage of a product: `STAGE_COUNT` once completed, otherwise the
/// highest stage with a recorded start (`0` if none).
pub fn derive_current_stage(highest_started: StageId, status: ProductStatus) -> StageId {
    if status == ProductStatus::Completed {
        STAGE_COUNT as StageId
    } else {
        highest_started.min(STAGE_COUNT as StageId)
    }
}

/// Progress of `stage` relative to a product sitting at `current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageProgress {
    Completed,
    Current,
    Pending,
}

impl StageProgress {
    pub fn of(current: StageId, stage: StageId) -> Self {
        if stage < current {
            StageProgress::Completed
        } else if stage == current {
            StageProgress::Current
        } else {
            StageProgress::Pending
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Aggregate per-line figures into dashboard metrics.
pub fn aggregate_metrics(lines: &[ProductionLine], failures: &[FailureRecord]) -> ProductionMetrics {
    let total_produced: u32 = lines.iter().map(|l| l.current_production).sum();
    let total_target: u32 = lines.iter().map(|l| l.target_production).sum();
    let active_lines = lines
        .iter()
        .filter(|l| l.status == LineStatus::Running)
        .count() as u32;
    let total_issues = failures.iter().filter(|f| f.is_open()).count() as u32;

    ProductionMetrics {
        total_produced,
        total_target,
        overall_efficiency: efficiency(total_produced, total_target),
        active_lines,
        total_issues,
        average_cycle_time_min: average_cycle_time_min(lines),
    }
}

/// Mean active time of completed products across all lines, in minutes,
/// rounded to one decimal. `0.0` when nothing has completed.
pub fn average_cycle_time_min(lines: &[ProductionLine]) -> f64 {
    let (sum_ms, count) = lines
        .iter()
        .flat_map(|l| &l.products)
        .filter(|p| p.status == ProductStatus::Completed)
        .fold((0i64, 0u32), |(sum, n), p| (sum + p.total_active_time_ms, n + 1));

    if count == 0 {
        return 0.0;
    }
    let minutes = sum_ms as f64 / f64::from(count) / MS_PER_MINUTE;
    (minutes * 10.0).round() / 10.0
}

/// Accumulated downtime per line as of `now`. Open failures count up to
/// `now`; resolved ones contribute their fixed duration.
pub fn downtime_by_line(failures: &[FailureRecord], now: Timestamp) -> BTreeMap<DbId, i64> {
    let mut downtime = BTreeMap::new();
    for failure in failures {
        *downtime.entry(failure.line_id).or_insert(0) += failure.duration_at(now);
    }
    downtime
}
