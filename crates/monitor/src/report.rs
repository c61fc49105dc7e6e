//! Plain-text summaries of the store state, logged after each change.

use chrono::FixedOffset;

use linewatch_core::derive::{completion_percentage, downtime_by_line};
use linewatch_core::format::{format_duration, format_duration_long, format_timestamp};
use linewatch_core::model::LineStatus;
use linewatch_core::types::Timestamp;
use linewatch_sync::state::SyncState;

/// One summary line per production line, e.g.
/// `Linha 1 [running] 127/150 (85%) downtime 0m 0s`.
pub fn line_summaries(state: &SyncState, now: Timestamp) -> Vec<String> {
    let downtime = downtime_by_line(&state.failures, now);
    state
        .lines
        .iter()
        .map(|line| {
            let mut summary = format!(
                "{} [{}] {}/{} ({}%) downtime {}",
                line.name,
                line.status.as_str(),
                line.current_production,
                line.target_production,
                completion_percentage(line.current_production, line.target_production),
                format_duration(downtime.get(&line.id).copied().unwrap_or(0)),
            );
            if line.status == LineStatus::Stopped && !line.issues.is_empty() {
                summary.push_str(": ");
                summary.push_str(&line.issues.join("; "));
            }
            summary
        })
        .collect()
}

/// Open failures, most severe first, e.g.
/// `#7 line 2 stage 3 high 1h 5m 2s since 02/06, 10:00:00`.
pub fn open_failure_summaries(state: &SyncState, now: Timestamp, offset: &FixedOffset) -> Vec<String> {
    let mut open: Vec<_> = state
        .failures_at(now)
        .into_iter()
        .filter(|f| f.is_open())
        .collect();
    open.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    open.into_iter()
        .map(|f| {
            format!(
                "#{} line {} stage {} {} {} since {}",
                f.id,
                f.line_id,
                f.stage,
                f.severity.as_str(),
                format_duration_long(f.duration_ms),
                format_timestamp(Some(f.start_time), offset),
            )
        })
        .collect()
}
