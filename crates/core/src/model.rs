//! View-model types rendered by the dashboard.
//!
//! These are rebuilt from backend responses on every sync cycle; nothing
//! here is persisted. Serialised field names are camelCase because the
//! presentation layer consumes them as JSON.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{DbId, StageId, Timestamp, STAGE_COUNT};

// ---------------------------------------------------------------------------
// ProductionLine
// ---------------------------------------------------------------------------

/// Operational status of a production line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Running,
    Stopped,
    Maintenance,
    Completed,
}

impl LineStatus {
    /// String representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Running => "running",
            LineStatus::Stopped => "stopped",
            LineStatus::Maintenance => "maintenance",
            LineStatus::Completed => "completed",
        }
    }
}

/// A manufacturing line with its derived production figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionLine {
    pub id: DbId,
    pub name: String,
    pub model: String,
    pub current_production: u32,
    pub target_production: u32,
    /// `round(current / target * 100)`, `0` when the target is `0`.
    pub efficiency: u32,
    /// Approximation: `Stopped` when the line has an open failure.
    pub status: LineStatus,
    /// Descriptions of the line's open failures, in backend order.
    pub issues: Vec<String>,
    pub last_update: Timestamp,
    pub products: Vec<Product>,
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    InProduction,
    Completed,
    Paused,
}

/// Per-stage start timestamps of a product.
///
/// Always exactly [`STAGE_COUNT`] slots. Serialises as epoch milliseconds
/// with `0` for stages not reached yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimes([Option<Timestamp>; STAGE_COUNT]);

impl StageTimes {
    pub fn new(times: [Option<Timestamp>; STAGE_COUNT]) -> Self {
        Self(times)
    }

    /// Timestamp recorded for `stage` (1-based). Out-of-range stages are
    /// treated as not reached.
    pub fn get(&self, stage: StageId) -> Option<Timestamp> {
        match stage {
            1..=5 => self.0[usize::from(stage) - 1],
            _ => None,
        }
    }

    /// Record the start of `stage`. Returns `false` for out-of-range stages.
    pub fn set(&mut self, stage: StageId, at: Timestamp) -> bool {
        match stage {
            1..=5 => {
                self.0[usize::from(stage) - 1] = Some(at);
                true
            }
            _ => false,
        }
    }

    /// Highest stage with a recorded start, or `0` if none started.
    pub fn highest_started(&self) -> StageId {
        self.0
            .iter()
            .rposition(Option::is_some)
            .map(|idx| idx as StageId + 1)
            .unwrap_or(0)
    }

    pub fn first(&self) -> Option<Timestamp> {
        self.0.iter().flatten().min().copied()
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.0.iter().flatten().max().copied()
    }

    /// Epoch milliseconds per stage, `0` meaning "not reached".
    pub fn as_millis(&self) -> [i64; STAGE_COUNT] {
        self.0.map(|t| t.map(|t| t.timestamp_millis()).unwrap_or(0))
    }
}

impl Serialize for StageTimes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_millis().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StageTimes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let millis = <[i64; STAGE_COUNT]>::deserialize(deserializer)?;
        let mut times = StageTimes::default();
        for (idx, ms) in millis.into_iter().enumerate() {
            if ms > 0 {
                let at = chrono::DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                    serde::de::Error::custom(format!("stage time {ms} out of range"))
                })?;
                times.0[idx] = Some(at);
            }
        }
        Ok(times)
    }
}

/// A unit moving through the line's stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub model: String,
    /// `0..=5`; `0` means not started.
    #[serde(default)]
    pub current_stage: StageId,
    /// `current_stage + 1`, or `None` at stage 5 or before the first stage.
    #[serde(default)]
    pub next_stage: Option<StageId>,
    #[serde(default)]
    pub stage_times: StageTimes,
    #[serde(rename = "totalActiveTime", default)]
    pub total_active_time_ms: i64,
    #[serde(rename = "idleTime", default)]
    pub idle_time_ms: i64,
    pub status: ProductStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl Product {
    /// Stage that follows `current`, if any.
    pub fn next_stage_after(current: StageId) -> Option<StageId> {
        match current {
            1..=4 => Some(current + 1),
            _ => None,
        }
    }
}

/// Input for adding a product to a line by hand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub serial_number: String,
    pub model: String,
    pub current_stage: StageId,
    pub status: ProductStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

// ---------------------------------------------------------------------------
// Production events
// ---------------------------------------------------------------------------

/// Operator action at a stage station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductionEventKind {
    Start,
    Stop,
}

impl ProductionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionEventKind::Start => "start",
            ProductionEventKind::Stop => "stop",
        }
    }
}

// ---------------------------------------------------------------------------
// FailureRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    Open,
    Resolved,
}

/// Failure severity. The backend never supplies one; it is derived from
/// how long the failure has lasted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Failures shorter than this are `Low`.
pub const SEVERITY_MEDIUM_AFTER_MS: i64 = 15 * 60 * 1000;
/// Failures at least this long are `High`.
pub const SEVERITY_HIGH_AFTER_MS: i64 = 60 * 60 * 1000;
/// Failures at least this long are `Critical`.
pub const SEVERITY_CRITICAL_AFTER_MS: i64 = 4 * 60 * 60 * 1000;

impl Severity {
    /// Classify a failure by its duration.
    pub fn from_duration_ms(duration_ms: i64) -> Self {
        if duration_ms >= SEVERITY_CRITICAL_AFTER_MS {
            Severity::Critical
        } else if duration_ms >= SEVERITY_HIGH_AFTER_MS {
            Severity::High
        } else if duration_ms >= SEVERITY_MEDIUM_AFTER_MS {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A stoppage reported against one stage of a line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub id: DbId,
    pub line_id: DbId,
    pub stage: StageId,
    pub start_time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    /// Duration as of the moment the record was mapped.
    #[serde(rename = "duration")]
    pub duration_ms: i64,
    pub status: FailureStatus,
    pub description: String,
    pub severity: Severity,
}

impl FailureRecord {
    pub fn is_open(&self) -> bool {
        self.status == FailureStatus::Open
    }

    /// Duration as of `now`: `now - start` while open, `end - start` once
    /// resolved. Never negative.
    pub fn duration_at(&self, now: Timestamp) -> i64 {
        let end = match (self.status, self.end_time) {
            (FailureStatus::Resolved, Some(end)) => end,
            (FailureStatus::Resolved, None) => return self.duration_ms,
            (FailureStatus::Open, _) => now,
        };
        (end - self.start_time).num_milliseconds().max(0)
    }

    /// Mark the record resolved at `at`, fixing its duration.
    pub fn resolve(&mut self, at: Timestamp) {
        self.status = FailureStatus::Resolved;
        self.end_time = Some(at);
        self.duration_ms = (at - self.start_time).num_milliseconds().max(0);
        self.severity = Severity::from_duration_ms(self.duration_ms);
    }
}

// ---------------------------------------------------------------------------
// ProductionMetrics
// ---------------------------------------------------------------------------

/// Dashboard-wide aggregates. Derived from the lines and failures of one
/// sync cycle; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductionMetrics {
    pub total_produced: u32,
    pub total_target: u32,
    pub overall_efficiency: u32,
    pub active_lines: u32,
    pub total_issues: u32,
    /// Mean active time of completed products, in minutes.
    #[serde(rename = "averageCycleTime")]
    pub average_cycle_time_min: f64,
}

// ---------------------------------------------------------------------------
// ProductAnalysis
// ---------------------------------------------------------------------------

/// Time spent in one stage by a single product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBreakdown {
    pub stage_id: StageId,
    pub stage_name: String,
    pub duration_ms: i64,
    pub idle_ms: i64,
}

/// Per-stage breakdown for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    pub product_id: DbId,
    pub serial_number: Option<String>,
    pub line_id: DbId,
    pub overall_status: Option<String>,
    pub stages: Vec<StageBreakdown>,
    pub total_idle_ms: i64,
}
