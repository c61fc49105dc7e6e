//! One sync cycle: concurrent fetch, then pure derivation.

use chrono::Utc;
use futures::future::join_all;

use linewatch_client::backend::ProductionBackend;
use linewatch_client::error::ApiError;
use linewatch_client::mapping::{map_alerts, map_line_product};
use linewatch_client::wire::{AlertDto, DailyTargetsDto, LineAnalysisDto};
use linewatch_core::catalog::{LineCatalog, LineDefinition};
use linewatch_core::derive::{aggregate_metrics, derive_line_status, efficiency, line_issues};
use linewatch_core::model::{FailureRecord, ProductionLine};
use linewatch_core::types::{DbId, Timestamp};

use crate::state::Snapshot;

/// Raw responses gathered by [`fetch`].
#[derive(Debug, Default)]
pub struct CycleInputs {
    pub alerts: Vec<AlertDto>,
    pub targets: Option<DailyTargetsDto>,
    /// One entry per catalog line, in catalog order. `None` when the line
    /// has no analysis today or its request failed.
    pub analyses: Vec<Option<LineAnalysisDto>>,
}

async fn fetch_line(backend: &dyn ProductionBackend, line_id: DbId) -> Option<LineAnalysisDto> {
    match backend.get_line_analysis(line_id).await {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!(line_id, error = %e, "Line analysis failed, line degraded for this cycle");
            None
        }
    }
}

/// Fetch alerts, daily targets and every line's analysis concurrently.
///
/// Alerts and targets are required: either failing fails the cycle. A
/// failing line analysis only degrades that line.
pub async fn fetch(
    backend: &dyn ProductionBackend,
    catalog: &LineCatalog,
) -> Result<CycleInputs, ApiError> {
    let per_line = join_all(catalog.ids().map(|id| fetch_line(backend, id)));
    let (alerts, targets, analyses) =
        tokio::join!(backend.get_alerts(), backend.get_daily_targets(), per_line);

    Ok(CycleInputs {
        alerts: alerts?,
        targets: targets?,
        analyses,
    })
}

fn build_line(
    def: &LineDefinition,
    analysis: Option<LineAnalysisDto>,
    target: u32,
    failures: &[FailureRecord],
    now: Timestamp,
) -> ProductionLine {
    let (current_production, products) = match analysis {
        Some(analysis) => (
            analysis.produtos_concluidos,
            analysis
                .analise_produtos
                .into_iter()
                .map(|p| map_line_product(p, &def.model))
                .collect(),
        ),
        None => (0, Vec::new()),
    };

    ProductionLine {
        id: def.id,
        name: def.name.clone(),
        model: def.model.clone(),
        current_production,
        target_production: target,
        efficiency: efficiency(current_production, target),
        status: derive_line_status(failures, def.id),
        issues: line_issues(failures, def.id),
        last_update: now,
        products,
    }
}

/// Turn fetched responses into a snapshot. Pure; `now` fixes open failure
/// durations and every line's `last_update`.
pub fn derive_snapshot(catalog: &LineCatalog, inputs: CycleInputs, now: Timestamp) -> Snapshot {
    let failures = map_alerts(inputs.alerts, now);
    let targets = inputs.targets.unwrap_or_default();

    let lines: Vec<ProductionLine> = catalog
        .lines()
        .iter()
        .zip(inputs.analyses.into_iter().chain(std::iter::repeat_with(|| None)))
        .map(|(def, analysis)| {
            let target = targets.target_for(def.id).unwrap_or(0);
            build_line(def, analysis, target, &failures, now)
        })
        .collect();
    let metrics = aggregate_metrics(&lines, &failures);

    Snapshot {
        lines,
        metrics,
        failures,
        synced_at: now,
    }
}

/// Fetch and derive a full snapshot.
pub async fn run(backend: &dyn ProductionBackend, catalog: &LineCatalog) -> Result<Snapshot, ApiError> {
    let inputs = fetch(backend, catalog).await?;
    Ok(derive_snapshot(catalog, inputs, Utc::now()))
}
