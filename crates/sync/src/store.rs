//! The production store: view state, sync cycles and mutations.
//!
//! [`ProductionStore`] is created once and shared as `Arc<ProductionStore>`
//! between the [`crate::poller::Poller`] and whatever presents the data.
//!
//! Sync cycles are serialised by a cycle guard. Timer ticks use
//! [`ProductionStore::refresh`], which skips when a cycle is already in
//! flight; mutations that need fresh data use [`ProductionStore::resync`],
//! which waits its turn. Either way at most one cycle commits at a time, so
//! an older response can never overwrite a newer one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, RwLock};

use linewatch_client::backend::ProductionBackend;
use linewatch_client::mapping::{map_alert, map_product_analysis, product_id_of};
use linewatch_core::catalog::{LineCatalog, LineDefinition};
use linewatch_core::error::CoreError;
use linewatch_core::model::{
    FailureRecord, LineStatus, NewProduct, Product, ProductAnalysis, ProductionEventKind,
    ProductionMetrics,
};
use linewatch_core::types::{DbId, StageId};
use linewatch_core::validation::{
    normalize_product_id, normalize_serial_number, parse_daily_goal, validate_daily_goal,
    validate_stage,
};

use crate::cycle;
use crate::error::SyncError;
use crate::events::{StoreEvent, EVENT_CHANNEL_CAPACITY};
use crate::state::{SyncPhase, SyncState};

/// What a [`ProductionStore::refresh`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A cycle ran and its snapshot was committed.
    Committed,
    /// Another cycle was in flight; nothing was fetched.
    Skipped,
}

pub struct ProductionStore {
    backend: Arc<dyn ProductionBackend>,
    catalog: LineCatalog,
    state: RwLock<SyncState>,
    /// Held for the duration of a cycle or a local patch.
    cycle_guard: Mutex<()>,
    /// Product analyses already fetched, by product id.
    analyses: RwLock<HashMap<String, ProductAnalysis>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl ProductionStore {
    pub fn new(backend: Arc<dyn ProductionBackend>, catalog: LineCatalog) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            catalog,
            state: RwLock::new(SyncState::default()),
            cycle_guard: Mutex::new(()),
            analyses: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    pub fn catalog(&self) -> &LineCatalog {
        &self.catalog
    }

    /// Subscribe to state change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    /// A copy of the current view state.
    pub async fn state(&self) -> SyncState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> SyncPhase {
        self.state.read().await.phase
    }

    /// Current failures with open durations computed as of now.
    pub async fn live_failures(&self) -> Vec<FailureRecord> {
        self.state.read().await.failures_at(Utc::now())
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    // ---- sync cycles ----

    /// First load: flags `is_loading` while the cycle runs.
    pub async fn initial_load(&self) -> Result<(), SyncError> {
        let _guard = self.cycle_guard.lock().await;
        {
            let mut state = self.state.write().await;
            state.is_loading = true;
            state.phase = SyncPhase::Loading;
        }
        self.run_cycle(true).await
    }

    /// Background refresh. Skips when a cycle is already in flight.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            tracing::debug!("Sync cycle already in flight, skipping refresh");
            return Ok(RefreshOutcome::Skipped);
        };
        self.run_cycle(false).await?;
        Ok(RefreshOutcome::Committed)
    }

    /// Full refresh that waits for any in-flight cycle instead of skipping.
    pub async fn resync(&self) -> Result<(), SyncError> {
        let _guard = self.cycle_guard.lock().await;
        self.run_cycle(false).await
    }

    /// Must be called with `cycle_guard` held.
    async fn run_cycle(&self, loading: bool) -> Result<(), SyncError> {
        let started = Instant::now();
        let result = cycle::run(self.backend.as_ref(), &self.catalog).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut state = self.state.write().await;
        if loading {
            state.is_loading = false;
        }
        match result {
            Ok(snapshot) => {
                let event = StoreEvent::SnapshotReplaced {
                    synced_at: snapshot.synced_at,
                    lines: snapshot.lines.len(),
                    open_failures: snapshot.failures.iter().filter(|f| f.is_open()).count(),
                };
                state.commit(snapshot);
                drop(state);
                tracing::debug!(elapsed_ms, "Sync cycle committed");
                self.emit(event);
                Ok(())
            }
            Err(e) => {
                state.fail(e.to_string());
                drop(state);
                tracing::warn!(elapsed_ms, error = %e, "Sync cycle failed");
                self.emit(StoreEvent::SyncFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Resync after a mutation. The mutation already succeeded, so a failed
    /// resync is recorded in state rather than returned.
    async fn resync_after_mutation(&self) {
        if let Err(e) = self.resync().await {
            tracing::warn!(error = %e, "Resync after mutation failed");
        }
    }

    // ---- reads outside the cycle ----

    /// Per-stage analysis of a product. Served from cache after the first
    /// successful lookup; `Ok(None)` when the backend does not know it.
    pub async fn product_analysis(&self, product_id: &str) -> Result<Option<ProductAnalysis>, SyncError> {
        let product_id = normalize_product_id(product_id)?;
        if let Some(cached) = self.analyses.read().await.get(&product_id) {
            return Ok(Some(cached.clone()));
        }

        let Some(dto) = self.backend.get_product_analysis(&product_id).await? else {
            tracing::debug!(product_id = %product_id, "Product analysis not found");
            return Ok(None);
        };
        let analysis = map_product_analysis(dto);
        self.analyses
            .write()
            .await
            .insert(product_id, analysis.clone());
        Ok(Some(analysis))
    }

    pub async fn clear_analysis_cache(&self) {
        self.analyses.write().await.clear();
    }

    /// Aggregates as computed by the backend itself, for cross-checking the
    /// locally derived [`SyncState::metrics`].
    pub async fn backend_metrics(&self) -> Result<ProductionMetrics, SyncError> {
        Ok(self.backend.get_production_metrics().await?)
    }

    // ---- mutations ----

    /// Set a line's status and patch it locally.
    pub async fn update_line_status(&self, line_id: DbId, status: LineStatus) -> Result<(), SyncError> {
        self.catalog.require(line_id)?;
        self.backend.update_line_status(line_id, status).await?;

        let _guard = self.cycle_guard.lock().await;
        if let Some(line) = self.state.write().await.line_mut(line_id) {
            line.status = status;
            line.last_update = Utc::now();
        }
        tracing::info!(line_id, status = status.as_str(), "Line status updated");
        self.emit(StoreEvent::LinePatched { line_id });
        Ok(())
    }

    /// Add a product to a line and append the backend's copy locally.
    pub async fn add_product(&self, line_id: DbId, product: NewProduct) -> Result<Product, SyncError> {
        self.catalog.require(line_id)?;
        let product = NewProduct {
            serial_number: normalize_serial_number(&product.serial_number)?,
            ..product
        };
        let created = self.backend.add_product_to_line(line_id, &product).await?;

        let _guard = self.cycle_guard.lock().await;
        if let Some(line) = self.state.write().await.line_mut(line_id) {
            line.products.push(created.clone());
        }
        tracing::info!(line_id, product_id = %created.id, "Product added to line");
        self.emit(StoreEvent::LinePatched { line_id });
        Ok(created)
    }

    /// Open a failure on a line's stage and append it locally.
    pub async fn report_failure(&self, line_id: DbId, stage: StageId) -> Result<FailureRecord, SyncError> {
        self.catalog.require(line_id)?;
        validate_stage(stage)?;
        let dto = self.backend.create_alert(line_id, stage).await?;
        let record = map_alert(dto, Utc::now());

        let _guard = self.cycle_guard.lock().await;
        {
            let mut state = self.state.write().await;
            state.failures.retain(|f| f.id != record.id);
            state.failures.push(record.clone());
        }
        tracing::info!(line_id, stage, failure_id = record.id, "Failure reported");
        self.emit(StoreEvent::FailureReported {
            line_id,
            stage,
            failure_id: record.id,
        });
        Ok(record)
    }

    /// Resolve the open failure(s) on a line's stage. Returns how many local
    /// records were marked resolved.
    pub async fn resolve_failure(&self, line_id: DbId, stage: StageId) -> Result<usize, SyncError> {
        self.catalog.require(line_id)?;
        validate_stage(stage)?;
        let dto = self.backend.resolve_alert(line_id, stage).await?;
        let resolved_at = dto.fim_alerta_ts.unwrap_or_else(Utc::now);

        let _guard = self.cycle_guard.lock().await;
        let count = {
            let mut state = self.state.write().await;
            let mut count = 0;
            for failure in state
                .failures
                .iter_mut()
                .filter(|f| f.line_id == line_id && f.stage == stage && f.is_open())
            {
                failure.resolve(resolved_at);
                count += 1;
            }
            count
        };
        tracing::info!(line_id, stage, count, "Failures resolved");
        self.emit(StoreEvent::FailuresResolved {
            line_id,
            stage,
            count,
        });
        Ok(count)
    }

    /// Set a line's daily goal, then resync.
    pub async fn set_daily_production_goal(&self, line_id: DbId, goal: i64) -> Result<(), SyncError> {
        let goal = validate_daily_goal(goal)?;
        self.submit_goal(line_id, goal).await
    }

    /// Like [`Self::set_daily_production_goal`] for raw text input.
    pub async fn set_daily_production_goal_input(&self, line_id: DbId, raw: &str) -> Result<(), SyncError> {
        let goal = parse_daily_goal(raw)?;
        self.submit_goal(line_id, goal).await
    }

    async fn submit_goal(&self, line_id: DbId, goal: u32) -> Result<(), SyncError> {
        self.catalog.require(line_id)?;
        self.backend.set_daily_production_goal(line_id, goal).await?;
        tracing::info!(line_id, goal, "Daily goal set");
        self.resync_after_mutation().await;
        Ok(())
    }

    /// Record a start/stop at a stage, then resync. Returns the id of the
    /// affected product when the backend reports one.
    pub async fn process_production_event(
        &self,
        kind: ProductionEventKind,
        stage: StageId,
        line_id: DbId,
    ) -> Result<Option<String>, SyncError> {
        self.catalog.require(line_id)?;
        validate_stage(stage)?;
        let ack = self
            .backend
            .process_production_event(kind, stage, line_id)
            .await?;
        let product_id = product_id_of(&ack);
        tracing::info!(line_id, stage, kind = kind.as_str(), ?product_id, "Production event recorded");
        self.resync_after_mutation().await;
        Ok(product_id)
    }

    /// Attach a scanned serial to the line's in-progress product, then
    /// resync. Returns the product id when the backend reports one.
    pub async fn associate_serial_number(&self, serial: &str, line_id: DbId) -> Result<Option<String>, SyncError> {
        let serial = normalize_serial_number(serial)?;
        self.catalog.require(line_id)?;
        let ack = self.backend.associate_serial_number(&serial, line_id).await?;
        let product_id = product_id_of(&ack);
        tracing::info!(line_id, serial = %serial, ?product_id, "Serial number associated");
        self.resync_after_mutation().await;
        Ok(product_id)
    }
}

/// Build a catalog from the lines the backend reports. Missing names and
/// models fall back to the floor defaults.
pub async fn discover_catalog(backend: &dyn ProductionBackend) -> Result<LineCatalog, SyncError> {
    let mut infos = backend.get_production_lines().await?;
    let mut seen = Vec::with_capacity(infos.len());
    infos.retain(|info| {
        let fresh = !seen.contains(&info.id);
        seen.push(info.id);
        fresh
    });
    if infos.is_empty() {
        return Err(CoreError::Validation("backend reported no production lines".into()).into());
    }

    let defaults = LineCatalog::from_ids(infos.iter().map(|info| info.id));
    let lines: Vec<LineDefinition> = infos
        .into_iter()
        .zip(defaults.lines())
        .map(|(info, default)| {
            LineDefinition::new(
                info.id,
                info.name.unwrap_or_else(|| default.name.clone()),
                info.model.unwrap_or_else(|| default.model.clone()),
            )
        })
        .collect();
    tracing::info!(lines = lines.len(), "Discovered production lines");
    Ok(LineCatalog::new(lines))
}
