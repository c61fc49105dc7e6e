//! The seam between the sync engine and the network.
//!
//! [`ProductionBackend`] has one method per backend operation. The sync
//! engine only ever talks to a `dyn ProductionBackend`, so tests can drive
//! it with an in-memory fake instead of [`crate::api::ProductionApi`].

use async_trait::async_trait;

use linewatch_core::model::{
    LineStatus, NewProduct, Product, ProductionEventKind, ProductionMetrics,
};
use linewatch_core::types::{DbId, StageId};

use crate::error::ApiError;
use crate::wire::{AlertDto, DailyTargetsDto, LineAnalysisDto, LineInfoDto, ProductAnalysisDto};

/// Backend operations, grouped by the absence policy of each endpoint.
///
/// Methods returning `Option`/`Vec` report a 404 as `Ok(None)`/`Ok(vec![])`.
/// All other methods report a 404 as [`ApiError::Status`]; use
/// [`ApiError::is_not_found`] to tell it apart from other failures.
#[async_trait]
pub trait ProductionBackend: Send + Sync {
    // ---- reads with "absent" semantics ----

    /// Today's analysis for one line.
    async fn get_line_analysis(&self, line_id: DbId) -> Result<Option<LineAnalysisDto>, ApiError>;

    /// Per-stage analysis of one product.
    async fn get_product_analysis(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductAnalysisDto>, ApiError>;

    /// Today's goals for every line.
    async fn get_daily_targets(&self) -> Result<Option<DailyTargetsDto>, ApiError>;

    /// All open and closed alerts.
    async fn get_alerts(&self) -> Result<Vec<AlertDto>, ApiError>;

    // ---- reads where absence is an error ----

    /// Lines registered on the backend.
    async fn get_production_lines(&self) -> Result<Vec<LineInfoDto>, ApiError>;

    /// Aggregates as computed by the backend.
    async fn get_production_metrics(&self) -> Result<ProductionMetrics, ApiError>;

    // ---- writes ----

    async fn set_daily_production_goal(&self, line_id: DbId, goal: u32) -> Result<(), ApiError>;

    async fn create_alert(&self, line_id: DbId, stage: StageId) -> Result<AlertDto, ApiError>;

    async fn resolve_alert(&self, line_id: DbId, stage: StageId) -> Result<AlertDto, ApiError>;

    /// Record an operator start/stop at a stage. Returns the raw
    /// acknowledgement; see [`crate::mapping::product_id_of`].
    async fn process_production_event(
        &self,
        kind: ProductionEventKind,
        stage: StageId,
        line_id: DbId,
    ) -> Result<serde_json::Value, ApiError>;

    /// Attach a scanned serial number to the line's in-progress product.
    async fn associate_serial_number(
        &self,
        serial: &str,
        line_id: DbId,
    ) -> Result<serde_json::Value, ApiError>;

    async fn update_line_status(&self, line_id: DbId, status: LineStatus) -> Result<(), ApiError>;

    async fn add_product_to_line(
        &self,
        line_id: DbId,
        product: &NewProduct,
    ) -> Result<Product, ApiError>;
}
