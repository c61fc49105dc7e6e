//! In-memory `ProductionBackend` for driving the store without a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use linewatch_client::backend::ProductionBackend;
use linewatch_client::error::ApiError;
use linewatch_client::wire::{
    AlertDto, DailyTargetsDto, LineAnalysisDto, LineInfoDto, ProductAnalysisDto,
};
use linewatch_core::model::{
    LineStatus, NewProduct, Product, ProductionEventKind, ProductionMetrics,
};
use linewatch_core::types::{DbId, StageId};

/// Per-line analysis behaviour.
#[derive(Debug, Clone)]
pub enum LineReply {
    Analysis { done: u32 },
    NotFound,
    Fail(u16),
}

#[derive(Default)]
pub struct FakeBackend {
    alerts: Mutex<Vec<Value>>,
    targets: Mutex<Option<Value>>,
    lines: Mutex<HashMap<DbId, LineReply>>,
    product_analyses: Mutex<HashMap<String, Value>>,
    event_ack: Mutex<Value>,
    alert_delay: Mutex<Option<Duration>>,
    fail_alerts: AtomicBool,
    fail_writes: AtomicBool,
    next_alert_id: AtomicI64,
    calls: Mutex<Vec<String>>,
}

pub fn alert_json(id: DbId, line: DbId, stage: StageId, status: &str) -> Value {
    json!({
        "id": id,
        "linhaId": line,
        "etapaId": stage,
        "descricao": format!("Parada na linha {line}"),
        "inicioAlertaTs": "2025-06-02T10:00:00Z",
        "fimAlertaTs": if status == "aberto" { Value::Null } else { json!("2025-06-02T10:30:00Z") },
        "statusAlerta": status
    })
}

fn server_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        message: format!("HTTP error! status: {status}"),
    }
}

impl FakeBackend {
    /// Two lines at 127/150 and 110/140, no alerts.
    pub fn two_lines() -> Self {
        let backend = Self::default();
        backend.next_alert_id.store(100, Ordering::SeqCst);
        backend.set_line(1, LineReply::Analysis { done: 127 });
        backend.set_line(2, LineReply::Analysis { done: 110 });
        *backend.targets.lock().unwrap() = Some(json!({
            "data": "2025-06-02",
            "metaTotal": 290,
            "metas": [{ "linhaId": 1, "meta": 150 }, { "linhaId": 2, "meta": 140 }]
        }));
        *backend.event_ack.lock().unwrap() = json!({ "produtoId": 77 });
        backend
    }

    pub fn set_line(&self, line_id: DbId, reply: LineReply) {
        self.lines.lock().unwrap().insert(line_id, reply);
    }

    pub fn set_alerts(&self, alerts: Vec<Value>) {
        *self.alerts.lock().unwrap() = alerts;
    }

    pub fn set_product_analysis(&self, product_id: &str, analysis: Value) {
        self.product_analyses
            .lock()
            .unwrap()
            .insert(product_id.to_string(), analysis);
    }

    pub fn set_alert_delay(&self, delay: Duration) {
        *self.alert_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_alerts(&self, fail: bool) {
        self.fail_alerts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn check_write(&self) -> Result<(), ApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(server_error(500))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProductionBackend for FakeBackend {
    async fn get_line_analysis(&self, line_id: DbId) -> Result<Option<LineAnalysisDto>, ApiError> {
        self.record("get_line_analysis");
        let reply = self.lines.lock().unwrap().get(&line_id).cloned();
        match reply {
            Some(LineReply::Analysis { done }) => Ok(Some(LineAnalysisDto {
                produtos_concluidos: done,
                total_produtos_na_linha: done,
                analise_produtos: Vec::new(),
            })),
            Some(LineReply::Fail(status)) => Err(server_error(status)),
            Some(LineReply::NotFound) | None => Ok(None),
        }
    }

    async fn get_product_analysis(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductAnalysisDto>, ApiError> {
        self.record("get_product_analysis");
        let value = self.product_analyses.lock().unwrap().get(product_id).cloned();
        Ok(value.map(|v| serde_json::from_value(v).unwrap()))
    }

    async fn get_daily_targets(&self) -> Result<Option<DailyTargetsDto>, ApiError> {
        self.record("get_daily_targets");
        let value = self.targets.lock().unwrap().clone();
        Ok(value.map(|v| serde_json::from_value(v).unwrap()))
    }

    async fn get_alerts(&self) -> Result<Vec<AlertDto>, ApiError> {
        self.record("get_alerts");
        let delay = *self.alert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_alerts.load(Ordering::SeqCst) {
            return Err(server_error(503));
        }
        let alerts = self.alerts.lock().unwrap().clone();
        Ok(alerts
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect())
    }

    async fn get_production_lines(&self) -> Result<Vec<LineInfoDto>, ApiError> {
        self.record("get_production_lines");
        let mut ids: Vec<DbId> = self.lines.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids
            .into_iter()
            .map(|id| LineInfoDto {
                id,
                name: (id == 1).then(|| "Linha Principal".to_string()),
                model: None,
            })
            .collect())
    }

    async fn get_production_metrics(&self) -> Result<ProductionMetrics, ApiError> {
        self.record("get_production_metrics");
        Ok(ProductionMetrics {
            total_produced: 237,
            total_target: 290,
            overall_efficiency: 82,
            ..Default::default()
        })
    }

    async fn set_daily_production_goal(&self, _line_id: DbId, _goal: u32) -> Result<(), ApiError> {
        self.record("set_daily_production_goal");
        self.check_write()
    }

    async fn create_alert(&self, line_id: DbId, stage: StageId) -> Result<AlertDto, ApiError> {
        self.record("create_alert");
        self.check_write()?;
        let id = self.next_alert_id.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(alert_json(id, line_id, stage, "aberto")).unwrap())
    }

    async fn resolve_alert(&self, line_id: DbId, stage: StageId) -> Result<AlertDto, ApiError> {
        self.record("resolve_alert");
        self.check_write()?;
        Ok(serde_json::from_value(alert_json(0, line_id, stage, "resolvido")).unwrap())
    }

    async fn process_production_event(
        &self,
        _kind: ProductionEventKind,
        _stage: StageId,
        _line_id: DbId,
    ) -> Result<Value, ApiError> {
        self.record("process_production_event");
        self.check_write()?;
        Ok(self.event_ack.lock().unwrap().clone())
    }

    async fn associate_serial_number(&self, serial: &str, _line_id: DbId) -> Result<Value, ApiError> {
        self.record("associate_serial_number");
        self.check_write()?;
        Ok(json!({ "produto": { "id": 9, "nSerie": serial } }))
    }

    async fn update_line_status(&self, _line_id: DbId, _status: LineStatus) -> Result<(), ApiError> {
        self.record("update_line_status");
        self.check_write()
    }

    async fn add_product_to_line(
        &self,
        _line_id: DbId,
        product: &NewProduct,
    ) -> Result<Product, ApiError> {
        self.record("add_product_to_line");
        self.check_write()?;
        Ok(Product {
            id: "p-1".into(),
            serial_number: product.serial_number.clone(),
            model: product.model.clone(),
            current_stage: product.current_stage,
            next_stage: Product::next_stage_after(product.current_stage),
            stage_times: Default::default(),
            total_active_time_ms: 0,
            idle_time_ms: 0,
            status: product.status,
            barcode: product.barcode.clone(),
        })
    }
}
