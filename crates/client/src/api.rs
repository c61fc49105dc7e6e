//! REST client for the production backend.
//!
//! Wraps every backend endpoint using [`reqwest`]. The client holds no
//! state beyond its connection pool: no retries, no caching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use linewatch_core::model::{
    LineStatus, NewProduct, Product, ProductionEventKind, ProductionMetrics,
};
use linewatch_core::types::{DbId, StageId};

use crate::backend::ProductionBackend;
use crate::error::ApiError;
use crate::wire::{
    AlertDto, AssociateSerialBody, CreateAlertBody, DailyTargetsDto, LineAnalysisDto,
    LineInfoDto, LineStatusBody, ProductAnalysisDto, ProductionEventBody, SetGoalBody,
};

/// Default backend address for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Connection settings for [`ProductionApi`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL, e.g. `http://host:3000`.
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

/// HTTP client for one production backend.
#[derive(Debug, Clone)]
pub struct ProductionApi {
    client: reqwest::Client,
    base_url: Url,
}

impl ProductionApi {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    /// Create a client from [`ClientConfig`], applying the request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Request)?;
        Self::with_client(client, &config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ---- private helpers ----

    /// Build an endpoint URL from path segments. Segments are
    /// percent-encoded, so user-typed ids cannot escape their slot.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ApiError> {
        tracing::debug!(%url, "GET");
        Ok(self.client.get(url).send().await?)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        tracing::debug!(%method, %url, "Sending request");
        Ok(self.client.request(method, url).json(body).send().await?)
    }

    /// Ensure the response has a success status code. On failure the
    /// body is mined for a human-readable message.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Like [`Self::parse_response`] but maps 404 to `Ok(None)`.
    async fn parse_optional<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, ApiError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse_response(response).await.map(Some)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Pick the most useful message out of an error body: a JSON `message` or
/// `error` field, else the raw text, else a generic status line.
fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || format!("HTTP error! status: {}", status.as_u16());
    let body = body.trim();
    if body.is_empty() {
        return fallback();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => ["message", "error", "erro"]
            .iter()
            .find_map(|key| json.get(key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(fallback),
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl ProductionBackend for ProductionApi {
    /// `GET /api/analise-tempo/linha/{id}/hoje`
    async fn get_line_analysis(&self, line_id: DbId) -> Result<Option<LineAnalysisDto>, ApiError> {
        let id = line_id.to_string();
        let url = self.endpoint(&["api", "analise-tempo", "linha", &id, "hoje"])?;
        Self::parse_optional(self.get(url).await?).await
    }

    /// `GET /api/analise-tempo/produto/{id}`
    async fn get_product_analysis(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductAnalysisDto>, ApiError> {
        let url = self.endpoint(&["api", "analise-tempo", "produto", product_id])?;
        Self::parse_optional(self.get(url).await?).await
    }

    /// `GET /api/metas`
    async fn get_daily_targets(&self) -> Result<Option<DailyTargetsDto>, ApiError> {
        let url = self.endpoint(&["api", "metas"])?;
        Self::parse_optional(self.get(url).await?).await
    }

    /// `GET /api/alertas`
    async fn get_alerts(&self) -> Result<Vec<AlertDto>, ApiError> {
        let url = self.endpoint(&["api", "alertas"])?;
        Ok(Self::parse_optional(self.get(url).await?)
            .await?
            .unwrap_or_default())
    }

    /// `GET /api/production-lines`
    async fn get_production_lines(&self) -> Result<Vec<LineInfoDto>, ApiError> {
        let url = self.endpoint(&["api", "production-lines"])?;
        Self::parse_response(self.get(url).await?).await
    }

    /// `GET /api/production-metrics`
    async fn get_production_metrics(&self) -> Result<ProductionMetrics, ApiError> {
        let url = self.endpoint(&["api", "production-metrics"])?;
        Self::parse_response(self.get(url).await?).await
    }

    /// `POST /api/metas/linha/{id}` with `{"meta": goal}`
    async fn set_daily_production_goal(&self, line_id: DbId, goal: u32) -> Result<(), ApiError> {
        let id = line_id.to_string();
        let url = self.endpoint(&["api", "metas", "linha", &id])?;
        let response = self
            .send_json(reqwest::Method::POST, url, &SetGoalBody { meta: goal })
            .await?;
        Self::check_status(response).await
    }

    /// `POST /api/alertas`
    async fn create_alert(&self, line_id: DbId, stage: StageId) -> Result<AlertDto, ApiError> {
        let url = self.endpoint(&["api", "alertas"])?;
        let body = CreateAlertBody {
            linha_id: line_id,
            etapa_id: stage,
            descricao: format!("Alerta manual na linha {line_id}"),
        };
        let response = self.send_json(reqwest::Method::POST, url, &body).await?;
        Self::parse_response(response).await
    }

    /// `PATCH /api/alertas/linhas/{line}/etapas/{stage}/resolver`
    async fn resolve_alert(&self, line_id: DbId, stage: StageId) -> Result<AlertDto, ApiError> {
        let line = line_id.to_string();
        let stage = stage.to_string();
        let url = self.endpoint(&["api", "alertas", "linhas", &line, "etapas", &stage, "resolver"])?;
        tracing::debug!(%url, "PATCH");
        let response = self.client.patch(url).send().await?;
        Self::parse_response(response).await
    }

    /// `POST /api/eventos` with `{tipo, etapa_id, linha_id}`
    async fn process_production_event(
        &self,
        kind: ProductionEventKind,
        stage: StageId,
        line_id: DbId,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint(&["api", "eventos"])?;
        let body = ProductionEventBody {
            tipo: kind,
            etapa_id: stage,
            linha_id: line_id,
        };
        let response = self.send_json(reqwest::Method::POST, url, &body).await?;
        Self::parse_response(response).await
    }

    /// `POST /api/scanner/linhas/{id}/associar` with `{numero_serie, linha_id}`
    async fn associate_serial_number(
        &self,
        serial: &str,
        line_id: DbId,
    ) -> Result<serde_json::Value, ApiError> {
        let id = line_id.to_string();
        let url = self.endpoint(&["api", "scanner", "linhas", &id, "associar"])?;
        let body = AssociateSerialBody {
            numero_serie: serial,
            linha_id: line_id,
        };
        let response = self.send_json(reqwest::Method::POST, url, &body).await?;
        Self::parse_response(response).await
    }

    /// `PATCH /api/production-lines/{id}/status` with `{status}`
    async fn update_line_status(&self, line_id: DbId, status: LineStatus) -> Result<(), ApiError> {
        let id = line_id.to_string();
        let url = self.endpoint(&["api", "production-lines", &id, "status"])?;
        let body = LineStatusBody {
            status: status.as_str(),
        };
        let response = self.send_json(reqwest::Method::PATCH, url, &body).await?;
        Self::check_status(response).await
    }

    /// `POST /api/production-lines/{id}/products`
    async fn add_product_to_line(
        &self,
        line_id: DbId,
        product: &NewProduct,
    ) -> Result<Product, ApiError> {
        let id = line_id.to_string();
        let url = self.endpoint(&["api", "production-lines", &id, "products"])?;
        let response = self.send_json(reqwest::Method::POST, url, product).await?;
        Self::parse_response(response).await
    }
}
