//! Backend payload shapes.
//!
//! The backend speaks Portuguese field names and has shipped both
//! camelCase and snake_case variants of the same payloads, so every field
//! accepts both spellings. These types are never shown to the presentation
//! layer; [`crate::mapping`] turns them into view models.

use serde::{Deserialize, Serialize};

use linewatch_core::model::ProductionEventKind;
use linewatch_core::types::{DbId, StageId, Timestamp};

use crate::interval::{deserialize_opt_interval_ms, deserialize_opt_timestamp, deserialize_timestamp};

// ---------------------------------------------------------------------------
// Line analysis: GET /api/analise-tempo/linha/{id}/hoje
// ---------------------------------------------------------------------------

/// Today's analysis for one line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAnalysisDto {
    #[serde(alias = "produtos_concluidos", default)]
    pub produtos_concluidos: u32,
    #[serde(alias = "total_produtos_na_linha", default)]
    pub total_produtos_na_linha: u32,
    #[serde(alias = "analise_produtos", default)]
    pub analise_produtos: Vec<LineProductDto>,
}

/// One product that passed through the line today.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProductDto {
    #[serde(alias = "produto_id")]
    pub produto_id: DbId,
    #[serde(alias = "n_serie", default)]
    pub n_serie: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Total idle time, in milliseconds.
    #[serde(alias = "ocio_total", default, deserialize_with = "deserialize_opt_interval_ms")]
    pub ocio_total: Option<i64>,
    #[serde(default)]
    pub historico: Vec<StageHistoryDto>,
}

/// Start/end of one stage in a product's history.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryDto {
    #[serde(alias = "etapa_id")]
    pub etapa_id: StageId,
    #[serde(alias = "nome_etapa", default)]
    pub nome_etapa: String,
    #[serde(alias = "inicio_ts", default, deserialize_with = "deserialize_opt_timestamp")]
    pub inicio_ts: Option<Timestamp>,
    #[serde(alias = "fim_ts", default, deserialize_with = "deserialize_opt_timestamp")]
    pub fim_ts: Option<Timestamp>,
    /// Idle time inside the stage, in milliseconds.
    #[serde(alias = "tempo_de_ocio", default, deserialize_with = "deserialize_opt_interval_ms")]
    pub tempo_de_ocio: Option<i64>,
}

// ---------------------------------------------------------------------------
// Product analysis: GET /api/analise-tempo/produto/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysisDto {
    pub produto: ProductRefDto,
    #[serde(alias = "analise_por_etapa", default)]
    pub analise_por_etapa: Vec<StageAnalysisDto>,
    /// Total idle time, in milliseconds.
    #[serde(
        alias = "ocio_total",
        alias = "ocioTotalSegundos",
        default,
        deserialize_with = "deserialize_opt_interval_ms"
    )]
    pub ocio_total: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRefDto {
    pub id: DbId,
    #[serde(alias = "n_serie", default)]
    pub n_serie: Option<String>,
    #[serde(alias = "linha_id")]
    pub linha_id: DbId,
    #[serde(alias = "status_geral", default)]
    pub status_geral: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAnalysisDto {
    #[serde(alias = "etapa_id")]
    pub etapa_id: StageId,
    #[serde(alias = "nome_etapa", default)]
    pub nome_etapa: String,
    #[serde(alias = "inicio_etapa", default, deserialize_with = "deserialize_opt_timestamp")]
    pub inicio_etapa: Option<Timestamp>,
    #[serde(alias = "fim_etapa", default, deserialize_with = "deserialize_opt_timestamp")]
    pub fim_etapa: Option<Timestamp>,
    #[serde(alias = "duracao_etapa", default, deserialize_with = "deserialize_opt_interval_ms")]
    pub duracao_etapa: Option<i64>,
    #[serde(alias = "tempo_de_ocio", default, deserialize_with = "deserialize_opt_interval_ms")]
    pub tempo_de_ocio: Option<i64>,
}

// ---------------------------------------------------------------------------
// Daily targets: GET /api/metas, POST /api/metas/linha/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTargetsDto {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(alias = "meta_total", default)]
    pub meta_total: u32,
    #[serde(default)]
    pub metas: Vec<LineTargetDto>,
}

impl DailyTargetsDto {
    /// Goal for `line_id`, if one was set today.
    pub fn target_for(&self, line_id: DbId) -> Option<u32> {
        self.metas
            .iter()
            .find(|m| m.linha_id == line_id)
            .map(|m| m.meta)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTargetDto {
    #[serde(alias = "linha_id")]
    pub linha_id: DbId,
    pub meta: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetGoalBody {
    pub meta: u32,
}

// ---------------------------------------------------------------------------
// Alerts: /api/alertas
// ---------------------------------------------------------------------------

/// A failure/stoppage record as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDto {
    pub id: DbId,
    #[serde(alias = "linha_id")]
    pub linha_id: DbId,
    #[serde(alias = "etapa_id", default)]
    pub etapa_id: Option<StageId>,
    #[serde(default)]
    pub descricao: String,
    #[serde(alias = "inicio_alerta_ts", deserialize_with = "deserialize_timestamp")]
    pub inicio_alerta_ts: Timestamp,
    #[serde(alias = "fim_alerta_ts", default, deserialize_with = "deserialize_opt_timestamp")]
    pub fim_alerta_ts: Option<Timestamp>,
    #[serde(alias = "status_alerta", default)]
    pub status_alerta: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateAlertBody {
    pub linha_id: DbId,
    pub etapa_id: StageId,
    pub descricao: String,
}

// ---------------------------------------------------------------------------
// Events and scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct ProductionEventBody {
    pub tipo: ProductionEventKind,
    pub etapa_id: StageId,
    pub linha_id: DbId,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssociateSerialBody<'a> {
    pub numero_serie: &'a str,
    pub linha_id: DbId,
}

// ---------------------------------------------------------------------------
// Line listing: GET /api/production-lines
// ---------------------------------------------------------------------------

/// Minimal line description used to discover which lines exist.
#[derive(Debug, Clone, Deserialize)]
pub struct LineInfoDto {
    pub id: DbId,
    #[serde(alias = "nome", default)]
    pub name: Option<String>,
    #[serde(alias = "modelo", default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LineStatusBody {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn alert_accepts_camel_and_snake_case() {
        let camel: AlertDto = serde_json::from_value(json!({
            "id": 7,
            "linhaId": 2,
            "etapaId": 3,
            "descricao": "Falta de peça",
            "inicioAlertaTs": "2025-06-02T10:00:00Z",
            "fimAlertaTs": null,
            "statusAlerta": "ABERTO"
        }))
        .unwrap();
        let snake: AlertDto = serde_json::from_value(json!({
            "id": 7,
            "linha_id": 2,
            "etapa_id": 3,
            "descricao": "Falta de peça",
            "inicio_alerta_ts": "2025-06-02 10:00:00",
            "status_alerta": "ABERTO"
        }))
        .unwrap();

        assert_eq!(camel.linha_id, snake.linha_id);
        assert_eq!(camel.inicio_alerta_ts, snake.inicio_alerta_ts);
        assert_eq!(snake.fim_alerta_ts, None);
        assert_eq!(snake.status_alerta.as_deref(), Some("ABERTO"));
    }

    #[test]
    fn alert_without_start_is_rejected() {
        let result = serde_json::from_value::<AlertDto>(json!({ "id": 1, "linhaId": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn line_analysis_decodes_history() {
        let dto: LineAnalysisDto = serde_json::from_value(json!({
            "produtosConcluidos": 12,
            "totalProdutosNaLinha": 15,
            "analiseProdutos": [{
                "produtoId": 100,
                "nSerie": "1209F25A16806100",
                "status": "em_producao",
                "ocioTotal": "00:15:00",
                "historico": [
                    { "etapaId": 1, "nomeEtapa": "Montagem", "inicioTs": "2025-06-02T08:00:00Z",
                      "fimTs": "2025-06-02T08:45:00Z", "tempoDeOcio": { "minutes": 5 } },
                    { "etapaId": 2, "nomeEtapa": "Solda", "inicioTs": null, "fimTs": null,
                      "tempoDeOcio": null }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(dto.produtos_concluidos, 12);
        let product = &dto.analise_produtos[0];
        assert_eq!(product.ocio_total, Some(15 * 60 * 1000));
        assert_eq!(product.historico[0].tempo_de_ocio, Some(5 * 60 * 1000));
        assert!(product.historico[1].inicio_ts.is_none());
    }

    #[test]
    fn targets_lookup() {
        let dto: DailyTargetsDto = serde_json::from_value(json!({
            "data": "2025-06-02",
            "metaTotal": 290,
            "metas": [{ "linhaId": 1, "meta": 150 }, { "linha_id": 2, "meta": 140 }]
        }))
        .unwrap();

        assert_eq!(dto.target_for(1), Some(150));
        assert_eq!(dto.target_for(2), Some(140));
        assert_eq!(dto.target_for(3), None);
    }

    #[test]
    fn event_body_uses_lowercase_kind() {
        let body = ProductionEventBody {
            tipo: ProductionEventKind::Stop,
            etapa_id: 4,
            linha_id: 1,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "tipo": "stop", "etapa_id": 4, "linha_id": 1 })
        );
    }
}
