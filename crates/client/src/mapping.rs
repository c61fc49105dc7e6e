//! Conversion from backend payloads to view models.

use linewatch_core::derive::derive_current_stage;
use linewatch_core::model::{
    FailureRecord, FailureStatus, Product, ProductAnalysis, ProductStatus, Severity,
    StageBreakdown, StageTimes,
};
use linewatch_core::types::Timestamp;

use crate::wire::{AlertDto, LineProductDto, ProductAnalysisDto, StageAnalysisDto};

/// `status_alerta` value the backend uses for alerts still in progress.
pub const ALERT_OPEN_STATUS: &str = "aberto";

/// Alerts without a stage are attributed to the first stage.
const DEFAULT_ALERT_STAGE: u8 = 1;

pub fn is_open_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.trim().eq_ignore_ascii_case(ALERT_OPEN_STATUS))
}

/// Map one backend alert to a [`FailureRecord`], computing its duration
/// as of `now`.
pub fn map_alert(dto: AlertDto, now: Timestamp) -> FailureRecord {
    let status = if is_open_status(dto.status_alerta.as_deref()) {
        FailureStatus::Open
    } else {
        FailureStatus::Resolved
    };
    let end = match status {
        FailureStatus::Open => now,
        FailureStatus::Resolved => dto.fim_alerta_ts.unwrap_or(dto.inicio_alerta_ts),
    };
    let duration_ms = (end - dto.inicio_alerta_ts).num_milliseconds().max(0);

    FailureRecord {
        id: dto.id,
        line_id: dto.linha_id,
        stage: dto.etapa_id.unwrap_or(DEFAULT_ALERT_STAGE),
        start_time: dto.inicio_alerta_ts,
        end_time: match status {
            FailureStatus::Open => None,
            FailureStatus::Resolved => dto.fim_alerta_ts,
        },
        duration_ms,
        status,
        description: dto.descricao,
        severity: Severity::from_duration_ms(duration_ms),
    }
}

pub fn map_alerts(dtos: Vec<AlertDto>, now: Timestamp) -> Vec<FailureRecord> {
    dtos.into_iter().map(|dto| map_alert(dto, now)).collect()
}

/// Backend product status text to [`ProductStatus`]. Unknown values mean
/// the product is still on the line.
pub fn map_product_status(raw: Option<&str>) -> ProductStatus {
    let Some(raw) = raw else {
        return ProductStatus::InProduction;
    };
    match raw.trim().to_lowercase().as_str() {
        "concluido" | "concluído" | "completed" | "finalizado" => ProductStatus::Completed,
        "pausado" | "paused" => ProductStatus::Paused,
        _ => ProductStatus::InProduction,
    }
}

/// Map one product of a line analysis to a [`Product`] of `model`.
pub fn map_line_product(dto: LineProductDto, model: &str) -> Product {
    let status = map_product_status(dto.status.as_deref());

    let mut stage_times = StageTimes::default();
    let mut latest: Option<Timestamp> = None;
    for entry in &dto.historico {
        if let Some(start) = entry.inicio_ts {
            if !stage_times.set(entry.etapa_id, start) {
                tracing::debug!(
                    product_id = dto.produto_id,
                    stage = entry.etapa_id,
                    "Ignoring history entry for unknown stage"
                );
                continue;
            }
        }
        latest = latest.max(entry.fim_ts.or(entry.inicio_ts));
    }

    let total_active_time_ms = match (stage_times.first(), latest) {
        (Some(first), Some(last)) => (last - first).num_milliseconds().max(0),
        _ => 0,
    };
    let idle_time_ms = dto.ocio_total.unwrap_or_else(|| {
        dto.historico
            .iter()
            .filter_map(|entry| entry.tempo_de_ocio)
            .sum()
    });

    let current_stage = derive_current_stage(stage_times.highest_started(), status);
    let serial_number = dto.n_serie.unwrap_or_default();
    let barcode = (status == ProductStatus::Completed && !serial_number.is_empty())
        .then(|| serial_number.clone());

    Product {
        id: dto.produto_id.to_string(),
        serial_number,
        model: model.to_string(),
        current_stage,
        next_stage: Product::next_stage_after(current_stage),
        stage_times,
        total_active_time_ms,
        idle_time_ms: idle_time_ms.max(0),
        status,
        barcode,
    }
}

fn stage_duration_ms(stage: &StageAnalysisDto) -> i64 {
    stage
        .duracao_etapa
        .or_else(|| match (stage.inicio_etapa, stage.fim_etapa) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        })
        .unwrap_or(0)
        .max(0)
}

pub fn map_product_analysis(dto: ProductAnalysisDto) -> ProductAnalysis {
    let stages: Vec<StageBreakdown> = dto
        .analise_por_etapa
        .iter()
        .map(|stage| StageBreakdown {
            stage_id: stage.etapa_id,
            stage_name: stage.nome_etapa.clone(),
            duration_ms: stage_duration_ms(stage),
            idle_ms: stage.tempo_de_ocio.unwrap_or(0).max(0),
        })
        .collect();
    let total_idle_ms = dto
        .ocio_total
        .unwrap_or_else(|| stages.iter().map(|s| s.idle_ms).sum());

    ProductAnalysis {
        product_id: dto.produto.id,
        serial_number: dto.produto.n_serie,
        line_id: dto.produto.linha_id,
        overall_status: dto.produto.status_geral,
        stages,
        total_idle_ms: total_idle_ms.max(0),
    }
}

/// Product id carried by an event or scanner acknowledgement, if any.
pub fn product_id_of(ack: &serde_json::Value) -> Option<String> {
    let id = ack
        .get("produtoId")
        .or_else(|| ack.get("produto_id"))
        .or_else(|| ack.get("produto").and_then(|p| p.get("id")))?;
    match id {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn alert(status: Option<&str>, end: Option<&str>) -> AlertDto {
        serde_json::from_value(json!({
            "id": 9,
            "linhaId": 3,
            "etapaId": null,
            "descricao": "Esteira travada",
            "inicioAlertaTs": "2025-06-02T10:00:00Z",
            "fimAlertaTs": end,
            "statusAlerta": status,
        }))
        .unwrap()
    }

    #[test]
    fn open_sentinel_is_case_insensitive() {
        assert!(is_open_status(Some("aberto")));
        assert!(is_open_status(Some(" ABERTO ")));
        assert!(!is_open_status(Some("resolvido")));
        assert!(!is_open_status(None));
    }

    #[test]
    fn open_alert_lasts_until_now() {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let now = start + Duration::minutes(90);
        let record = map_alert(alert(Some("Aberto"), None), now);

        assert!(record.is_open());
        assert_eq!(record.stage, 1);
        assert_eq!(record.end_time, None);
        assert_eq!(record.duration_ms, 90 * 60 * 1000);
        assert_eq!(record.severity, Severity::High);
    }

    #[test]
    fn resolved_alert_uses_end_time() {
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap();
        let record = map_alert(alert(Some("resolvido"), Some("2025-06-02T10:05:00Z")), now);

        assert_eq!(record.status, FailureStatus::Resolved);
        assert_eq!(record.duration_ms, 5 * 60 * 1000);
        assert_eq!(record.severity, Severity::Low);

        let unknown = map_alert(alert(None, None), now);
        assert_eq!(unknown.status, FailureStatus::Resolved);
        assert_eq!(unknown.duration_ms, 0);
    }

    #[test]
    fn line_product_in_progress() {
        let dto: LineProductDto = serde_json::from_value(json!({
            "produtoId": 100,
            "nSerie": "1209F25A16806100",
            "status": "em_producao",
            "ocioTotal": null,
            "historico": [
                { "etapaId": 1, "inicioTs": "2025-06-02T08:00:00Z", "fimTs": "2025-06-02T08:30:00Z",
                  "tempoDeOcio": "00:02:00" },
                { "etapaId": 2, "inicioTs": "2025-06-02T08:35:00Z", "fimTs": null,
                  "tempoDeOcio": "00:03:00" },
                { "etapaId": 3, "inicioTs": null, "fimTs": null, "tempoDeOcio": null }
            ]
        }))
        .unwrap();

        let product = map_line_product(dto, "20RT COMPACT BR");
        assert_eq!(product.id, "100");
        assert_eq!(product.current_stage, 2);
        assert_eq!(product.next_stage, Some(3));
        assert_eq!(product.stage_times.get(3), None);
        assert_eq!(product.total_active_time_ms, 35 * 60 * 1000);
        assert_eq!(product.idle_time_ms, 5 * 60 * 1000);
        assert_eq!(product.status, ProductStatus::InProduction);
        assert_eq!(product.barcode, None);
    }

    #[test]
    fn line_product_completed_sits_at_last_stage() {
        let dto: LineProductDto = serde_json::from_value(json!({
            "produtoId": 7,
            "nSerie": "SN-7",
            "status": "Concluido",
            "ocioTotal": "00:10:00",
            "historico": [
                { "etapaId": 1, "inicioTs": "2025-06-02T08:00:00Z", "fimTs": "2025-06-02T08:10:00Z" },
                { "etapaId": 3, "inicioTs": "2025-06-02T08:20:00Z", "fimTs": "2025-06-02T09:00:00Z" }
            ]
        }))
        .unwrap();

        let product = map_line_product(dto, "30RT STANDARD BR");
        assert_eq!(product.current_stage, 5);
        assert_eq!(product.next_stage, None);
        assert_eq!(product.idle_time_ms, 10 * 60 * 1000);
        assert_eq!(product.total_active_time_ms, 60 * 60 * 1000);
        assert_eq!(product.barcode.as_deref(), Some("SN-7"));
    }

    #[test]
    fn product_analysis_falls_back_to_stage_bounds() {
        let dto: ProductAnalysisDto = serde_json::from_value(json!({
            "produto": { "id": 5, "nSerie": null, "linhaId": 2, "statusGeral": "em_producao" },
            "analisePorEtapa": [
                { "etapaId": 1, "nomeEtapa": "Montagem", "inicioEtapa": "2025-06-02T08:00:00Z",
                  "fimEtapa": "2025-06-02T08:20:00Z", "duracaoEtapa": null, "tempoDeOcio": 30 },
                { "etapaId": 2, "nomeEtapa": "Teste", "inicioEtapa": "2025-06-02T08:25:00Z",
                  "fimEtapa": null, "duracaoEtapa": { "minutes": 4 }, "tempoDeOcio": null }
            ]
        }))
        .unwrap();

        let analysis = map_product_analysis(dto);
        assert_eq!(analysis.line_id, 2);
        assert_eq!(analysis.stages[0].duration_ms, 20 * 60 * 1000);
        assert_eq!(analysis.stages[1].duration_ms, 4 * 60 * 1000);
        assert_eq!(analysis.total_idle_ms, 30_000);
    }

    #[test]
    fn product_id_from_acknowledgements() {
        assert_eq!(product_id_of(&json!({ "produtoId": 12 })).as_deref(), Some("12"));
        assert_eq!(product_id_of(&json!({ "produto_id": "A1" })).as_deref(), Some("A1"));
        assert_eq!(product_id_of(&json!({ "produto": { "id": 3 } })).as_deref(), Some("3"));
        assert_eq!(product_id_of(&json!({ "ok": true })), None);
    }
}
