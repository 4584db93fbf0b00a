//! CBR 환율 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/rates/cbr` - 추적 통화 전체의 환율 스냅샷
//! - `GET /api/v1/rates/cbr/{currency}` - 단일 통화 환율
//! - `GET /api/v1/currencies/supported` - 추적 통화 목록

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use findash_core::RateRecord;
use findash_data::RateService;

use crate::error::{pipeline_error_response, source_disabled_response, ApiErrorResponse};
use crate::state::AppState;

/// 환율 스냅샷 응답 봉투.
#[derive(Debug, Serialize, Deserialize)]
pub struct RatesEnvelope {
    /// 데이터 소스 식별자
    pub source: String,
    /// 통화 코드별 레코드
    pub data: HashMap<String, RateRecord>,
    /// 응답 생성 시각 (ISO 8601)
    pub timestamp: String,
    /// 마지막 성공 페치 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    /// 반환된 통화 수
    pub currencies_count: usize,
    /// TTL이 지난 폴백 데이터인지 여부
    pub stale: bool,
    pub success: bool,
}

/// 단일 통화 응답 봉투.
#[derive(Debug, Serialize, Deserialize)]
pub struct RateEnvelope {
    pub source: String,
    pub data: RateRecord,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    pub stale: bool,
    pub success: bool,
}

/// 추적 통화 목록 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SupportedCurrenciesResponse {
    pub supported_currencies: Vec<String>,
    pub count: usize,
}

/// 환율 라우터.
pub fn rates_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rates/cbr", get(get_cbr_rates))
        .route("/rates/cbr/{currency}", get(get_cbr_rate))
        .route("/currencies/supported", get(get_supported_currencies))
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

fn cbr_service(state: &AppState) -> ApiResult<&Arc<RateService>> {
    state
        .cbr
        .as_ref()
        .ok_or_else(|| source_disabled_response("cbr"))
}

/// CBR 환율 스냅샷 조회.
///
/// GET /api/v1/rates/cbr
pub async fn get_cbr_rates(State(state): State<Arc<AppState>>) -> ApiResult<Json<RatesEnvelope>> {
    let service = cbr_service(&state)?;
    let now = Utc::now();

    let view = service
        .get_rates(now)
        .await
        .map_err(|e| pipeline_error_response(&e, "CURRENCY_NOT_FOUND"))?;

    info!(
        count = view.snapshot.len(),
        stale = view.stale,
        "Returning CBR rates"
    );

    Ok(Json(RatesEnvelope {
        source: view.snapshot.source.to_string(),
        currencies_count: view.snapshot.len(),
        data: view.snapshot.records.clone(),
        timestamp: now.to_rfc3339(),
        fetched_at: view.snapshot.fetched_at.map(|t| t.to_rfc3339()),
        stale: view.stale,
        success: true,
    }))
}

/// 단일 통화 환율 조회.
///
/// GET /api/v1/rates/cbr/{currency}
pub async fn get_cbr_rate(
    State(state): State<Arc<AppState>>,
    Path(currency): Path<String>,
) -> ApiResult<Json<RateEnvelope>> {
    let service = cbr_service(&state)?;
    let now = Utc::now();

    let view = service
        .get_rate(&currency, now)
        .await
        .map_err(|e| pipeline_error_response(&e, "CURRENCY_NOT_FOUND"))?;

    Ok(Json(RateEnvelope {
        source: view.source.to_string(),
        data: view.record,
        timestamp: now.to_rfc3339(),
        fetched_at: view.fetched_at.map(|t| t.to_rfc3339()),
        stale: view.stale,
        success: true,
    }))
}

/// 추적 통화 목록 조회.
///
/// GET /api/v1/currencies/supported
pub async fn get_supported_currencies(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SupportedCurrenciesResponse>> {
    let service = cbr_service(&state)?;
    let symbols = service.tracked_symbols().to_vec();

    Ok(Json(SupportedCurrenciesResponse {
        count: symbols.len(),
        supported_currencies: symbols,
    }))
}
