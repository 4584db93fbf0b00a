//! MOEX 주식 시세 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/stocks/moex` - 추적 종목 전체의 시세 스냅샷
//! - `GET /api/v1/stocks/moex/{ticker}` - 단일 종목 시세

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

/// 시세 스냅샷 응답 봉투.
#[derive(Debug, Serialize, Deserialize)]
pub struct StocksEnvelope {
    pub source: String,
    /// 티커별 레코드
    pub data: HashMap<String, RateRecord>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    /// 반환된 종목 수
    pub tickers_count: usize,
    pub stale: bool,
    pub success: bool,
}

/// 단일 종목 응답 봉투.
#[derive(Debug, Serialize, Deserialize)]
pub struct StockEnvelope {
    pub source: String,
    pub data: RateRecord,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    pub stale: bool,
    pub success: bool,
}

/// 주식 시세 라우터.
pub fn stocks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks/moex", get(get_moex_stocks))
        .route("/stocks/moex/{ticker}", get(get_moex_stock))
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

fn moex_service(state: &AppState) -> ApiResult<&Arc<RateService>> {
    state
        .moex
        .as_ref()
        .ok_or_else(|| source_disabled_response("moex"))
}

/// MOEX 시세 스냅샷 조회.
///
/// GET /api/v1/stocks/moex
pub async fn get_moex_stocks(State(state): State<Arc<AppState>>) -> ApiResult<Json<StocksEnvelope>> {
    let service = moex_service(&state)?;
    let now = Utc::now();

    let view = service
        .get_rates(now)
        .await
        .map_err(|e| pipeline_error_response(&e, "TICKER_NOT_FOUND"))?;

    info!(
        count = view.snapshot.len(),
        stale = view.stale,
        "Returning MOEX prices"
    );

    Ok(Json(StocksEnvelope {
        source: view.snapshot.source.to_string(),
        tickers_count: view.snapshot.len(),
        data: view.snapshot.records.clone(),
        timestamp: now.to_rfc3339(),
        fetched_at: view.snapshot.fetched_at.map(|t| t.to_rfc3339()),
        stale: view.stale,
        success: true,
    }))
}

/// 단일 종목 시세 조회.
///
/// GET /api/v1/stocks/moex/{ticker}
pub async fn get_moex_stock(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<StockEnvelope>> {
    let service = moex_service(&state)?;
    let now = Utc::now();

    let view = service
        .get_rate(&ticker, now)
        .await
        .map_err(|e| pipeline_error_response(&e, "TICKER_NOT_FOUND"))?;

    Ok(Json(StockEnvelope {
        source: view.source.to_string(),
        data: view.record,
        timestamp: now.to_rfc3339(),
        fetched_at: view.fetched_at.map(|t| t.to_rfc3339()),
        stale: view.stale,
        success: true,
    }))
}
