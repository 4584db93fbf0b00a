//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `GET /` - 서비스 정보 배너
//! - `GET /health` - 헬스 체크 (liveness)
//! - `GET /health/ready` - 상세 헬스 체크 (readiness)
//! - `GET /api/v1/rates/cbr` - CBR 환율 스냅샷
//! - `GET /api/v1/rates/cbr/{currency}` - 단일 통화 환율
//! - `GET /api/v1/currencies/supported` - 추적 통화 목록
//! - `GET /api/v1/stocks/moex` - MOEX 주식 시세 스냅샷
//! - `GET /api/v1/stocks/moex/{ticker}` - 단일 종목 시세

pub mod health;
pub mod rates;
pub mod stocks;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub use health::{ComponentStatus, HealthResponse};
pub use rates::{RateEnvelope, RatesEnvelope, SupportedCurrenciesResponse};
pub use stocks::{StockEnvelope, StocksEnvelope};

/// 전체 API 라우터를 구성합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health::service_info))
        .merge(health::health_router())
        .nest(
            "/api/v1",
            rates::rates_router().merge(stocks::stocks_router()),
        )
}
