//! 헬스 체크 endpoint.
//!
//! 서버 상태 확인을 위한 헬스 체크 엔드포인트를 제공합니다.
//! 로드밸런서나 오케스트레이션 시스템에서 사용됩니다.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use findash_data::RateService;

use crate::state::AppState;

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 전체 서비스 상태
    pub status: String,
    /// API 버전
    pub version: String,
    /// 서버 업타임(초)
    pub uptime_secs: i64,
    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
    /// 개별 데이터 소스 상태
    pub sources: SourcesHealth,
}

/// 데이터 소스별 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesHealth {
    pub cbr: ComponentStatus,
    pub moex: ComponentStatus,
}

/// 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// 상태 ("up" | "not_configured")
    pub status: String,
    /// 추가 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    /// 정보 포함 정상 상태.
    pub fn up_with_info(message: impl Into<String>) -> Self {
        Self {
            status: "up".to_string(),
            message: Some(message.into()),
        }
    }

    /// 미설정 상태.
    pub fn not_configured() -> Self {
        Self {
            status: "not_configured".to_string(),
            message: None,
        }
    }
}

/// 서비스 정보 배너.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
    pub timestamp: String,
}

/// 헬스 체크 라우터.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
}

/// 간단한 헬스 체크 (liveness probe용).
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// 루트 서비스 정보.
///
/// GET /
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Welcome to Findash".to_string(),
        version: state.version.to_string(),
        status: "running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// 상세 헬스 체크 (readiness probe용).
///
/// 각 데이터 소스 캐시의 상태를 보고합니다. 캐시 조회만 하며
/// 업스트림 갱신은 트리거하지 않습니다.
///
/// GET /health/ready
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.to_string(),
        uptime_secs: now.signed_duration_since(state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
        sources: SourcesHealth {
            cbr: source_status(&state.cbr).await,
            moex: source_status(&state.moex).await,
        },
    })
}

/// 소스 하나의 캐시 상태를 요약합니다.
async fn source_status(service: &Option<Arc<RateService>>) -> ComponentStatus {
    let service = match service {
        Some(s) => s,
        None => return ComponentStatus::not_configured(),
    };

    let snapshot = service.peek().await;
    if snapshot.is_empty() {
        ComponentStatus::up_with_info("cache empty, no fetch completed yet")
    } else {
        let age_secs = snapshot
            .age(Utc::now())
            .map(|a| a.num_seconds())
            .unwrap_or(-1);
        ComponentStatus::up_with_info(format!(
            "{} records, snapshot age {}s",
            snapshot.len(),
            age_secs
        ))
    }
}
