//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use findash_data::PipelineError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "CURRENCY_NOT_FOUND",
///   "message": "Symbol not found: CHF"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "NO_DATA_AVAILABLE", "CURRENCY_NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
}

impl ApiErrorResponse {
    /// 기본 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// 파이프라인 에러를 HTTP 응답으로 변환합니다.
///
/// `not_found_code`는 라우트별 404 코드입니다 (통화 vs 티커).
pub fn pipeline_error_response(
    err: &PipelineError,
    not_found_code: &str,
) -> (StatusCode, Json<ApiErrorResponse>) {
    match err {
        PipelineError::NoDataAvailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiErrorResponse::new("NO_DATA_AVAILABLE", err.to_string())),
        ),
        PipelineError::SymbolNotFound { .. } => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::new(not_found_code, err.to_string())),
        ),
    }
}

/// 비활성화된 소스에 대한 503 응답.
pub fn source_disabled_response(source: &str) -> (StatusCode, Json<ApiErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorResponse::new(
            "SOURCE_DISABLED",
            format!("data source '{}' is disabled by configuration", source),
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use findash_data::UpstreamError;

    #[test]
    fn test_no_data_available_maps_to_503() {
        let err = PipelineError::NoDataAvailable {
            source: UpstreamError::Timeout,
        };
        let (status, _) = pipeline_error_response(&err, "CURRENCY_NOT_FOUND");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_symbol_not_found_maps_to_404_with_route_code() {
        let err = PipelineError::SymbolNotFound {
            symbol: "CHF".to_string(),
        };
        let (status, body) = pipeline_error_response(&err, "CURRENCY_NOT_FOUND");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "CURRENCY_NOT_FOUND");
    }
}
