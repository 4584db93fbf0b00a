//! 데이터 파이프라인 에러 타입.

use thiserror::Error;

/// 업스트림 호출 단계의 에러.
///
/// 항상 전체 실패를 의미합니다. 부분적으로 파싱된 데이터는 반환되지
/// 않습니다. 오케스트레이터 레벨에서 폴백으로 복구 가능합니다.
/// 실패한 갱신 결과를 대기자들과 공유하기 위해 `Clone`입니다.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// 요청 타임아웃
    #[error("Upstream request timed out")]
    Timeout,

    /// 연결 실패 (DNS, TCP, TLS 등 전송 계층 오류)
    #[error("Upstream connection failed: {0}")]
    ConnectionFailed(String),

    /// 응답을 해석할 수 없음 (HTTP 에러 상태, JSON 아님)
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// JSON은 유효하지만 기대한 스키마가 아님
    #[error("Unexpected upstream schema: {0}")]
    UnexpectedSchema(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::ConnectionFailed(err.to_string())
        }
    }
}

/// 오케스트레이터가 호출자에게 노출하는 에러.
///
/// 업스트림 실패는 캐시된 스냅샷이 하나라도 있으면 흡수되므로,
/// 호출자가 보는 에러는 콜드 스타트 실패와 심볼 미존재뿐입니다.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 캐시가 비어 있는 상태에서 첫 페치가 실패함
    #[error("No data available: upstream failed and cache is empty")]
    NoDataAvailable {
        #[source]
        source: UpstreamError,
    },

    /// 요청한 심볼이 어떤 스냅샷에도 없음
    #[error("Symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },
}

/// 파이프라인 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, PipelineError>;
