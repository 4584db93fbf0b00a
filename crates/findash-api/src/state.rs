//! 모든 핸들러에서 공유되는 애플리케이션 상태.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use findash_data::RateService;

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러에 주입됩니다. 비활성화된
/// 소스는 `None`입니다.
pub struct AppState {
    /// CBR 환율 파이프라인
    pub cbr: Option<Arc<RateService>>,
    /// MOEX 주식 시세 파이프라인
    pub moex: Option<Arc<RateService>>,
    /// API 버전
    pub version: &'static str,
    /// 서버 시작 시각 (업타임 계산용)
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새 상태를 생성합니다.
    pub fn new(cbr: Option<Arc<RateService>>, moex: Option<Arc<RateService>>) -> Self {
        Self {
            cbr,
            moex,
            version: env!("CARGO_PKG_VERSION"),
            started_at: Utc::now(),
        }
    }
}
