//! 업스트림 데이터 소스 클라이언트.
//!
//! - CBR: 러시아 중앙은행 일일 환율 (cbr-xml-daily JSON 미러)
//! - MOEX: 모스크바 거래소 ISS API 주식 시세

mod cbr;
mod moex;

pub use cbr::CbrClient;
pub use moex::MoexClient;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use findash_core::SourceId;

use crate::error::UpstreamError;

/// 한 번의 업스트림 페치가 반환한 원시 시세 테이블.
///
/// 심볼은 아직 allow-list 검증 전이며, 변동 지표도 계산되지 않은
/// 상태입니다.
#[derive(Debug, Clone)]
pub struct RawRateTable {
    /// 심볼별 원시 시세
    pub values: HashMap<String, Decimal>,
    /// 업스트림이 제공한 관측 시각 (없으면 처리 시각 사용)
    pub observed_at: Option<DateTime<Utc>>,
}

/// 업스트림 시세 제공자 트레잇.
///
/// 구현체는 고정 엔드포인트로 한 번의 아웃바운드 호출을 수행하며,
/// 재시도는 하지 않습니다 (재시도 정책은 오케스트레이터 소관).
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// 데이터 소스 식별자.
    fn source_id(&self) -> SourceId;

    /// 업스트림에서 원시 시세 테이블을 가져옵니다.
    async fn fetch_rates(&self) -> std::result::Result<RawRateTable, UpstreamError>;
}
