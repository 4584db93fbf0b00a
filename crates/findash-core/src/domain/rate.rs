//! 환율/시세 레코드 타입.
//!
//! 업스트림에서 관측된 하나의 시세와 직전 관측 대비 변동폭을 담는
//! 불변 레코드를 정의합니다. 값은 생성 시점에 한 번만 반올림됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// 시세 값의 고정 소수점 자릿수.
///
/// 원본 API들이 소수점 4자리 정밀도로 값을 제공하므로 전체 파이프라인에서
/// 동일한 정밀도를 사용합니다.
pub const RATE_SCALE: u32 = 4;

/// 업스트림 데이터 소스 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// 러시아 중앙은행 환율 (cbr-xml-daily)
    Cbr,
    /// 모스크바 거래소 주식 시세 (ISS API)
    Moex,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cbr => "cbr",
            Self::Moex => "moex",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 하나의 관측된 시세와 변동 지표.
///
/// # 필드
///
/// - `symbol`: 추적 대상 코드 (통화 코드 또는 티커)
/// - `value`: 현재 시세 (소수점 4자리)
/// - `change`: 직전 캐시된 관측 대비 변동폭
/// - `change_percent`: 직전 대비 변동률 (%)
/// - `observed_at`: 업스트림 관측 시각 (업스트림이 제공하지 않으면 처리 시각)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub symbol: String,
    pub value: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl RateRecord {
    /// 새 레코드를 생성합니다.
    ///
    /// 값은 음수가 아니어야 하며, 모든 수치는 여기서 한 번만
    /// `RATE_SCALE` 자리로 반올림됩니다.
    pub fn new(
        symbol: impl Into<String>,
        value: Decimal,
        change: Decimal,
        change_percent: Decimal,
        observed_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let symbol = symbol.into();
        if value < Decimal::ZERO {
            return Err(CoreError::InvalidValue(format!(
                "rate for {} must be non-negative, got {}",
                symbol, value
            )));
        }

        Ok(Self {
            symbol,
            value: value.round_dp(RATE_SCALE),
            change: change.round_dp(RATE_SCALE),
            change_percent: change_percent.round_dp(RATE_SCALE),
            observed_at,
        })
    }
}
