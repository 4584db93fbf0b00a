//! 변동폭 계산 공통 로직.
//!
//! 새 관측값과 직전 스냅샷으로부터 변동폭/변동률을 유도하는 순수 함수를
//! 제공합니다. 네트워크나 캐시 없이 단독으로 테스트할 수 있습니다.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::rate::{RateRecord, RATE_SCALE};
use super::snapshot::RateSnapshot;
use crate::error::CoreResult;

/// f64를 Decimal로 변환 후 소수점 `RATE_SCALE` 자리로 반올림.
///
/// 업스트림 JSON의 부동소수점 값을 받아들일 때 발생하는 무한 소수점
/// 문제를 방지합니다. NaN/무한대는 `None`을 반환합니다.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(RATE_SCALE))
}

/// 변동폭과 변동률(%)을 계산합니다.
///
/// `previous`가 없으면 첫 관측이므로 둘 다 0입니다 (기준점 없음은
/// 에러가 아닌 정책). `previous`가 0이면 변동률만 0으로 보호합니다.
pub fn change_metrics(current: Decimal, previous: Option<Decimal>) -> (Decimal, Decimal) {
    let previous = match previous {
        Some(p) => p,
        None => return (Decimal::ZERO, Decimal::ZERO),
    };

    let change = current - previous;
    let change_percent = if previous.is_zero() {
        Decimal::ZERO
    } else {
        (change / previous * Decimal::ONE_HUNDRED).round_dp(RATE_SCALE)
    };

    (change, change_percent)
}

/// 새 관측값으로부터 완성된 레코드를 생성합니다.
///
/// 변동 지표는 항상 `previous` 스냅샷에서 *같은 심볼*의 레코드를 기준으로
/// 계산합니다. 심볼이 없으면 첫 관측으로 취급합니다.
pub fn compute_record(
    symbol: &str,
    value: Decimal,
    observed_at: DateTime<Utc>,
    previous: &RateSnapshot,
) -> CoreResult<RateRecord> {
    let baseline = previous.get(symbol).map(|r| r.value);
    let (change, change_percent) = change_metrics(value, baseline);

    RateRecord::new(symbol, value, change, change_percent, observed_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceId;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn previous_snapshot(symbol: &str, value: Decimal) -> RateSnapshot {
        let now = Utc::now();
        let record = RateRecord::new(symbol, value, Decimal::ZERO, Decimal::ZERO, now).unwrap();
        let mut records = HashMap::new();
        records.insert(symbol.to_string(), record);
        RateSnapshot::new(SourceId::Cbr, records, now)
    }

    #[test]
    fn test_first_observation_has_zero_change() {
        let empty = RateSnapshot::empty(SourceId::Cbr);
        let record = compute_record("USD", dec!(90.00), Utc::now(), &empty).unwrap();

        assert_eq!(record.value, dec!(90.00));
        assert_eq!(record.change, Decimal::ZERO);
        assert_eq!(record.change_percent, Decimal::ZERO);
    }

    #[test]
    fn test_change_against_previous_observation() {
        let previous = previous_snapshot("USD", dec!(90.00));
        let record = compute_record("USD", dec!(91.80), Utc::now(), &previous).unwrap();

        assert_eq!(record.value, dec!(91.80));
        assert_eq!(record.change, dec!(1.80));
        assert_eq!(record.change_percent, dec!(2.00));
    }

    #[test]
    fn test_negative_change() {
        let previous = previous_snapshot("EUR", dec!(100.00));
        let record = compute_record("EUR", dec!(98.50), Utc::now(), &previous).unwrap();

        assert_eq!(record.change, dec!(-1.50));
        assert_eq!(record.change_percent, dec!(-1.50));
    }

    #[test]
    fn test_zero_previous_guards_percent() {
        let previous = previous_snapshot("JPY", Decimal::ZERO);
        let record = compute_record("JPY", dec!(0.62), Utc::now(), &previous).unwrap();

        assert_eq!(record.change, dec!(0.62));
        assert_eq!(record.change_percent, Decimal::ZERO);
    }

    #[test]
    fn test_mismatched_symbol_is_not_a_baseline() {
        let previous = previous_snapshot("USD", dec!(90.00));
        let record = compute_record("EUR", dec!(105.00), Utc::now(), &previous).unwrap();

        assert_eq!(record.change, Decimal::ZERO);
        assert_eq!(record.change_percent, Decimal::ZERO);
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(decimal_from_f64(90.123456), Some(dec!(90.1235)));
        assert_eq!(decimal_from_f64(f64::NAN), None);
        assert_eq!(decimal_from_f64(f64::INFINITY), None);
    }
}
