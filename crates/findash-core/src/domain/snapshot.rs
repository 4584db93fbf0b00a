//! 캐시 스냅샷 타입.
//!
//! 한 번의 페치 사이클이 만들어낸 일관된 레코드 집합입니다.
//! 스냅샷은 필드 단위로 수정되지 않고 항상 통째로 교체되므로,
//! 읽는 쪽은 서로 다른 페치 사이클의 레코드가 섞인 상태를 볼 수 없습니다.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::rate::{RateRecord, SourceId};

/// 하나의 페치 사이클이 생성한 불변 레코드 집합.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// 데이터 소스 식별자
    pub source: SourceId,
    /// 심볼별 레코드 (키는 대문자)
    pub records: HashMap<String, RateRecord>,
    /// 마지막으로 성공한 업스트림 페치 시각. 빈 스냅샷은 `None`.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RateSnapshot {
    /// 프로세스 시작 시점의 빈 스냅샷을 생성합니다.
    ///
    /// `fetched_at`이 없으므로 어떤 TTL에 대해서도 fresh가 아닙니다.
    pub fn empty(source: SourceId) -> Self {
        Self {
            source,
            records: HashMap::new(),
            fetched_at: None,
        }
    }

    /// 성공한 페치 결과로 새 스냅샷을 생성합니다.
    pub fn new(
        source: SourceId,
        records: HashMap<String, RateRecord>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            records,
            fetched_at: Some(fetched_at),
        }
    }

    /// 레코드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 레코드 수.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 심볼로 레코드 조회 (대소문자 무시).
    pub fn get(&self, symbol: &str) -> Option<&RateRecord> {
        self.records.get(&symbol.to_uppercase())
    }

    /// 마지막 페치 이후 경과 시간. 빈 스냅샷은 `None`.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.fetched_at.map(|t| now.signed_duration_since(t))
    }

    /// 스냅샷이 아직 유효한지 확인합니다 (`now - fetched_at < ttl`).
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.age(now) {
            Some(age) => age < ttl,
            None => false,
        }
    }
}
