//! 파이프라인 동시성 통합 테스트.
//!
//! 캐시 만료 구간에 동시 호출자가 몰려도 업스트림 호출이 한 번만
//! 발생하는지(single-flight)를 검증합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;

use findash_core::{SourceConfig, SourceId};
use findash_data::{PipelineError, RateProvider, RateService, RawRateTable, UpstreamError};

/// 응답 전에 일정 시간 대기하는 제공자. 호출 횟수를 기록합니다.
struct SlowProvider {
    delay: StdDuration,
    calls: AtomicUsize,
}

impl SlowProvider {
    fn new(delay: StdDuration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RateProvider for SlowProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Cbr
    }

    async fn fetch_rates(&self) -> Result<RawRateTable, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let mut values = HashMap::new();
        values.insert("USD".to_string(), dec!(90.00));
        Ok(RawRateTable {
            values,
            observed_at: None,
        })
    }
}

/// 일정 시간 대기 후 항상 타임아웃으로 실패하는 제공자.
struct FailingProvider {
    delay: StdDuration,
    calls: AtomicUsize,
}

impl FailingProvider {
    fn new(delay: StdDuration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RateProvider for FailingProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Cbr
    }

    async fn fetch_rates(&self) -> Result<RawRateTable, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Err(UpstreamError::Timeout)
    }
}

fn test_config() -> SourceConfig {
    SourceConfig {
        cache_ttl_secs: 3600,
        tracked_symbols: vec!["USD".to_string()],
        ..SourceConfig::cbr_default()
    }
}

#[tokio::test]
async fn concurrent_callers_share_a_single_upstream_call() {
    let provider = Arc::new(SlowProvider::new(StdDuration::from_millis(50)));
    let service = Arc::new(RateService::new(
        Arc::clone(&provider) as Arc<dyn RateProvider>,
        &test_config(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.get_rates(Utc::now()).await
        }));
    }

    for handle in handles {
        let view = handle.await.unwrap().unwrap();
        assert!(!view.stale);
        assert_eq!(view.snapshot.get("USD").unwrap().value, dec!(90.00));
    }

    // 캐시 만료 구간 하나당 업스트림 호출은 정확히 한 번
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_callers_share_a_single_failed_upstream_call() {
    let provider = Arc::new(FailingProvider::new(StdDuration::from_millis(50)));
    let service = Arc::new(RateService::new(
        Arc::clone(&provider) as Arc<dyn RateProvider>,
        &test_config(),
    ));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.get_rates(Utc::now()).await
        }));
    }

    // 콜드 스타트 실패는 모든 호출자에게 NoDataAvailable로 전파된다
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, PipelineError::NoDataAvailable { .. }));
    }

    // 실패한 갱신도 만료 구간 하나당 업스트림 호출은 한 번.
    // 대기자들은 자기 호출을 새로 만들지 않고 그 실패를 공유한다.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // 다음에 새로 도착한 호출자는 갱신을 다시 시도한다
    let err = service.get_rates(Utc::now()).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoDataAvailable { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn abandoned_caller_does_not_cancel_shared_refresh() {
    let provider = Arc::new(SlowProvider::new(StdDuration::from_millis(50)));
    let service = Arc::new(RateService::new(
        Arc::clone(&provider) as Arc<dyn RateProvider>,
        &test_config(),
    ));

    // 첫 호출자를 띄운 뒤 업스트림 호출이 시작되자마자 요청을 포기
    let abandoned = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.get_rates(Utc::now()).await })
    };
    tokio::time::sleep(StdDuration::from_millis(10)).await;
    abandoned.abort();
    let _ = abandoned.await;

    // 진행 중이던 갱신이 완료될 때까지 대기
    tokio::time::sleep(StdDuration::from_millis(100)).await;

    // 갱신 결과는 캐시에 반영되어 있어야 하고, 새 호출자는 업스트림을
    // 다시 부르지 않고 그 결과를 사용한다
    let view = service.get_rates(Utc::now()).await.unwrap();
    assert_eq!(view.snapshot.get("USD").unwrap().value, dec!(90.00));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
