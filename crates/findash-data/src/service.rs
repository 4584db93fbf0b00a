//! 페치-파싱-캐시-폴백 오케스트레이터.
//!
//! 캐시가 신선하면 캐시를, 만료되었으면 업스트림을 호출해 변동 지표를
//! 계산한 새 스냅샷을 반환합니다. 업스트림이 실패해도 이전 스냅샷이
//! 있으면 오래된 데이터를 stale 표시와 함께 제공합니다.
//!
//! # 동시성
//!
//! 갱신 경로는 `refresh_lock`으로 직렬화됩니다. 캐시 만료 구간에
//! 동시에 들어온 호출자들 중 하나만 업스트림을 호출하고, 나머지는
//! 락에서 대기한 뒤 그 갱신의 결과를 공유합니다. 성공이면 이중 확인이
//! 갱신된 캐시를 반환하고, 실패면 세대 카운터로 완료된 시도를 감지해
//! 기록된 실패를 그대로 넘겨받습니다. 어느 쪽이든 만료 구간 하나당
//! 업스트림 호출은 한 번입니다. 갱신 본문은 별도 태스크에서 실행되므로
//! 호출자가 요청을 포기해도 진행 중인 공유 갱신은 끝까지 완료됩니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use findash_core::{compute_record, RateRecord, RateSnapshot, SourceConfig, SourceId};

use crate::cache::SnapshotStore;
use crate::error::{PipelineError, Result, UpstreamError};
use crate::provider::RateProvider;

/// `get_rates`가 반환하는 스냅샷 뷰.
#[derive(Debug, Clone)]
pub struct RatesView {
    /// 제공되는 스냅샷 (신선하거나, 폴백된 과거 데이터)
    pub snapshot: Arc<RateSnapshot>,
    /// 업스트림 실패로 TTL이 지난 데이터를 제공 중인지 여부
    pub stale: bool,
}

/// `get_rate`가 반환하는 단일 레코드 뷰.
#[derive(Debug, Clone)]
pub struct RateView {
    pub record: RateRecord,
    pub source: SourceId,
    pub fetched_at: Option<DateTime<Utc>>,
    pub stale: bool,
}

/// 한 데이터 소스에 대한 페치 오케스트레이터.
///
/// 소스마다 하나씩 생성합니다 (CBR용 하나, MOEX용 하나).
pub struct RateService {
    provider: Arc<dyn RateProvider>,
    store: SnapshotStore,
    ttl: Duration,
    /// 대문자로 정규화된 추적 심볼 allow-list
    tracked: Vec<String>,
    /// 갱신 경로 단일화용 락. 신선도 확인과 갱신 결정을 원자적으로 묶으며,
    /// 마지막으로 실패한 갱신의 에러를 대기자들과 공유하기 위해 보관합니다.
    refresh_lock: Mutex<Option<UpstreamError>>,
    /// 완료된 갱신 시도(성공/실패 무관)마다 증가하는 세대 카운터.
    /// 락 대기 중에 시도가 끝났는지 감지하는 데 사용합니다.
    refresh_generation: AtomicU64,
}

impl RateService {
    /// 새 오케스트레이터를 생성합니다. 캐시는 비어 있는 상태로 시작합니다.
    pub fn new(provider: Arc<dyn RateProvider>, config: &SourceConfig) -> Self {
        let source = provider.source_id();
        Self {
            provider,
            store: SnapshotStore::new(source),
            ttl: config.cache_ttl(),
            tracked: config
                .tracked_symbols
                .iter()
                .map(|s| s.to_uppercase())
                .collect(),
            refresh_lock: Mutex::new(None),
            refresh_generation: AtomicU64::new(0),
        }
    }

    /// 데이터 소스 식별자.
    pub fn source(&self) -> SourceId {
        self.provider.source_id()
    }

    /// 추적 심볼 allow-list.
    pub fn tracked_symbols(&self) -> &[String] {
        &self.tracked
    }

    /// 현재 스냅샷을 갱신 시도 없이 반환합니다 (헬스 체크용).
    pub async fn peek(&self) -> Arc<RateSnapshot> {
        self.store.read().await
    }

    /// 전체 시세 스냅샷을 반환합니다.
    ///
    /// 1. 캐시가 신선하고 비어 있지 않으면 네트워크 호출 없이 반환
    /// 2. 아니면 업스트림을 호출해 캐시를 교체
    /// 3. 업스트림 실패 시 이전 스냅샷이 있으면 stale로 반환, 없으면
    ///    `NoDataAvailable`
    ///
    /// 같은 만료 구간에 몰린 동시 호출자 중 업스트림을 부르는 것은
    /// 하나뿐입니다. 나머지는 그 시도의 결과(성공이든 실패든)를
    /// 공유합니다.
    pub async fn get_rates(&self, now: DateTime<Utc>) -> Result<RatesView> {
        let snapshot = self.store.read().await;
        if snapshot.is_fresh(now, self.ttl) && !snapshot.is_empty() {
            return Ok(RatesView {
                snapshot,
                stale: false,
            });
        }

        // 갱신 경로 진입. 락에 줄을 서기 전의 세대를 기억해 둡니다.
        let observed_generation = self.refresh_generation.load(Ordering::SeqCst);
        let mut last_failure = self.refresh_lock.lock().await;

        // 이중 확인: 락 대기 중에 다른 호출자가 이미 갱신했을 수 있음
        let previous = self.store.read().await;
        if previous.is_fresh(now, self.ttl) && !previous.is_empty() {
            debug!(source = %self.source(), "Refresh already completed by a concurrent caller");
            return Ok(RatesView {
                snapshot: previous,
                stale: false,
            });
        }

        // 줄 서 있는 동안 완료된 시도가 있는데 캐시가 여전히 만료
        // 상태라면 그 시도는 실패한 것입니다. 같은 만료 구간에서
        // 업스트림을 다시 부르는 대신 기록된 실패를 공유합니다.
        if self.refresh_generation.load(Ordering::SeqCst) != observed_generation {
            let err = last_failure.clone().unwrap_or_else(|| {
                UpstreamError::ConnectionFailed("shared refresh failed".to_string())
            });
            debug!(source = %self.source(), error = %err, "Sharing outcome of a failed concurrent refresh");
            return self.serve_fallback(previous, err, now);
        }

        let outcome = self.refresh(Arc::clone(&previous), now).await;
        self.refresh_generation.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Ok(fresh) => {
                *last_failure = None;
                Ok(RatesView {
                    snapshot: fresh,
                    stale: false,
                })
            }
            Err(err) => {
                *last_failure = Some(err.clone());
                self.serve_fallback(previous, err, now)
            }
        }
    }

    /// 업스트림 실패 시의 폴백 경로.
    ///
    /// 이전 스냅샷이 있으면 stale로 제공하고, 비어 있으면(콜드 스타트)
    /// `NoDataAvailable`로 실패합니다.
    fn serve_fallback(
        &self,
        previous: Arc<RateSnapshot>,
        err: UpstreamError,
        now: DateTime<Utc>,
    ) -> Result<RatesView> {
        if !previous.is_empty() {
            warn!(
                source = %self.source(),
                error = %err,
                age_secs = previous.age(now).map(|a| a.num_seconds()).unwrap_or(-1),
                "Upstream fetch failed, serving stale snapshot"
            );
            Ok(RatesView {
                snapshot: previous,
                stale: true,
            })
        } else {
            warn!(source = %self.source(), error = %err, "Upstream fetch failed with empty cache");
            Err(PipelineError::NoDataAvailable { source: err })
        }
    }

    /// 단일 심볼의 시세를 반환합니다 (대소문자 무시).
    pub async fn get_rate(&self, symbol: &str, now: DateTime<Utc>) -> Result<RateView> {
        let view = self.get_rates(now).await?;

        match view.snapshot.get(symbol) {
            Some(record) => Ok(RateView {
                record: record.clone(),
                source: view.snapshot.source,
                fetched_at: view.snapshot.fetched_at,
                stale: view.stale,
            }),
            None => Err(PipelineError::SymbolNotFound {
                symbol: symbol.to_uppercase(),
            }),
        }
    }

    /// 업스트림을 호출해 새 스냅샷을 만들고 캐시를 교체합니다.
    ///
    /// 본문은 spawn된 태스크에서 실행됩니다. 이 future를 기다리던
    /// 호출자가 중간에 사라져도 태스크는 캐시 교체까지 완료하므로,
    /// 뒤이은 호출자들이 결과를 활용합니다.
    async fn refresh(
        &self,
        previous: Arc<RateSnapshot>,
        now: DateTime<Utc>,
    ) -> std::result::Result<Arc<RateSnapshot>, UpstreamError> {
        let provider = Arc::clone(&self.provider);
        let store = self.store.clone();
        let tracked = self.tracked.clone();
        let source = self.source();

        let handle = tokio::spawn(async move {
            let raw = provider.fetch_rates().await?;
            let observed_at = raw.observed_at.unwrap_or(now);

            let mut records = HashMap::with_capacity(tracked.len());
            for (symbol, value) in raw.values {
                let symbol = symbol.to_uppercase();
                if !tracked.contains(&symbol) {
                    debug!(%symbol, %source, "Discarding untracked symbol from upstream payload");
                    continue;
                }

                let record = compute_record(&symbol, value, observed_at, &previous)
                    .map_err(|e| UpstreamError::UnexpectedSchema(e.to_string()))?;
                records.insert(symbol, record);
            }

            if records.is_empty() {
                return Err(UpstreamError::UnexpectedSchema(
                    "payload contained none of the tracked symbols".to_string(),
                ));
            }

            let snapshot = Arc::new(RateSnapshot::new(source, records, now));
            store.replace(Arc::clone(&snapshot)).await;
            info!(%source, count = snapshot.len(), "Snapshot refreshed");
            Ok(snapshot)
        });

        match handle.await {
            Ok(result) => result,
            // 태스크 패닉. 업스트림 실패와 동일하게 폴백 경로를 태웁니다.
            Err(e) => Err(UpstreamError::ConnectionFailed(format!(
                "refresh task aborted: {}",
                e
            ))),
        }
    }
}
