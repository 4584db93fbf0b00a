//! 인메모리 스냅샷 캐시.
//!
//! 마지막으로 성공한 페치의 스냅샷 하나만 보관합니다. 단일 writer,
//! 다중 reader 구조이며, 스냅샷은 통째로만 교체됩니다. 읽는 쪽은
//! 교체 전이나 후의 완전한 스냅샷만 관찰합니다.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use findash_core::{RateSnapshot, SourceId};

/// 최신 스냅샷을 보관하는 저장소.
///
/// 핸들은 `Clone`으로 복제해 공유합니다. 내부적으로 `Arc<RateSnapshot>`를
/// 보관하므로 읽기는 포인터 복제 한 번이면 끝나고, 네트워크 활동을
/// 기다리지 않습니다.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Arc<RateSnapshot>>>,
}

impl SnapshotStore {
    /// 빈 스냅샷으로 초기화된 저장소를 생성합니다.
    pub fn new(source: SourceId) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(RateSnapshot::empty(source)))),
        }
    }

    /// 현재 스냅샷을 반환합니다. 비어 있어도 즉시 반환합니다.
    pub async fn read(&self) -> Arc<RateSnapshot> {
        Arc::clone(&*self.inner.read().await)
    }

    /// 스냅샷을 원자적으로 교체합니다.
    pub async fn replace(&self, snapshot: Arc<RateSnapshot>) {
        *self.inner.write().await = snapshot;
    }

    /// 마지막 성공 페치 이후 경과 시간. 빈 스냅샷은 `None`.
    pub async fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.read().await.age(now)
    }
}
