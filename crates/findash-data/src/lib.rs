//! 데이터 파이프라인.
//!
//! 이 crate는 다음을 제공합니다:
//! - 업스트림 데이터 소스 클라이언트 (CBR 환율, MOEX 주식 시세)
//! - 인메모리 스냅샷 캐시
//! - 페치-파싱-캐시-폴백 오케스트레이션

pub mod cache;
pub mod error;
pub mod provider;
pub mod service;

pub use cache::SnapshotStore;
pub use error::{PipelineError, Result, UpstreamError};
pub use provider::{CbrClient, MoexClient, RateProvider, RawRateTable};
pub use service::{RateService, RateView, RatesView};
