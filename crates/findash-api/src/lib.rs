//! 금융 대시보드 REST API.
//!
//! 파이프라인 코어(`findash-data`)가 노출하는 소비자 계약을 얇은
//! HTTP 레이어로 감쌉니다.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiErrorResponse;
pub use routes::create_api_router;
pub use state::AppState;
