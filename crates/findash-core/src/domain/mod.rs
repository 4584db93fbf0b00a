//! 금융 참조 데이터 도메인 모델.

mod calculations;
mod rate;
mod snapshot;

pub use calculations::*;
pub use rate::*;
pub use snapshot::*;
