//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정은 TOML 파일에서 로드되며 `FINDASH__` 접두사 환경 변수로
//! 오버라이드할 수 있습니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// CBR 환율 소스 설정
    #[serde(default = "SourceConfig::cbr_default")]
    pub cbr: SourceConfig,
    /// MOEX 주식 시세 소스 설정
    #[serde(default = "SourceConfig::moex_default")]
    pub moex: SourceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            cbr: SourceConfig::cbr_default(),
            moex: SourceConfig::moex_default(),
        }
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// CORS 허용 origin 목록 ("*" = 전체 허용)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 업스트림 데이터 소스 설정.
///
/// 파이프라인 코어는 이 값을 소비만 합니다. TTL과 타임아웃, 추적 심볼
/// 목록의 소유권은 설정 계층에 있습니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// 이 소스 활성화 여부
    pub enabled: bool,
    /// 업스트림 기본 URL
    pub base_url: String,
    /// 업스트림 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 캐시 TTL (초). 이 시간 안에는 업스트림을 다시 호출하지 않습니다.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// 추적 심볼 allow-list. 업스트림이 반환한 그 외 심볼은 버려집니다.
    pub tracked_symbols: Vec<String>,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    900
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::cbr_default()
    }
}

impl SourceConfig {
    /// CBR 환율 소스 기본값.
    pub fn cbr_default() -> Self {
        Self {
            enabled: true,
            base_url: "https://www.cbr-xml-daily.ru".to_string(),
            request_timeout_secs: default_request_timeout(),
            // 일 단위로 갱신되는 환율이므로 15분이면 충분
            cache_ttl_secs: 900,
            tracked_symbols: ["USD", "EUR", "CNY", "GBP", "JPY"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// MOEX 주식 시세 소스 기본값.
    pub fn moex_default() -> Self {
        Self {
            enabled: true,
            base_url: "https://iss.moex.com/iss".to_string(),
            request_timeout_secs: default_request_timeout(),
            cache_ttl_secs: 300,
            tracked_symbols: ["SBER", "GAZP", "VTBR", "YNDX", "ROSN", "LKOH", "MGNT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// 요청 타임아웃.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 캐시 TTL.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            // 파일에서 로드 (없어도 무방)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("FINDASH")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}
