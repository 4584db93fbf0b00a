//! 금융 대시보드 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! CBR 환율과 MOEX 주식 시세를 캐시 경유로 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use findash_api::routes::create_api_router;
use findash_api::state::AppState;
use findash_core::config::{AppConfig, SourceConfig};
use findash_core::logging::{init_logging, LogConfig};
use findash_data::{CbrClient, MoexClient, RateProvider, RateService};

/// 활성화된 소스에 대해 서비스를 생성합니다.
///
/// 비활성화된 소스는 None을 반환하고 warn 로그를 남깁니다.
fn build_service<P, F>(
    name: &str,
    config: &SourceConfig,
    make_provider: F,
) -> Option<Arc<RateService>>
where
    P: RateProvider + 'static,
    F: FnOnce(&SourceConfig) -> Result<P, findash_data::UpstreamError>,
{
    if !config.enabled {
        warn!(source = name, "Data source disabled by configuration");
        return None;
    }

    match make_provider(config) {
        Ok(provider) => {
            info!(
                source = name,
                base_url = %config.base_url,
                ttl_secs = config.cache_ttl_secs,
                symbols = config.tracked_symbols.len(),
                "Data source initialized"
            );
            Some(Arc::new(RateService::new(Arc::new(provider), config)))
        }
        Err(e) => {
            warn!(source = name, error = %e, "Failed to initialize data source");
            None
        }
    }
}

/// CORS 미들웨어 구성.
///
/// `cors_origins`에 `"*"`가 포함되어 있으면 모든 origin을 허용합니다.
/// 그렇지 않으면 파싱 가능한 origin만 허용 목록에 넣습니다.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        warn!("CORS configured to allow any origin");
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        if parsed.is_empty() {
            warn!("No valid CORS origins configured, allowing any");
            AllowOrigin::any()
        } else {
            info!("CORS configured with {} allowed origins", parsed.len());
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // 설정 로드
    let config = AppConfig::load_default()?;

    // tracing 초기화
    init_logging(LogConfig::from_app_config(&config.logging))?;

    info!("Starting Findash API server...");

    // 데이터 소스별 서비스 생성
    let cbr = build_service("cbr", &config.cbr, CbrClient::new);
    let moex = build_service("moex", &config.moex, MoexClient::new);

    if cbr.is_none() && moex.is_none() {
        warn!("No data sources enabled, only health endpoints will respond");
    }

    let state = Arc::new(AppState::new(cbr, moex));
    info!(version = %state.version, "Application state initialized");

    let app = create_router(state, &config.server.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
