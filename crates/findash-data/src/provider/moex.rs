//! 모스크바 거래소(MOEX) ISS 시세 클라이언트.
//!
//! TQBR 보드의 전 종목 시세를 한 번의 GET으로 조회합니다.
//! ISS 응답은 컬럼형(columns + data 행렬)이므로 컬럼 인덱스를 찾은 뒤
//! 행 단위로 해석합니다.
//!
//! # 응답 스키마
//!
//! ```json
//! {
//!   "marketdata": {
//!     "columns": ["SECID", "LAST"],
//!     "data": [["SBER", 285.5], ["GAZP", null]]
//!   }
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use findash_core::{decimal_from_f64, SourceConfig, SourceId};

use super::{RateProvider, RawRateTable};
use crate::error::UpstreamError;

/// ISS securities 응답.
#[derive(Debug, Deserialize)]
struct MoexSecuritiesResponse {
    marketdata: MoexTable,
}

/// ISS 컬럼형 테이블 블록.
#[derive(Debug, Deserialize)]
struct MoexTable {
    columns: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

/// MOEX ISS 시세 클라이언트.
#[derive(Clone)]
pub struct MoexClient {
    client: reqwest::Client,
    base_url: String,
}

impl MoexClient {
    /// 설정으로부터 새 클라이언트를 생성합니다.
    pub fn new(config: &SourceConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 응답 본문을 원시 시세 테이블로 변환합니다.
    ///
    /// LAST가 null이거나 0인 행은 아직 체결이 없는 종목이므로 건너뜁니다.
    /// 음수 LAST나 누락된 필수 컬럼은 스키마 오류로 전체 실패합니다.
    fn parse_rates(body: &str) -> Result<RawRateTable, UpstreamError> {
        let json: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("body is not JSON: {}", e)))?;

        let response: MoexSecuritiesResponse = serde_json::from_value(json)
            .map_err(|e| UpstreamError::UnexpectedSchema(e.to_string()))?;

        let columns = &response.marketdata.columns;
        let secid_idx = columns
            .iter()
            .position(|c| c == "SECID")
            .ok_or_else(|| UpstreamError::UnexpectedSchema("missing SECID column".to_string()))?;
        let last_idx = columns
            .iter()
            .position(|c| c == "LAST")
            .ok_or_else(|| UpstreamError::UnexpectedSchema("missing LAST column".to_string()))?;

        let mut values = HashMap::new();
        for row in &response.marketdata.data {
            if row.len() <= secid_idx.max(last_idx) {
                return Err(UpstreamError::UnexpectedSchema(format!(
                    "row shorter than column set: {:?}",
                    row
                )));
            }

            let ticker = row[secid_idx].as_str().ok_or_else(|| {
                UpstreamError::UnexpectedSchema(format!("SECID is not a string: {}", row[secid_idx]))
            })?;

            let last = match row[last_idx].as_f64() {
                Some(v) if v > 0.0 => v,
                Some(v) if v < 0.0 => {
                    return Err(UpstreamError::UnexpectedSchema(format!(
                        "negative price for {}: {}",
                        ticker, v
                    )));
                }
                // null 또는 0: 체결가 없는 종목 (장 시작 전 등)
                _ => continue,
            };

            let value = decimal_from_f64(last).ok_or_else(|| {
                UpstreamError::UnexpectedSchema(format!("non-finite price for {}: {}", ticker, last))
            })?;
            values.insert(ticker.to_uppercase(), value);
        }

        // ISS는 업스트림 관측 시각을 시세 행에 싣지 않으므로 처리 시각 사용
        Ok(RawRateTable {
            values,
            observed_at: None,
        })
    }
}

#[async_trait]
impl RateProvider for MoexClient {
    fn source_id(&self) -> SourceId {
        SourceId::Moex
    }

    async fn fetch_rates(&self) -> Result<RawRateTable, UpstreamError> {
        let url = format!(
            "{}/engines/stock/markets/shares/boards/TQBR/securities.json",
            self.base_url
        );
        debug!(%url, "Fetching MOEX market data");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("iss.only", "marketdata"),
                ("marketdata.columns", "SECID,LAST"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::InvalidResponse(format!(
                "MOEX API returned status {}",
                status
            )));
        }

        let table = Self::parse_rates(&body)?;
        debug!(count = table.values.len(), "Parsed MOEX prices");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MARKETDATA_JSON: &str = r#"{
        "marketdata": {
            "columns": ["SECID", "LAST"],
            "data": [
                ["SBER", 285.5],
                ["GAZP", 128.73],
                ["VTBR", null],
                ["ZZZZ", 0.0]
            ]
        }
    }"#;

    fn test_config(base_url: String) -> SourceConfig {
        SourceConfig {
            base_url,
            ..SourceConfig::moex_default()
        }
    }

    #[test]
    fn test_parse_skips_rows_without_last_price() {
        let table = MoexClient::parse_rates(MARKETDATA_JSON).unwrap();

        assert_eq!(table.values.len(), 2);
        assert_eq!(table.values["SBER"], dec!(285.5));
        assert_eq!(table.values["GAZP"], dec!(128.73));
        assert!(table.observed_at.is_none());
    }

    #[test]
    fn test_parse_rejects_negative_price_entirely() {
        let body = r#"{"marketdata": {
            "columns": ["SECID", "LAST"],
            "data": [["SBER", 285.5], ["GAZP", -1.0]]
        }}"#;
        // 음수 체결가는 건너뛰지 않고 부분 결과 없이 전체 실패
        let err = MoexClient::parse_rates(body).unwrap_err();
        assert!(matches!(err, UpstreamError::UnexpectedSchema(_)));
    }

    #[test]
    fn test_parse_rejects_missing_column() {
        let body = r#"{"marketdata": {"columns": ["SECID"], "data": [["SBER"]]}}"#;
        let err = MoexClient::parse_rates(body).unwrap_err();
        assert!(matches!(err, UpstreamError::UnexpectedSchema(_)));
    }

    #[test]
    fn test_parse_rejects_missing_marketdata_block() {
        let err = MoexClient::parse_rates(r#"{"securities": {}}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::UnexpectedSchema(_)));
    }

    #[test]
    fn test_parse_respects_column_order() {
        // 컬럼 순서가 바뀌어도 인덱스로 찾아야 함
        let body = r#"{"marketdata": {"columns": ["LAST", "SECID"], "data": [[285.5, "SBER"]]}}"#;
        let table = MoexClient::parse_rates(body).unwrap();
        assert_eq!(table.values["SBER"], dec!(285.5));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/engines/stock/markets/shares/boards/TQBR/securities.json",
            )
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(MARKETDATA_JSON)
            .create_async()
            .await;

        let client = MoexClient::new(&test_config(server.url())).unwrap();
        let table = client.fetch_rates().await.unwrap();

        mock.assert_async().await;
        assert_eq!(table.values["SBER"], dec!(285.5));
    }

    #[tokio::test]
    async fn test_fetch_maps_http_error_to_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/engines/stock/markets/shares/boards/TQBR/securities.json",
            )
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = MoexClient::new(&test_config(server.url())).unwrap();
        let err = client.fetch_rates().await.unwrap_err();

        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }
}
