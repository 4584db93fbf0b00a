//! 러시아 중앙은행(CBR) 환율 클라이언트.
//!
//! cbr-xml-daily JSON 미러(`/daily_json.js`)에서 일일 환율을 조회합니다.
//!
//! # 응답 스키마
//!
//! ```json
//! {
//!   "Date": "2025-08-22T11:30:00+03:00",
//!   "Valute": {
//!     "USD": { "CharCode": "USD", "Nominal": 1, "Value": 90.0, "Previous": 89.5 }
//!   }
//! }
//! ```
//!
//! `Previous` 필드는 사용하지 않습니다. 변동폭은 항상 우리 쪽 직전
//! 스냅샷을 기준으로 계산합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use findash_core::{decimal_from_f64, SourceConfig, SourceId};

use super::{RateProvider, RawRateTable};
use crate::error::UpstreamError;

/// CBR 일일 환율 응답.
#[derive(Debug, Deserialize)]
struct CbrDailyResponse {
    /// 업스트림 관측 시각 (타임존 오프셋 포함)
    #[serde(rename = "Date")]
    date: Option<String>,
    /// 통화 코드별 환율
    #[serde(rename = "Valute")]
    valute: HashMap<String, CbrValute>,
}

/// 통화 하나의 환율 데이터.
#[derive(Debug, Deserialize)]
struct CbrValute {
    #[serde(rename = "Value")]
    value: f64,
}

/// CBR 환율 클라이언트.
#[derive(Clone)]
pub struct CbrClient {
    client: reqwest::Client,
    base_url: String,
}

impl CbrClient {
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
    /// 값 하나라도 유효하지 않으면 전체 실패입니다. 부분 결과는
    /// 반환하지 않습니다.
    fn parse_rates(body: &str) -> Result<RawRateTable, UpstreamError> {
        // 1단계: JSON 자체가 유효한지
        let json: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("body is not JSON: {}", e)))?;

        // 2단계: 기대하는 스키마인지
        let response: CbrDailyResponse = serde_json::from_value(json)
            .map_err(|e| UpstreamError::UnexpectedSchema(e.to_string()))?;

        if response.valute.is_empty() {
            return Err(UpstreamError::UnexpectedSchema(
                "payload contains no rates".to_string(),
            ));
        }

        let mut values = HashMap::with_capacity(response.valute.len());
        for (code, valute) in response.valute {
            let code = code.to_uppercase();
            if valute.value < 0.0 {
                return Err(UpstreamError::UnexpectedSchema(format!(
                    "negative rate for {}: {}",
                    code, valute.value
                )));
            }
            let value = decimal_from_f64(valute.value).ok_or_else(|| {
                UpstreamError::UnexpectedSchema(format!(
                    "non-finite rate for {}: {}",
                    code, valute.value
                ))
            })?;
            values.insert(code, value);
        }

        let observed_at = match response.date.as_deref() {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    warn!(date = raw, error = %e, "Unparseable CBR Date field, using processing time");
                    None
                }
            },
            None => None,
        };

        Ok(RawRateTable {
            values,
            observed_at,
        })
    }
}

#[async_trait]
impl RateProvider for CbrClient {
    fn source_id(&self) -> SourceId {
        SourceId::Cbr
    }

    async fn fetch_rates(&self) -> Result<RawRateTable, UpstreamError> {
        let url = format!("{}/daily_json.js", self.base_url);
        debug!(%url, "Fetching CBR daily rates");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::InvalidResponse(format!(
                "CBR API returned status {}",
                status
            )));
        }

        let table = Self::parse_rates(&body)?;
        debug!(count = table.values.len(), "Parsed CBR rates");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const DAILY_JSON: &str = r#"{
        "Date": "2025-08-22T11:30:00+03:00",
        "PreviousDate": "2025-08-21T11:30:00+03:00",
        "Valute": {
            "USD": {"CharCode": "USD", "Nominal": 1, "Value": 90.1234, "Previous": 89.5},
            "EUR": {"CharCode": "EUR", "Nominal": 1, "Value": 98.7654, "Previous": 99.1},
            "JPY": {"CharCode": "JPY", "Nominal": 100, "Value": 61.55, "Previous": 61.2}
        }
    }"#;

    fn test_config(base_url: String) -> SourceConfig {
        SourceConfig {
            base_url,
            ..SourceConfig::cbr_default()
        }
    }

    #[test]
    fn test_parse_valid_payload() {
        let table = CbrClient::parse_rates(DAILY_JSON).unwrap();

        assert_eq!(table.values.len(), 3);
        assert_eq!(table.values["USD"], dec!(90.1234));
        assert_eq!(table.values["JPY"], dec!(61.55));
        // Date는 UTC로 변환됨 (+03:00 → 08:30 UTC)
        let observed = table.observed_at.unwrap();
        assert_eq!(observed.to_rfc3339(), "2025-08-22T08:30:00+00:00");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = CbrClient::parse_rates("<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_rejects_missing_valute() {
        let err = CbrClient::parse_rates(r#"{"Date": "2025-08-22T11:30:00+03:00"}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::UnexpectedSchema(_)));
    }

    #[test]
    fn test_parse_rejects_negative_rate_entirely() {
        let body = r#"{"Valute": {
            "USD": {"Value": 90.0},
            "EUR": {"Value": -1.0}
        }}"#;
        // 값 하나가 잘못되면 부분 결과 없이 전체 실패
        let err = CbrClient::parse_rates(body).unwrap_err();
        assert!(matches!(err, UpstreamError::UnexpectedSchema(_)));
    }

    #[test]
    fn test_parse_unparseable_date_falls_back_to_none() {
        let body = r#"{"Date": "not-a-date", "Valute": {"USD": {"Value": 90.0}}}"#;
        let table = CbrClient::parse_rates(body).unwrap();
        assert!(table.observed_at.is_none());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/daily_json.js")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DAILY_JSON)
            .create_async()
            .await;

        let client = CbrClient::new(&test_config(server.url())).unwrap();
        let table = client.fetch_rates().await.unwrap();

        mock.assert_async().await;
        assert_eq!(table.values["USD"], dec!(90.1234));
    }

    #[tokio::test]
    async fn test_fetch_maps_http_error_to_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/daily_json.js")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = CbrClient::new(&test_config(server.url())).unwrap();
        let err = client.fetch_rates().await.unwrap_err();

        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_connection_failure() {
        // 아무도 리슨하지 않는 포트
        let client = CbrClient::new(&test_config("http://127.0.0.1:1".to_string())).unwrap();
        let err = client.fetch_rates().await.unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::ConnectionFailed(_) | UpstreamError::Timeout
        ));
    }
}
