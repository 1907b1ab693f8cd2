//! NASDAQ 스크리너 종목 디렉터리.
//!
//! `api.nasdaq.com`의 스크리너 다운로드 엔드포인트에서 상장 종목의 심볼과
//! 회사명을 한 번에 조회합니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use mention_core::{HttpClient, PipelineResult};

use super::{InstrumentDirectory, ListedInstrument};

/// 스크리너 설정.
#[derive(Debug, Clone)]
pub struct NasdaqScreenerConfig {
    pub base_url: String,
    /// 한 번에 받을 최대 행 수
    pub limit: u32,
    /// 응답이 커서 기본값보다 긴 타임아웃을 사용
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for NasdaqScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nasdaq.com".to_string(),
            limit: 60_000,
            timeout: Duration::from_secs(60),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl NasdaqScreenerConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ScreenerResponse {
    data: Option<ScreenerData>,
}

#[derive(Debug, Deserialize)]
struct ScreenerData {
    #[serde(default)]
    rows: Vec<ScreenerRow>,
}

#[derive(Debug, Deserialize)]
struct ScreenerRow {
    symbol: String,
    #[serde(default)]
    name: String,
}

/// NASDAQ 스크리너 클라이언트.
pub struct NasdaqScreenerClient {
    config: NasdaqScreenerConfig,
    http: HttpClient,
}

impl NasdaqScreenerClient {
    pub fn new(config: NasdaqScreenerConfig) -> PipelineResult<Self> {
        let http = HttpClient::new(&config.user_agent, config.timeout)?;
        Ok(Self { config, http })
    }

    pub fn with_defaults() -> PipelineResult<Self> {
        Self::new(NasdaqScreenerConfig::default())
    }
}

#[async_trait]
impl InstrumentDirectory for NasdaqScreenerClient {
    fn exchange(&self) -> &str {
        "NASDAQ"
    }

    async fn fetch_all(&self) -> PipelineResult<Vec<ListedInstrument>> {
        let url = format!("{}/api/screener/stocks", self.config.base_url);
        let params = [
            ("tableonly", "true".to_string()),
            ("limit", self.config.limit.to_string()),
            ("offset", "0".to_string()),
            ("download", "true".to_string()),
        ];

        let body = self.http.get_text(&url, &params).await?;
        let response: ScreenerResponse = serde_json::from_str(&body)?;

        let instruments: Vec<ListedInstrument> = response
            .data
            .map(|d| d.rows)
            .unwrap_or_default()
            .into_iter()
            .map(|row| ListedInstrument {
                symbol: row.symbol.trim().to_string(),
                name: row.name.trim().to_string(),
            })
            .filter(|i| !i.symbol.is_empty())
            .collect();

        info!(count = instruments.len(), "NASDAQ 종목 목록 조회 완료");
        Ok(instruments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetch_all() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/screener/stocks")
            .match_query(Matcher::UrlEncoded("download".into(), "true".into()))
            .with_status(200)
            .with_body(
                r#"{"data":{"headers":{},"rows":[
                    {"symbol":"AAPL","name":"Apple Inc. Common Stock","country":"United States"},
                    {"symbol":"BRK/A","name":"Berkshire Hathaway"},
                    {"symbol":" ","name":"blank"}
                ]}}"#,
            )
            .create_async()
            .await;

        let client = NasdaqScreenerClient::new(
            NasdaqScreenerConfig::default().with_base_url(server.url()),
        )
        .unwrap();
        let instruments = client.fetch_all().await.unwrap();

        mock.assert_async().await;
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].symbol, "AAPL");
    }
}
