//! Yahoo Finance chart API 클라이언트.
//!
//! `/v8/finance/chart/{symbol}` 엔드포인트에서 일봉 종가/거래량과 분할 이벤트를
//! 조회합니다. 휴장일 등의 샘플은 종가가 null일 수 있으며 그대로 보존됩니다.
//!
//! # 에러 응답
//!
//! 존재하지 않는 심볼 등은 HTTP 상태와 함께 본문에
//! `{"chart": {"result": null, "error": {"code", "description"}}}`가 담기므로,
//! 상태 코드보다 구조화된 에러를 먼저 확인합니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use mention_core::http::{check_status, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use mention_core::{HttpClient, PipelineError, PipelineResult, PriceSample, PriceSeries, SplitEvent};

use super::MarketDataSource;

/// Yahoo chart 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct YahooChartConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for YahooChartConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl YahooChartConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    events: Option<ChartEvents>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    splits: HashMap<String, RawSplit>,
}

#[derive(Debug, Deserialize)]
struct RawSplit {
    date: i64,
    numerator: f64,
    denominator: f64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// 분할 비율 (denominator / numerator). numerator가 0이면 `None`.
fn split_ratio(numerator: f64, denominator: f64) -> Option<Decimal> {
    if numerator == 0.0 {
        return None;
    }
    let numerator = Decimal::from_f64(numerator)?;
    let denominator = Decimal::from_f64(denominator)?;
    denominator.checked_div(numerator)
}

impl ChartResult {
    fn into_series(self) -> PriceSeries {
        let quote = self
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .unwrap_or_default();

        let samples = self
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let timestamp = Utc.timestamp_opt(ts, 0).single()?;
                let close = quote
                    .close
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(Decimal::from_f64)
                    .map(|c| c.round_dp(6));
                let volume = quote.volume.get(i).copied().flatten().map(|v| v as i64);
                Some(PriceSample {
                    timestamp,
                    close,
                    volume,
                })
            })
            .collect();

        let mut splits: Vec<SplitEvent> = self
            .events
            .map(|e| e.splits.into_values().collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                let ratio = split_ratio(raw.numerator, raw.denominator)?;
                let effective_date = Utc.timestamp_opt(raw.date, 0).single()?;
                Some(SplitEvent {
                    ratio,
                    effective_date,
                })
            })
            .collect();
        splits.sort_by_key(|s| s.effective_date);

        PriceSeries { samples, splits }
    }
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Yahoo Finance chart API 클라이언트.
pub struct YahooChartClient {
    config: YahooChartConfig,
    http: HttpClient,
}

impl YahooChartClient {
    pub fn new(config: YahooChartConfig) -> PipelineResult<Self> {
        let http = HttpClient::new(&config.user_agent, config.timeout)?;
        Ok(Self { config, http })
    }

    pub fn with_defaults() -> PipelineResult<Self> {
        Self::new(YahooChartConfig::default())
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        params: &[(&str, String)],
    ) -> PipelineResult<PriceSeries> {
        let url = format!("{}/v8/finance/chart/{}", self.config.base_url, symbol);
        let (status, body) = self.http.get_raw(&url, params).await?;

        // 구조화된 에러가 있으면 상태 코드보다 우선
        let envelope = match serde_json::from_str::<ChartEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                check_status(status, &url)?;
                return Err(e.into());
            }
        };

        if let Some(error) = envelope.chart.error {
            return Err(PipelineError::Api {
                code: error.code,
                description: error.description,
            });
        }
        check_status(status, &url)?;

        let result = envelope
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| {
                PipelineError::MalformedResponse(format!("{}: chart.result 없음", symbol))
            })?;

        let series = result.into_series();
        debug!(
            symbol,
            samples = series.samples.len(),
            splits = series.splits.len(),
            "시세 조회 완료"
        );
        Ok(series)
    }
}

#[async_trait]
impl MarketDataSource for YahooChartClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    #[instrument(skip(self))]
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<PriceSeries> {
        let params = [
            ("period1", start.timestamp().to_string()),
            ("period2", end.timestamp().to_string()),
            ("interval", "1d".to_string()),
            ("events", "splits".to_string()),
        ];
        self.fetch_chart(symbol, &params).await
    }

    async fn fetch_recent_series(&self, symbol: &str, range: &str) -> PipelineResult<PriceSeries> {
        let params = [
            ("range", range.to_string()),
            ("interval", "1d".to_string()),
        ];
        self.fetch_chart(symbol, &params).await
    }

    async fn fetch_split_history(&self, symbol: &str) -> PipelineResult<Vec<SplitEvent>> {
        let params = [
            ("range", "max".to_string()),
            ("interval", "1mo".to_string()),
            ("events", "splits".to_string()),
        ];
        Ok(self.fetch_chart(symbol, &params).await?.splits)
    }
}
