//! 외부 데이터 Provider 모듈.
//!
//! ## 시세
//! - `MarketDataSource`: 일봉 종가/거래량 및 분할 이벤트 조회 인터페이스
//! - `YahooChartClient`: Yahoo Finance chart API 구현
//!
//! ## 종목 디렉터리
//! - `InstrumentDirectory`: 상장 종목 목록 조회 인터페이스
//! - `NasdaqScreenerClient`: NASDAQ 스크리너 구현

pub mod nasdaq;
pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mention_core::{PipelineResult, PriceSeries, SplitEvent};

pub use nasdaq::{NasdaqScreenerClient, NasdaqScreenerConfig};
pub use yahoo::{YahooChartClient, YahooChartConfig};

/// 시세 데이터 소스.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 소스 이름.
    fn name(&self) -> &str;

    /// `[start, end]` 구간의 일봉과 그 구간의 분할 이벤트.
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<PriceSeries>;

    /// 최근 `range` (예: `"5d"`) 구간의 일봉.
    async fn fetch_recent_series(&self, symbol: &str, range: &str) -> PipelineResult<PriceSeries>;

    /// 전체 분할 이력 (발효일 순).
    async fn fetch_split_history(&self, symbol: &str) -> PipelineResult<Vec<SplitEvent>>;
}

/// 디렉터리에 등재된 종목.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedInstrument {
    pub symbol: String,
    pub name: String,
}

/// 상장 종목 디렉터리.
#[async_trait]
pub trait InstrumentDirectory: Send + Sync {
    /// 디렉터리가 대표하는 거래소 이름.
    fn exchange(&self) -> &str;

    /// 전체 종목 목록.
    async fn fetch_all(&self) -> PipelineResult<Vec<ListedInstrument>>;
}
