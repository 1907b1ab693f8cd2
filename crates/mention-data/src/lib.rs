//! 멘션 저장 및 시세 데이터.
//!
//! 이 crate는 다음을 제공합니다:
//! - 멘션 저장소 계약 (`MentionStore`) 및 PostgreSQL/메모리 구현
//! - Yahoo Finance 시세, NASDAQ 종목 디렉터리 Provider
//! - 멘션 시점 가격 보강 (거래일당 1회 조회, insert-or-get 저장)

pub mod enrichment;
pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use enrichment::{EnrichmentConfig, PriceEnricher};
pub use provider::{
    InstrumentDirectory, ListedInstrument, MarketDataSource, NasdaqScreenerClient,
    NasdaqScreenerConfig, YahooChartClient, YahooChartConfig,
};
pub use storage::postgres::DatabaseConfig;
pub use storage::{MemoryMentionStore, MentionStore, PgMentionStore};
