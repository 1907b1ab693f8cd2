//! 작업 간 공유 컴포넌트.

use std::sync::Arc;

use mention_core::TickerExtractor;
use mention_data::{
    DatabaseConfig, InstrumentDirectory, MarketDataSource, MentionStore, NasdaqScreenerClient,
    PgMentionStore, PriceEnricher, YahooChartClient,
};
use mention_feed::{ForumApi, ForumCrawler, RedditClient};

use crate::{CollectorConfig, Result};

/// 크롤링/동기화 작업이 공유하는 컴포넌트 묶음.
///
/// 저장소가 유일한 공유 가변 자원이며, 나머지는 읽기 전용이거나 자체 동기화됩니다.
#[derive(Clone)]
pub struct CollectorContext {
    pub config: CollectorConfig,
    pub store: Arc<dyn MentionStore>,
    pub crawler: Arc<ForumCrawler>,
    pub market: Arc<dyn MarketDataSource>,
    pub directory: Arc<dyn InstrumentDirectory>,
    pub enricher: PriceEnricher,
    pub extractor: TickerExtractor,
}

impl CollectorContext {
    /// 주입된 구현으로 컨텍스트를 구성합니다.
    pub fn new(
        config: CollectorConfig,
        store: Arc<dyn MentionStore>,
        forum: Arc<dyn ForumApi>,
        market: Arc<dyn MarketDataSource>,
        directory: Arc<dyn InstrumentDirectory>,
        extractor: TickerExtractor,
    ) -> Self {
        let crawler = Arc::new(ForumCrawler::new(forum, config.feed.crawler_config()));
        let enricher = PriceEnricher::new(
            store.clone(),
            market.clone(),
            config.market.enrichment_config(),
        );

        Self {
            config,
            store,
            crawler,
            market,
            directory,
            enricher,
            extractor,
        }
    }

    /// PostgreSQL 저장소와 실제 외부 클라이언트로 구성합니다.
    pub async fn connect(config: CollectorConfig) -> Result<Self> {
        let store = PgMentionStore::connect(&DatabaseConfig::new(&config.database_url)).await?;
        store.migrate().await?;
        tracing::info!("데이터베이스 연결 및 마이그레이션 완료");

        let forum = RedditClient::new(config.feed.reddit_config())?;
        let market = YahooChartClient::new(config.market.chart_config())?;
        let directory = NasdaqScreenerClient::new(config.instruments.screener_config())?;

        let deny_list = config.load_deny_list()?;
        tracing::info!(
            version = deny_list.version(),
            tokens = deny_list.len(),
            "티커 제외 목록 로드"
        );

        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(forum),
            Arc::new(market),
            Arc::new(directory),
            TickerExtractor::new(deny_list),
        ))
    }
}
