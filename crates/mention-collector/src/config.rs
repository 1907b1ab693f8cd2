//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::time::Duration;

use mention_core::{DenyList, RetryConfig};
use mention_data::{EnrichmentConfig, NasdaqScreenerConfig, YahooChartConfig};
use mention_feed::{CommentSort, CrawlerConfig, RedditConfig};

use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 포럼 크롤링 설정
    pub feed: FeedConfig,
    /// 시세 조회 설정
    pub market: MarketConfig,
    /// 종목 디렉터리 동기화 설정
    pub instruments: InstrumentSyncConfig,
    /// 데몬 스케줄 설정
    pub schedule: ScheduleConfig,
    /// 티커 제외 목록 파일 (없으면 기본 목록)
    pub deny_list_path: Option<PathBuf>,
}

/// 포럼 크롤링 설정
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Reddit API 기본 URL
    pub base_url: String,
    /// 수집 대상 서브레딧
    pub sources: Vec<String>,
    /// 게시글 조회 기간 (시간)
    pub lookback_hours: u64,
    /// 목록 페이지 간 딜레이 (밀리초)
    pub page_delay_ms: u64,
    /// 확장 배치 간 딜레이 (밀리초)
    pub expansion_delay_ms: u64,
    /// 게시글 간 딜레이 (밀리초)
    pub post_delay_ms: u64,
    /// 댓글 정렬 순서
    pub sorts: Vec<CommentSort>,
    /// 최대 시도 횟수
    pub retry_attempts: u32,
    /// 재시도 딜레이 (밀리초)
    pub retry_delay_ms: u64,
}

/// 시세 조회 설정
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Yahoo chart API 기본 URL
    pub base_url: String,
    /// 과거 가격 조회 구간 (일)
    pub lookback_days: i64,
    /// 종목 간 요청 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 최대 시도 횟수
    pub retry_attempts: u32,
    /// 재시도 딜레이 (밀리초)
    pub retry_delay_ms: u64,
}

/// 종목 디렉터리 동기화 설정
#[derive(Debug, Clone)]
pub struct InstrumentSyncConfig {
    /// NASDAQ 스크리너 기본 URL
    pub directory_url: String,
    /// 동기화 활성화
    pub enabled: bool,
}

/// 데몬 스케줄 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 소스별 크롤링 주기 (분)
    pub crawl_interval_minutes: u64,
    /// 소스별 첫 실행 지연 (분, 소스 순서대로). 소스보다 적으면 마지막 값 사용
    pub crawl_offsets_minutes: Vec<u64>,
    /// 크롤링 사이클 제한 시간 (분)
    pub cycle_deadline_minutes: u64,
    /// 종목 동기화 첫 실행 지연 (초)
    pub instrument_sync_offset_secs: u64,
    /// 종목 동기화 주기 (시간)
    pub instrument_sync_interval_hours: u64,
    /// 종목 동기화 제한 시간 (분)
    pub instrument_sync_deadline_minutes: u64,
    /// 가격 갱신 첫 실행 지연 (분)
    pub price_refresh_offset_minutes: u64,
    /// 가격 갱신 주기 (시간)
    pub price_refresh_interval_hours: u64,
    /// 분할 동기화 첫 실행 지연 (분)
    pub split_sync_offset_minutes: u64,
    /// 분할 동기화 주기 (시간)
    pub split_sync_interval_hours: u64,
    /// 가격 갱신/분할 동기화 제한 시간 (분)
    pub market_job_deadline_minutes: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            sources: vec![
                "pennystocks".to_string(),
                "investing".to_string(),
                "stocks".to_string(),
            ],
            lookback_hours: 24,
            page_delay_ms: 3_000,
            expansion_delay_ms: 2_000,
            post_delay_ms: 2_000,
            sorts: vec![CommentSort::New],
            retry_attempts: 3,
            retry_delay_ms: 3_000,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            lookback_days: 7,
            request_delay_ms: 200,
            retry_attempts: 3,
            retry_delay_ms: 3_000,
        }
    }
}

impl Default for InstrumentSyncConfig {
    fn default() -> Self {
        Self {
            directory_url: "https://api.nasdaq.com".to_string(),
            enabled: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            crawl_interval_minutes: 180,
            crawl_offsets_minutes: vec![15, 60, 120],
            cycle_deadline_minutes: 30,
            instrument_sync_offset_secs: 5,
            instrument_sync_interval_hours: 24,
            instrument_sync_deadline_minutes: 5,
            price_refresh_offset_minutes: 300,
            price_refresh_interval_hours: 6,
            split_sync_offset_minutes: 5,
            split_sync_interval_hours: 24,
            market_job_deadline_minutes: 30,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            crate::error::CollectorError::Config(
                "DATABASE_URL 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        let feed_defaults = FeedConfig::default();
        let market_defaults = MarketConfig::default();
        let instrument_defaults = InstrumentSyncConfig::default();
        let schedule_defaults = ScheduleConfig::default();

        let sorts = match std::env::var("FEED_COMMENT_SORTS") {
            Ok(raw) => parse_sorts(&raw)?,
            Err(_) => feed_defaults.sorts,
        };

        Ok(Self {
            database_url,
            feed: FeedConfig {
                base_url: env_var_string("FEED_BASE_URL", feed_defaults.base_url),
                sources: env_var_list("FEED_SOURCES", feed_defaults.sources),
                lookback_hours: env_var_parse("FEED_LOOKBACK_HOURS", feed_defaults.lookback_hours),
                page_delay_ms: env_var_parse("FEED_PAGE_DELAY_MS", feed_defaults.page_delay_ms),
                expansion_delay_ms: env_var_parse(
                    "FEED_EXPANSION_DELAY_MS",
                    feed_defaults.expansion_delay_ms,
                ),
                post_delay_ms: env_var_parse("FEED_POST_DELAY_MS", feed_defaults.post_delay_ms),
                sorts,
                retry_attempts: env_var_parse("FEED_RETRY_ATTEMPTS", feed_defaults.retry_attempts),
                retry_delay_ms: env_var_parse("FEED_RETRY_DELAY_MS", feed_defaults.retry_delay_ms),
            },
            market: MarketConfig {
                base_url: env_var_string("MARKET_BASE_URL", market_defaults.base_url),
                lookback_days: env_var_parse(
                    "MARKET_LOOKBACK_DAYS",
                    market_defaults.lookback_days,
                ),
                request_delay_ms: env_var_parse(
                    "MARKET_REQUEST_DELAY_MS",
                    market_defaults.request_delay_ms,
                ),
                retry_attempts: env_var_parse(
                    "MARKET_RETRY_ATTEMPTS",
                    market_defaults.retry_attempts,
                ),
                retry_delay_ms: env_var_parse(
                    "MARKET_RETRY_DELAY_MS",
                    market_defaults.retry_delay_ms,
                ),
            },
            instruments: InstrumentSyncConfig {
                directory_url: env_var_string(
                    "INSTRUMENT_DIRECTORY_URL",
                    instrument_defaults.directory_url,
                ),
                enabled: env_var_bool("INSTRUMENT_SYNC_ENABLED", instrument_defaults.enabled),
            },
            schedule: ScheduleConfig {
                crawl_interval_minutes: env_var_parse(
                    "CRAWL_INTERVAL_MINUTES",
                    schedule_defaults.crawl_interval_minutes,
                ),
                crawl_offsets_minutes: env_var_list(
                    "CRAWL_OFFSETS_MINUTES",
                    schedule_defaults.crawl_offsets_minutes,
                ),
                cycle_deadline_minutes: env_var_parse(
                    "CRAWL_CYCLE_DEADLINE_MINUTES",
                    schedule_defaults.cycle_deadline_minutes,
                ),
                instrument_sync_offset_secs: env_var_parse(
                    "INSTRUMENT_SYNC_OFFSET_SECS",
                    schedule_defaults.instrument_sync_offset_secs,
                ),
                instrument_sync_interval_hours: env_var_parse(
                    "INSTRUMENT_SYNC_INTERVAL_HOURS",
                    schedule_defaults.instrument_sync_interval_hours,
                ),
                instrument_sync_deadline_minutes: env_var_parse(
                    "INSTRUMENT_SYNC_DEADLINE_MINUTES",
                    schedule_defaults.instrument_sync_deadline_minutes,
                ),
                price_refresh_offset_minutes: env_var_parse(
                    "PRICE_REFRESH_OFFSET_MINUTES",
                    schedule_defaults.price_refresh_offset_minutes,
                ),
                price_refresh_interval_hours: env_var_parse(
                    "PRICE_REFRESH_INTERVAL_HOURS",
                    schedule_defaults.price_refresh_interval_hours,
                ),
                split_sync_offset_minutes: env_var_parse(
                    "SPLIT_SYNC_OFFSET_MINUTES",
                    schedule_defaults.split_sync_offset_minutes,
                ),
                split_sync_interval_hours: env_var_parse(
                    "SPLIT_SYNC_INTERVAL_HOURS",
                    schedule_defaults.split_sync_interval_hours,
                ),
                market_job_deadline_minutes: env_var_parse(
                    "MARKET_JOB_DEADLINE_MINUTES",
                    schedule_defaults.market_job_deadline_minutes,
                ),
            },
            deny_list_path: std::env::var("TICKER_DENY_LIST_PATH").ok().map(PathBuf::from),
        })
    }

    /// 제외 목록 로드 (파일이 지정되지 않으면 기본 목록)
    pub fn load_deny_list(&self) -> Result<DenyList> {
        match &self.deny_list_path {
            Some(path) => Ok(DenyList::from_file(path)?),
            None => Ok(DenyList::canonical()),
        }
    }
}

impl FeedConfig {
    /// 게시글 조회 기간을 Duration으로 반환
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_hours * 3600)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    /// Reddit 클라이언트 설정
    pub fn reddit_config(&self) -> RedditConfig {
        RedditConfig::default().with_base_url(&self.base_url)
    }

    /// 크롤러 설정
    pub fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig {
            page_delay: Duration::from_millis(self.page_delay_ms),
            expansion_delay: Duration::from_millis(self.expansion_delay_ms),
            post_delay: Duration::from_millis(self.post_delay_ms),
            sorts: self.sorts.clone(),
            retry: self.retry(),
            ..CrawlerConfig::default()
        }
    }
}

impl MarketConfig {
    /// 종목 간 요청 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    /// Yahoo chart 클라이언트 설정
    pub fn chart_config(&self) -> YahooChartConfig {
        YahooChartConfig::default().with_base_url(&self.base_url)
    }

    /// 가격 보강 설정
    pub fn enrichment_config(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            lookback_days: self.lookback_days,
            retry: self.retry(),
            ..EnrichmentConfig::default()
        }
    }
}

impl InstrumentSyncConfig {
    /// NASDAQ 스크리너 설정
    pub fn screener_config(&self) -> NasdaqScreenerConfig {
        NasdaqScreenerConfig::default().with_base_url(&self.directory_url)
    }
}

impl ScheduleConfig {
    /// 크롤링 주기를 Duration으로 반환
    pub fn crawl_interval(&self) -> Duration {
        Duration::from_secs(self.crawl_interval_minutes * 60)
    }

    /// `index`번째 소스의 첫 실행 지연
    pub fn crawl_offset(&self, index: usize) -> Duration {
        let minutes = self
            .crawl_offsets_minutes
            .get(index)
            .or_else(|| self.crawl_offsets_minutes.last())
            .copied()
            .unwrap_or(0);
        Duration::from_secs(minutes * 60)
    }

    /// 크롤링 사이클 제한 시간
    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_minutes * 60)
    }

    pub fn instrument_sync_offset(&self) -> Duration {
        Duration::from_secs(self.instrument_sync_offset_secs)
    }

    pub fn instrument_sync_interval(&self) -> Duration {
        Duration::from_secs(self.instrument_sync_interval_hours * 3600)
    }

    pub fn instrument_sync_deadline(&self) -> Duration {
        Duration::from_secs(self.instrument_sync_deadline_minutes * 60)
    }

    pub fn price_refresh_offset(&self) -> Duration {
        Duration::from_secs(self.price_refresh_offset_minutes * 60)
    }

    pub fn price_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.price_refresh_interval_hours * 3600)
    }

    pub fn split_sync_offset(&self) -> Duration {
        Duration::from_secs(self.split_sync_offset_minutes * 60)
    }

    pub fn split_sync_interval(&self) -> Duration {
        Duration::from_secs(self.split_sync_interval_hours * 3600)
    }

    pub fn market_job_deadline(&self) -> Duration {
        Duration::from_secs(self.market_job_deadline_minutes * 60)
    }
}

/// 쉼표로 구분된 댓글 정렬 목록 파싱
fn parse_sorts(raw: &str) -> Result<Vec<CommentSort>> {
    let sorts = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<CommentSort>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if sorts.is_empty() {
        return Err(crate::error::CollectorError::Config(
            "FEED_COMMENT_SORTS가 비어 있습니다".to_string(),
        ));
    }
    Ok(sorts)
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

/// 환경변수에서 문자열 (비어 있으면 기본값)
fn env_var_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

/// 환경변수에서 쉼표 구분 목록 파싱 (항목 하나라도 실패하면 기본값)
fn env_var_list<T: std::str::FromStr>(key: &str, default: Vec<T>) -> Vec<T> {
    std::env::var(key)
        .ok()
        .and_then(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().ok())
                .collect::<Option<Vec<T>>>()
        })
        .filter(|list| !list.is_empty())
        .unwrap_or(default)
}
