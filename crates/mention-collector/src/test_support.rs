//! 테스트용 가짜 외부 의존성.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use mention_core::{
    DenyList, PipelineError, PipelineResult, PriceSample, PriceSeries, RetryConfig, SplitEvent,
    TickerExtractor,
};
use mention_data::{
    EnrichmentConfig, InstrumentDirectory, ListedInstrument, MarketDataSource,
    MemoryMentionStore, MentionStore, PriceEnricher,
};
use mention_feed::{CommentBatch, CommentSort, ForumApi, ForumComment, ForumPost, ListingPage};

use crate::config::{
    CollectorConfig, FeedConfig, InstrumentSyncConfig, MarketConfig, ScheduleConfig,
};
use crate::context::CollectorContext;
use crate::modules::MentionIngestor;

/// 최근 시세 샘플의 고정 시각.
pub fn recent_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap()
}

/// 심볼별 종가를 미리 정해두는 가짜 시세 소스.
#[derive(Default)]
pub struct FakeMarket {
    closes: HashMap<String, Decimal>,
    splits: HashMap<String, Vec<SplitEvent>>,
    failing: bool,
    /// 일봉 조회마다 걸리는 시간
    latency: Duration,
    pub daily_calls: AtomicUsize,
    pub recent_calls: AtomicUsize,
    pub split_calls: AtomicUsize,
}

impl FakeMarket {
    pub fn with_close(symbol: &str, close: Decimal) -> Self {
        Self::default().and_close(symbol, close)
    }

    pub fn and_close(mut self, symbol: &str, close: Decimal) -> Self {
        self.closes.insert(symbol.to_string(), close);
        self
    }

    pub fn and_split(mut self, symbol: &str, split: SplitEvent) -> Self {
        self.splits.entry(symbol.to_string()).or_default().push(split);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 모든 호출이 실패하는 소스.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn series(&self, symbol: &str, at: DateTime<Utc>) -> PipelineResult<PriceSeries> {
        if self.failing {
            return Err(PipelineError::TransientNetwork("connection reset".to_string()));
        }
        let samples = self
            .closes
            .get(symbol)
            .map(|close| {
                vec![PriceSample {
                    timestamp: at,
                    close: Some(*close),
                    volume: Some(1_000),
                }]
            })
            .unwrap_or_default();
        Ok(PriceSeries {
            samples,
            splits: Vec::new(),
        })
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_daily_series(
        &self,
        symbol: &str,
        _start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<PriceSeries> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.series(symbol, end)
    }

    async fn fetch_recent_series(&self, symbol: &str, _range: &str) -> PipelineResult<PriceSeries> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        self.series(symbol, recent_at())
    }

    async fn fetch_split_history(&self, symbol: &str) -> PipelineResult<Vec<SplitEvent>> {
        self.split_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(PipelineError::TransientNetwork("connection reset".to_string()));
        }
        Ok(self.splits.get(symbol).cloned().unwrap_or_default())
    }
}

/// 고정 목록을 반환하는 가짜 종목 디렉터리.
#[derive(Default)]
pub struct FakeDirectory {
    pub listed: Vec<ListedInstrument>,
    pub failing: bool,
}

impl FakeDirectory {
    pub fn with_symbols(symbols: &[&str]) -> Self {
        Self {
            listed: symbols
                .iter()
                .map(|s| ListedInstrument {
                    symbol: s.to_string(),
                    name: format!("{} Corp", s),
                })
                .collect(),
            failing: false,
        }
    }
}

#[async_trait]
impl InstrumentDirectory for FakeDirectory {
    fn exchange(&self) -> &str {
        "NASDAQ"
    }

    async fn fetch_all(&self) -> PipelineResult<Vec<ListedInstrument>> {
        if self.failing {
            return Err(PipelineError::Http {
                status: 403,
                url: "/api/screener/stocks".to_string(),
            });
        }
        Ok(self.listed.clone())
    }
}

/// 게시글과 댓글을 미리 정해두는 가짜 포럼.
#[derive(Default)]
pub struct FakeForum {
    pub posts: Vec<ForumPost>,
    pub comments: HashMap<String, Vec<ForumComment>>,
    pub fail_listing: bool,
    /// 댓글 조회마다 걸리는 시간
    pub comment_latency: Duration,
}

impl FakeForum {
    pub fn with_post(mut self, post: ForumPost, comments: Vec<ForumComment>) -> Self {
        self.comments.insert(post.id.clone(), comments);
        self.posts.push(post);
        self
    }
}

#[async_trait]
impl ForumApi for FakeForum {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_listing(&self, _source: &str, _after: Option<&str>) -> PipelineResult<ListingPage> {
        if self.fail_listing {
            return Err(PipelineError::Http {
                status: 403,
                url: "/r/private/new.json".to_string(),
            });
        }
        Ok(ListingPage {
            posts: self.posts.clone(),
            after: None,
        })
    }

    async fn fetch_comments(
        &self,
        _source: &str,
        post_id: &str,
        _sort: CommentSort,
    ) -> PipelineResult<CommentBatch> {
        if !self.comment_latency.is_zero() {
            tokio::time::sleep(self.comment_latency).await;
        }
        Ok(CommentBatch {
            comments: self.comments.get(post_id).cloned().unwrap_or_default(),
            ..Default::default()
        })
    }

    async fn expand_placeholders(
        &self,
        _post_id: &str,
        _ids: &[String],
    ) -> PipelineResult<CommentBatch> {
        Ok(CommentBatch::default())
    }
}

pub fn post(id: &str, title: &str, author: &str, num_comments: u32) -> ForumPost {
    ForumPost {
        id: id.to_string(),
        title: title.to_string(),
        selftext: String::new(),
        author: author.to_string(),
        created_at: Utc::now() - chrono::Duration::minutes(30),
        num_comments,
        permalink: format!("/r/stocks/comments/{}", id),
    }
}

pub fn comment(id: &str, body: &str, author: &str, parent_id: &str) -> ForumComment {
    ForumComment {
        id: id.to_string(),
        author: author.to_string(),
        body: body.to_string(),
        created_at: Utc::now() - chrono::Duration::minutes(10),
        parent_id: parent_id.to_string(),
    }
}

/// 딜레이와 재시도가 없는 설정.
pub fn test_config() -> CollectorConfig {
    CollectorConfig {
        database_url: String::new(),
        feed: FeedConfig {
            page_delay_ms: 0,
            expansion_delay_ms: 0,
            post_delay_ms: 0,
            retry_attempts: 1,
            retry_delay_ms: 0,
            sources: vec!["stocks".to_string()],
            ..FeedConfig::default()
        },
        market: MarketConfig {
            request_delay_ms: 0,
            retry_attempts: 1,
            retry_delay_ms: 0,
            ..MarketConfig::default()
        },
        instruments: InstrumentSyncConfig::default(),
        schedule: ScheduleConfig::default(),
        deny_list_path: None,
    }
}

pub fn ingestor_with(store: Arc<MemoryMentionStore>, market: FakeMarket) -> MentionIngestor {
    let store: Arc<dyn MentionStore> = store;
    let config = EnrichmentConfig {
        retry: RetryConfig::no_retry(),
        ..EnrichmentConfig::default()
    };
    let enricher = PriceEnricher::new(store.clone(), Arc::new(market), config);
    MentionIngestor::new(store, enricher, TickerExtractor::new(DenyList::canonical()))
}

pub fn context_with(
    store: Arc<MemoryMentionStore>,
    forum: FakeForum,
    market: Arc<FakeMarket>,
    directory: FakeDirectory,
) -> CollectorContext {
    CollectorContext::new(
        test_config(),
        store,
        Arc::new(forum),
        market,
        Arc::new(directory),
        TickerExtractor::new(DenyList::canonical()),
    )
}

/// 이벤트마다 (target, 가장 가까운 span의 `component` 값)을 기록하는 레이어.
#[derive(Clone, Default)]
pub struct ComponentRecorder {
    events: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl ComponentRecorder {
    pub fn events(&self) -> Vec<(String, Option<String>)> {
        self.events.lock().unwrap().clone()
    }

    /// `target_prefix`로 시작하는 이벤트들의 component 값.
    pub fn components_for(&self, target_prefix: &str) -> Vec<Option<String>> {
        self.events()
            .into_iter()
            .filter(|(target, _)| target.starts_with(target_prefix))
            .map(|(_, component)| component)
            .collect()
    }
}

struct SpanComponent(String);

#[derive(Default)]
struct ComponentVisitor(Option<String>);

impl Visit for ComponentVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "component" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "component" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S> Layer<S> for ComponentRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = ComponentVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(component), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(SpanComponent(component));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let component = ctx.event_scope(event).and_then(|mut scope| {
            scope.find_map(|span| {
                let extensions = span.extensions();
                extensions.get::<SpanComponent>().map(|c| c.0.clone())
            })
        });
        self.events
            .lock()
            .unwrap()
            .push((event.metadata().target().to_string(), component));
    }
}
