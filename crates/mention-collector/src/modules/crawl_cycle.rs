//! 소스별 크롤링 사이클.
//!
//! 한 사이클은 크롤링과 수집을 순차로 수행하며 전체 제한 시간 안에서 실행됩니다.
//! 제한 시간이 지나면 남은 작업은 버려지지만, 이미 저장된 레코드는 유효하고
//! 다음 사이클이 이어서 수집합니다. 멘션 없이 남은 콘텐츠는 다음 사이클에서
//! 멘션이 복구됩니다.

use std::time::Instant;

use tracing::{error, info, warn, Instrument};

use mention_core::{component_span, COMPONENT_CRAWLER};

use crate::context::CollectorContext;
use crate::modules::MentionIngestor;
use crate::{CollectionStats, Result};

/// 소스 하나의 크롤링 사이클을 실행합니다.
///
/// 첫 목록 페이지 조회 실패만 에러로 반환됩니다.
pub async fn run_crawl_cycle(ctx: &CollectorContext, source: &str) -> Result<CollectionStats> {
    let span = component_span!(COMPONENT_CRAWLER, source = %source);
    run_cycle_inner(ctx, source).instrument(span).await
}

async fn run_cycle_inner(ctx: &CollectorContext, source: &str) -> Result<CollectionStats> {
    let start = Instant::now();
    let deadline = ctx.config.schedule.cycle_deadline();
    let mut ingestor = MentionIngestor::new(
        ctx.store.clone(),
        ctx.enricher.clone(),
        ctx.extractor.clone(),
    );

    info!(source, deadline_secs = deadline.as_secs(), "크롤링 사이클 시작");

    let crawl = ctx
        .crawler
        .crawl_source(source, ctx.config.feed.lookback(), &mut ingestor);
    let outcome = tokio::time::timeout(deadline, crawl).await;

    let mut stats = ingestor.take_stats();
    stats.elapsed = start.elapsed();

    match outcome {
        Ok(Ok(result)) => {
            info!(
                source,
                posts = result.posts,
                comments = result.comments,
                failed_posts = result.failed_posts,
                partial_listing = result.partial_listing,
                "크롤링 사이클 완료"
            );
            if result.partial_listing {
                stats.errors += 1;
            }
            stats.errors += result.failed_posts;
        }
        Ok(Err(e)) => {
            error!(source, error = %e, "게시글 목록 조회 실패, 사이클 중단");
            return Err(e.into());
        }
        Err(_) => {
            warn!(
                source,
                processed = stats.total,
                "사이클 제한 시간 초과, 남은 작업 포기"
            );
            stats.timed_out = true;
        }
    }

    Ok(stats)
}

/// 설정된 모든 소스를 순서대로 크롤링합니다.
///
/// 한 소스의 실패는 다음 소스에 영향을 주지 않습니다.
pub async fn run_all_sources(ctx: &CollectorContext) -> CollectionStats {
    let mut total = CollectionStats::new();
    for source in &ctx.config.feed.sources {
        match run_crawl_cycle(ctx, source).await {
            Ok(stats) => {
                stats.log_summary(&format!("r/{} 크롤링", source));
                total.merge(&stats);
            }
            Err(e) => {
                error!(source = %source, error = %e, "크롤링 실패");
                total.errors += 1;
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{comment, context_with, post, FakeDirectory, FakeForum, FakeMarket};
    use mention_core::ContentSource;
    use mention_data::{MemoryMentionStore, MentionStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cycle_ingests_posts_and_comments() {
        let store = Arc::new(MemoryMentionStore::with_instruments(&["GME", "TSLA"]).await);
        let forum = FakeForum::default()
            .with_post(
                post("p1", "GME squeeze?", "alice", 2),
                vec![
                    comment("c1", "TSLA is better", "bob", "t3_p1"),
                    comment("c2", "agreed, GME", "carol", "t1_c1"),
                ],
            )
            .with_post(post("p2", "no tickers here", "dave", 0), vec![]);
        let market = Arc::new(FakeMarket::with_close("GME", dec!(20.5)).and_close("TSLA", dec!(180)));
        let ctx = context_with(store.clone(), forum, market, FakeDirectory::default());

        let stats = run_crawl_cycle(&ctx, "stocks").await.unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.success, 4);
        assert_eq!(stats.mentions, 3);
        assert!(!stats.timed_out);
        assert_eq!(store.content_count().await, 4);
        assert!(store
            .find_content(ContentSource::Reddit, "t1_c2")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_second_cycle_adds_nothing() {
        let store = Arc::new(MemoryMentionStore::with_instruments(&["GME"]).await);
        let forum = FakeForum::default().with_post(
            post("p1", "GME", "alice", 1),
            vec![comment("c1", "GME", "bob", "t3_p1")],
        );
        let market = Arc::new(FakeMarket::with_close("GME", dec!(20.5)));
        let ctx = context_with(store.clone(), forum, market, FakeDirectory::default());

        run_crawl_cycle(&ctx, "stocks").await.unwrap();
        let second = run_crawl_cycle(&ctx, "stocks").await.unwrap();

        assert_eq!(second.duplicates, 2);
        assert_eq!(second.mentions, 0);
        assert_eq!(store.content_count().await, 2);
        assert_eq!(store.mention_count().await, 2);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_cycle() {
        let store = Arc::new(MemoryMentionStore::new());
        let forum = FakeForum {
            fail_listing: true,
            ..Default::default()
        };
        let ctx = context_with(
            store.clone(),
            forum,
            Arc::new(FakeMarket::default()),
            FakeDirectory::default(),
        );

        assert!(run_crawl_cycle(&ctx, "private").await.is_err());

        let total = run_all_sources(&ctx).await;
        assert_eq!(total.errors, 1);
        assert_eq!(store.content_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_finished_posts() {
        let store = Arc::new(MemoryMentionStore::with_instruments(&["GME"]).await);
        let mut forum = FakeForum {
            comment_latency: Duration::from_secs(12 * 60),
            ..Default::default()
        };
        for i in 0..5 {
            let id = format!("p{}", i);
            forum = forum.with_post(post(&id, "GME", "alice", 1), vec![]);
        }
        let ctx = context_with(
            store.clone(),
            forum,
            Arc::new(FakeMarket::with_close("GME", dec!(20.5))),
            FakeDirectory::default(),
        );

        let stats = run_crawl_cycle(&ctx, "stocks").await.unwrap();

        assert!(stats.timed_out);
        assert_eq!(stats.total, 2);
        assert_eq!(store.content_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_cycle_completes_interrupted_content() {
        let store = Arc::new(MemoryMentionStore::with_instruments(&["GME"]).await);
        let forum = || FakeForum::default().with_post(post("p1", "GME", "alice", 0), vec![]);

        // 가격 조회가 사이클 제한 시간(30분)보다 오래 걸림
        let slow = Arc::new(
            FakeMarket::with_close("GME", dec!(20.5)).with_latency(Duration::from_secs(31 * 60)),
        );
        let ctx = context_with(store.clone(), forum(), slow, FakeDirectory::default());
        let first = run_crawl_cycle(&ctx, "stocks").await.unwrap();

        assert!(first.timed_out);
        assert_eq!(store.content_count().await, 1);
        assert_eq!(store.mention_count().await, 0);

        let fast = Arc::new(FakeMarket::with_close("GME", dec!(20.5)));
        let ctx = context_with(store.clone(), forum(), fast, FakeDirectory::default());
        let second = run_crawl_cycle(&ctx, "stocks").await.unwrap();

        assert_eq!(second.duplicates, 1);
        assert_eq!(second.mentions, 1);
        assert_eq!(store.content_count().await, 1);
        assert_eq!(store.mention_count().await, 1);
    }
}
