//! 포럼 크롤러.
//!
//! [`ForumApi`] 위에서 목록 페이지 순회, 댓글 트리 확장, 재시도와 요청 간
//! 딜레이를 담당합니다.
//!
//! # 실패 격리
//!
//! - 첫 목록 페이지 실패: 에러 반환 (해당 소스의 사이클 중단)
//! - 이후 목록 페이지 실패: 이미 수집한 게시글로 부분 결과 반환
//! - 댓글 정렬/확장 배치 실패: 경고 로그 후 건너뜀

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use mention_core::{with_retry, PipelineError, PipelineResult, RetryConfig};

use crate::traits::ForumApi;
use crate::types::{CommentSort, ForumComment, ForumPost};

/// 크롤러 설정.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// 목록 페이지 간 딜레이
    pub page_delay: Duration,
    /// 댓글 요청 간 딜레이 (정렬별 조회, 확장 배치)
    pub expansion_delay: Duration,
    /// 게시글 간 딜레이
    pub post_delay: Duration,
    /// 조회할 댓글 정렬 순서
    pub sorts: Vec<CommentSort>,
    /// 확장 호출당 최대 ID 수
    pub expansion_batch_size: usize,
    /// 최대 확장 라운드 수
    pub max_expansion_rounds: usize,
    /// 외부 호출 재시도 정책
    pub retry: RetryConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(3),
            expansion_delay: Duration::from_secs(2),
            post_delay: Duration::from_secs(2),
            sorts: vec![CommentSort::New],
            expansion_batch_size: 100,
            max_expansion_rounds: 50,
            retry: RetryConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// 딜레이 없는 설정 (테스트용).
    pub fn without_delays(mut self) -> Self {
        self.page_delay = Duration::ZERO;
        self.expansion_delay = Duration::ZERO;
        self.post_delay = Duration::ZERO;
        self.retry.delay_ms = 0;
        self
    }
}

/// 자리표시자 확장 결과.
#[derive(Debug, Default)]
pub struct ExpansionOutcome {
    /// 새로 수락된 댓글
    pub comments: Vec<ForumComment>,
    /// 수행한 라운드 수
    pub rounds: usize,
    /// 실패한 배치 수
    pub failed_batches: usize,
    /// 라운드 제한으로 포기한 ID 수
    pub abandoned: usize,
}

/// 소스 크롤링 요약.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub posts: usize,
    pub comments: usize,
    /// 댓글 트리 조회에 실패한 게시글 수
    pub failed_posts: usize,
    /// 목록이 중간 페이지 실패로 잘렸는지 여부
    pub partial_listing: bool,
}

/// 크롤링 결과를 게시글 단위로 전달받는 대상.
#[async_trait]
pub trait CrawlSink: Send {
    /// 게시글 하나와 그 댓글을 전달받습니다.
    async fn accept(&mut self, post: &ForumPost, comments: &[ForumComment]);
}

/// 목록 조회 결과.
#[derive(Debug, Default)]
pub struct Listing {
    pub posts: Vec<ForumPost>,
    /// 중간 페이지 실패로 잘렸는지 여부
    pub partial: bool,
}

/// 포럼 크롤러.
pub struct ForumCrawler {
    api: Arc<dyn ForumApi>,
    config: CrawlerConfig,
}

impl ForumCrawler {
    pub fn new(api: Arc<dyn ForumApi>, config: CrawlerConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// 최신순 목록을 `now - lookback` 이전 게시글이 나올 때까지 순회합니다.
    pub async fn fetch_listing(&self, source: &str, lookback: Duration) -> PipelineResult<Listing> {
        let lookback = chrono::Duration::from_std(lookback)
            .map_err(|e| PipelineError::Config(format!("잘못된 조회 기간: {}", e)))?;
        let cutoff = Utc::now() - lookback;

        let mut listing = Listing::default();
        let mut after: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let cursor = after.as_deref();
            let result = with_retry(&self.config.retry, "fetch_listing", || {
                self.api.fetch_listing(source, cursor)
            })
            .await;

            let page = match result {
                Ok(page) => page,
                Err(e) if pages == 0 => return Err(e),
                Err(e) => {
                    warn!(
                        source,
                        pages,
                        collected = listing.posts.len(),
                        error = %e,
                        "목록 페이지 조회 실패, 부분 결과 반환"
                    );
                    listing.partial = true;
                    break;
                }
            };
            pages += 1;

            let mut reached_cutoff = false;
            for post in page.posts {
                if post.created_at < cutoff {
                    reached_cutoff = true;
                    break;
                }
                listing.posts.push(post);
            }

            match page.after {
                Some(next) if !reached_cutoff => {
                    after = Some(next);
                    tokio::time::sleep(self.config.page_delay).await;
                }
                _ => break,
            }
        }

        debug!(source, pages, posts = listing.posts.len(), "목록 조회 완료");
        Ok(listing)
    }

    /// 게시글의 전체 댓글을 평탄화하여 반환합니다.
    ///
    /// 모든 정렬 순서 조회가 실패한 경우에만 에러를 반환합니다.
    pub async fn fetch_comment_tree(
        &self,
        source: &str,
        post_id: &str,
    ) -> PipelineResult<Vec<ForumComment>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut comments = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for (index, &sort) in self.config.sorts.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.expansion_delay).await;
            }
            let result = with_retry(&self.config.retry, "fetch_comments", || {
                self.api.fetch_comments(source, post_id, sort)
            })
            .await;

            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(post_id, sort = %sort, error = %e, "댓글 조회 실패, 건너뜀");
                    last_error = Some(e);
                    continue;
                }
            };
            succeeded += 1;

            if batch.truncated > 0 {
                debug!(post_id, truncated = batch.truncated, "깊이 제한으로 답글 생략");
            }

            for comment in batch.comments {
                if seen.insert(comment.id.clone()) {
                    comments.push(comment);
                }
            }

            if !batch.placeholders.is_empty() {
                let outcome = self
                    .expand_placeholders(post_id, batch.placeholders, &mut seen)
                    .await;
                comments.extend(outcome.comments);
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(comments),
        }
    }

    /// 자리표시자를 배치 단위로 확장합니다.
    ///
    /// 배치마다 요청 전에 `expansion_delay`만큼 기다립니다.
    /// 이미 본 ID, 이미 요청한 ID, 대기 중인 ID는 다시 큐에 넣지 않으며,
    /// `max_expansion_rounds`를 넘으면 남은 ID를 포기합니다.
    pub async fn expand_placeholders(
        &self,
        post_id: &str,
        initial: Vec<String>,
        seen: &mut HashSet<String>,
    ) -> ExpansionOutcome {
        let mut outcome = ExpansionOutcome::default();
        let mut pending: VecDeque<String> = VecDeque::new();
        let mut queued: HashSet<String> = HashSet::new();

        let mut enqueue = |ids: Vec<String>,
                           seen: &HashSet<String>,
                           pending: &mut VecDeque<String>| {
            for id in ids {
                if !seen.contains(&id) && queued.insert(id.clone()) {
                    pending.push_back(id);
                }
            }
        };

        enqueue(initial, seen, &mut pending);

        let batch_size = self.config.expansion_batch_size.max(1);
        while !pending.is_empty() && outcome.rounds < self.config.max_expansion_rounds {
            tokio::time::sleep(self.config.expansion_delay).await;
            outcome.rounds += 1;

            let take = batch_size.min(pending.len());
            let ids: Vec<String> = pending.drain(..take).collect();

            let result = with_retry(&self.config.retry, "expand_placeholders", || {
                self.api.expand_placeholders(post_id, &ids)
            })
            .await;

            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        post_id,
                        round = outcome.rounds,
                        ids = ids.len(),
                        error = %e,
                        "자리표시자 확장 실패, 배치 건너뜀"
                    );
                    outcome.failed_batches += 1;
                    continue;
                }
            };

            for comment in batch.comments {
                if seen.insert(comment.id.clone()) {
                    outcome.comments.push(comment);
                }
            }
            enqueue(batch.placeholders, seen, &mut pending);
        }

        if !pending.is_empty() {
            outcome.abandoned = pending.len();
            warn!(
                post_id,
                rounds = outcome.rounds,
                abandoned = outcome.abandoned,
                "확장 라운드 제한 도달, 남은 자리표시자 포기"
            );
        }

        outcome
    }

    /// 소스 하나를 크롤링하며 게시글마다 결과를 `sink`로 전달합니다.
    pub async fn crawl_source(
        &self,
        source: &str,
        lookback: Duration,
        sink: &mut dyn CrawlSink,
    ) -> PipelineResult<CrawlResult> {
        let listing = self.fetch_listing(source, lookback).await?;
        let total = listing.posts.len();
        let mut result = CrawlResult {
            posts: total,
            partial_listing: listing.partial,
            ..Default::default()
        };

        info!(source, posts = total, "게시글 목록 조회 완료");

        for (index, post) in listing.posts.iter().enumerate() {
            let comments = if post.num_comments > 0 {
                match self.fetch_comment_tree(source, &post.id).await {
                    Ok(comments) => comments,
                    Err(e) => {
                        warn!(post_id = %post.id, error = %e, "댓글 트리 조회 실패");
                        result.failed_posts += 1;
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            result.comments += comments.len();
            sink.accept(post, &comments).await;

            if (index + 1) % 10 == 0 || index + 1 == total {
                info!(
                    source,
                    progress = %format!("{}/{}", index + 1, total),
                    comments = result.comments,
                    "크롤링 진행 중"
                );
            }

            if index + 1 < total {
                tokio::time::sleep(self.config.post_delay).await;
            }
        }

        Ok(result)
    }
}
