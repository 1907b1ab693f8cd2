//! 멘션 수집 코디네이터.
//!
//! 콘텐츠 하나를 받아 작성자 → 콘텐츠 레코드 → 티커 추출 → 종목 확인 →
//! 가격 보강 → 멘션 저장 순서로 처리합니다.
//!
//! 같은 `external_id`를 다시 처리해도 콘텐츠 레코드는 하나, 종목당 멘션은
//! 최대 하나입니다. 유일성은 저장소가 보장하므로 동시 실행에도 안전합니다.
//!
//! 콘텐츠 저장 후 멘션 저장 전에 중단되면 (제한 시간, 저장소 오류) 콘텐츠만
//! 남습니다. 이미 수집된 콘텐츠를 다시 만나면 빠진 멘션을 복구합니다.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn, Instrument};

use mention_core::{
    component_span, ContentItem, ContentRecord, ContentSource, NewContent, NewMention,
    PipelineResult, TickerExtractor, COMPONENT_INGEST, DELETED_AUTHOR,
};
use mention_data::{MentionStore, PriceEnricher};
use mention_feed::{CrawlSink, ForumComment, ForumPost};

use crate::CollectionStats;

/// 콘텐츠 하나의 처리 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 작성자가 없거나 삭제됨
    Skipped,
    /// 이미 수집된 콘텐츠
    Duplicate {
        /// 이전 처리에서 빠져 이번에 저장된 멘션 수
        recovered: usize,
    },
    /// 새로 수집됨
    Ingested {
        /// 새로 저장된 멘션 수
        mentions: usize,
        /// 보강/저장에 실패한 종목 수
        failed: usize,
    },
}

/// 멘션 수집 코디네이터.
///
/// 크롤러의 [`CrawlSink`]로 동작하며 처리 결과를 [`CollectionStats`]에 누적합니다.
pub struct MentionIngestor {
    store: Arc<dyn MentionStore>,
    enricher: PriceEnricher,
    extractor: TickerExtractor,
    stats: CollectionStats,
}

impl MentionIngestor {
    pub fn new(
        store: Arc<dyn MentionStore>,
        enricher: PriceEnricher,
        extractor: TickerExtractor,
    ) -> Self {
        Self {
            store,
            enricher,
            extractor,
            stats: CollectionStats::new(),
        }
    }

    /// 지금까지 누적된 통계.
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// 통계를 꺼내고 초기화합니다.
    pub fn take_stats(&mut self) -> CollectionStats {
        std::mem::take(&mut self.stats)
    }

    /// 콘텐츠 하나를 처리합니다.
    ///
    /// 종목별 보강 실패는 해당 종목만 건너뛰고 `failed`로 집계됩니다.
    /// 에러는 작성자/콘텐츠 저장 실패에서만 반환됩니다.
    pub async fn process_content_item(
        &self,
        author: &str,
        external_id: &str,
        text: &str,
        timestamp: DateTime<Utc>,
        source: ContentSource,
    ) -> PipelineResult<IngestOutcome> {
        let span = component_span!(COMPONENT_INGEST, external_id = %external_id);
        self.process_inner(author, external_id, text, timestamp, source)
            .instrument(span)
            .await
    }

    async fn process_inner(
        &self,
        author: &str,
        external_id: &str,
        text: &str,
        timestamp: DateTime<Utc>,
        source: ContentSource,
    ) -> PipelineResult<IngestOutcome> {
        if author.is_empty() || author == DELETED_AUTHOR {
            debug!("작성자 없음, 건너뛰기");
            return Ok(IngestOutcome::Skipped);
        }

        let user = self.store.get_or_create_user(author).await?;

        if let Some(existing) = self.store.find_content(source, external_id).await? {
            debug!("이미 수집된 콘텐츠");
            let recovered = self.recover_mentions(&existing).await;
            return Ok(IngestOutcome::Duplicate { recovered });
        }

        let content = NewContent {
            user_id: user.id,
            source,
            external_id: external_id.to_string(),
            body: text.to_string(),
            created_at: timestamp,
        };
        let Some(record) = self.store.create_content(&content).await? else {
            // 다른 작업이 먼저 저장함
            return Ok(IngestOutcome::Duplicate { recovered: 0 });
        };

        let (mentions, failed) = self.record_mentions(&record, &HashSet::new()).await;

        debug!(mentions, failed, "콘텐츠 수집 완료");
        Ok(IngestOutcome::Ingested { mentions, failed })
    }

    /// 이미 저장된 콘텐츠에서 빠진 멘션을 저장하고 그 수를 반환합니다.
    async fn recover_mentions(&self, record: &ContentRecord) -> usize {
        if self.extractor.extract(&record.body).is_empty() {
            return 0;
        }

        let recorded: HashSet<i64> = match self.store.mentions_for_content(record.id).await {
            Ok(mentions) => mentions.iter().map(|m| m.instrument_id).collect(),
            Err(e) => {
                warn!(error = %e, "기존 멘션 조회 실패, 복구 건너뜀");
                return 0;
            }
        };

        let (recovered, failed) = self.record_mentions(record, &recorded).await;
        if recovered > 0 || failed > 0 {
            info!(recovered, failed, "누락된 멘션 복구");
        }
        recovered
    }

    /// 콘텐츠 본문의 티커마다 가격을 보강하고 멘션을 저장합니다.
    ///
    /// `recorded`에 있는 종목은 건너뜁니다. (저장한 수, 실패한 수)를 반환합니다.
    async fn record_mentions(
        &self,
        record: &ContentRecord,
        recorded: &HashSet<i64>,
    ) -> (usize, usize) {
        let mut mentions = 0;
        let mut failed = 0;

        for symbol in self.extractor.extract(&record.body) {
            let instrument = match self.store.get_instrument_by_symbol(&symbol).await {
                Ok(Some(instrument)) => instrument,
                Ok(None) => {
                    debug!(symbol = %symbol, "등록되지 않은 심볼");
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "종목 조회 실패");
                    failed += 1;
                    continue;
                }
            };

            if recorded.contains(&instrument.id) {
                continue;
            }

            let price = match self
                .enricher
                .get_or_fetch_price(&instrument, record.created_at)
                .await
            {
                Ok(price) => price,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "가격 보강 실패");
                    failed += 1;
                    continue;
                }
            };

            let mention = NewMention {
                instrument_id: instrument.id,
                user_id: record.user_id,
                content_id: record.id,
                mentioned_at: record.created_at,
                price_id: price.id,
            };
            match self.store.create_mention(&mention).await {
                Ok(true) => mentions += 1,
                Ok(false) => debug!(symbol = %symbol, "이미 저장된 멘션"),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "멘션 저장 실패");
                    failed += 1;
                }
            }
        }

        (mentions, failed)
    }

    /// [`ContentItem`]을 처리합니다.
    pub async fn process_item(&self, item: &ContentItem) -> PipelineResult<IngestOutcome> {
        self.process_content_item(
            &item.author,
            &item.external_id,
            &item.body,
            item.created_at,
            item.source,
        )
        .await
    }

    /// 처리하고 결과를 통계에 반영합니다. 에러는 로그만 남깁니다.
    async fn ingest_and_record(&mut self, item: ContentItem) {
        self.stats.total += 1;
        match self.process_item(&item).await {
            Ok(IngestOutcome::Skipped) => self.stats.skipped += 1,
            Ok(IngestOutcome::Duplicate { recovered }) => {
                self.stats.duplicates += 1;
                self.stats.mentions += recovered;
            }
            Ok(IngestOutcome::Ingested { mentions, failed }) => {
                self.stats.success += 1;
                self.stats.mentions += mentions;
                self.stats.errors += failed;
            }
            Err(e) => {
                self.stats.errors += 1;
                warn!(external_id = %item.external_id, error = %e, "콘텐츠 수집 실패");
            }
        }
    }
}

#[async_trait]
impl CrawlSink for MentionIngestor {
    async fn accept(&mut self, post: &ForumPost, comments: &[ForumComment]) {
        self.ingest_and_record(post.to_content_item()).await;
        for comment in comments {
            self.ingest_and_record(comment.to_content_item()).await;
        }
    }
}
