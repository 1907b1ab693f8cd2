//! 주식 분할 이력 동기화 모듈.

use std::time::Instant;

use tracing::instrument;

use mention_core::{with_retry, COMPONENT_MARKET_SYNC};

use super::instrument_sync::is_supported_symbol;
use crate::context::CollectorContext;
use crate::{CollectionStats, Result};

/// 전체 종목의 분할 이력을 조회해 새 이벤트만 저장
#[instrument(skip_all, fields(component = COMPONENT_MARKET_SYNC, job = "split_sync"))]
pub async fn sync_splits(ctx: &CollectorContext) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    let instruments = ctx.store.list_instruments().await?;
    stats.total = instruments.len();

    tracing::info!(total = stats.total, "분할 이력 동기화 시작");

    let retry = ctx.config.market.retry();
    let delay = ctx.config.market.request_delay();
    let mut inserted = 0usize;

    for (index, instrument) in instruments.iter().enumerate() {
        if !is_supported_symbol(&instrument.symbol) {
            stats.skipped += 1;
            continue;
        }

        let splits = match with_retry(&retry, "fetch_split_history", || {
            ctx.market.fetch_split_history(&instrument.symbol)
        })
        .await
        {
            Ok(splits) => splits,
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(symbol = %instrument.symbol, error = %e, "분할 이력 조회 실패");
                continue;
            }
        };

        if splits.is_empty() {
            stats.empty += 1;
        } else {
            stats.success += 1;
        }

        for split in &splits {
            match ctx.store.insert_split(instrument.id, split).await {
                Ok(true) => {
                    inserted += 1;
                    tracing::debug!(
                        symbol = %instrument.symbol,
                        ratio = %split.ratio,
                        date = %split.effective_date,
                        "분할 이벤트 저장"
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(symbol = %instrument.symbol, error = %e, "분할 이벤트 저장 실패");
                }
            }
        }

        if !delay.is_zero() && index + 1 < instruments.len() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(inserted, "새 분할 이벤트 저장 완료");
    stats.elapsed = start.elapsed();
    Ok(stats)
}
