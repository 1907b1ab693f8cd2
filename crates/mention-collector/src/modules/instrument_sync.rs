//! 종목 디렉터리 동기화 모듈.

use std::time::Instant;

use tracing::instrument;

use mention_core::{NewInstrument, COMPONENT_MARKET_SYNC};

use crate::context::CollectorContext;
use crate::{CollectionStats, Result};

/// 지원하지 않는 심볼 (지수 `^`, 클래스 주식 `/`).
pub fn is_supported_symbol(symbol: &str) -> bool {
    !symbol.contains('^') && !symbol.contains('/')
}

/// 상장 종목 목록을 받아 Instrument 테이블에 upsert
#[instrument(skip_all, fields(component = COMPONENT_MARKET_SYNC, job = "instrument_sync"))]
pub async fn sync_instruments(ctx: &CollectorContext) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    if !ctx.config.instruments.enabled {
        tracing::info!("종목 동기화 비활성화, 건너뛰기");
        stats.skipped = 1;
        return Ok(stats);
    }

    tracing::info!(exchange = ctx.directory.exchange(), "종목 동기화 시작");

    let listed = ctx.directory.fetch_all().await?;
    stats.total = listed.len();

    for entry in listed {
        if !is_supported_symbol(&entry.symbol) {
            stats.skipped += 1;
            continue;
        }

        let instrument = NewInstrument {
            symbol: entry.symbol,
            company_name: entry.name,
            exchange: ctx.directory.exchange().to_string(),
        };

        match ctx.store.upsert_instrument(&instrument).await {
            Ok(_) => stats.success += 1,
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(symbol = %instrument.symbol, error = %e, "종목 저장 실패");
            }
        }
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_with, FakeDirectory, FakeForum, FakeMarket};
    use mention_data::{MemoryMentionStore, MentionStore};
    use std::sync::Arc;

    #[test]
    fn test_is_supported_symbol() {
        assert!(is_supported_symbol("AAPL"));
        assert!(!is_supported_symbol("^GSPC"));
        assert!(!is_supported_symbol("BRK/A"));
    }

    #[tokio::test]
    async fn test_sync_upserts_supported_symbols() {
        let store = Arc::new(MemoryMentionStore::with_instruments(&["AAPL"]).await);
        let ctx = context_with(
            store.clone(),
            FakeForum::default(),
            Arc::new(FakeMarket::default()),
            FakeDirectory::with_symbols(&["AAPL", "GME", "BRK/A", "^IXIC"]),
        );

        let stats = sync_instruments(&ctx).await.unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.skipped, 2);

        let instruments = store.list_instruments().await.unwrap();
        let symbols: Vec<_> = instruments.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "GME"]);
        assert_eq!(instruments[0].company_name, "AAPL Corp");
        assert_eq!(instruments[1].exchange, "NASDAQ");
    }

    #[tokio::test]
    async fn test_directory_failure_is_error() {
        let ctx = context_with(
            Arc::new(MemoryMentionStore::new()),
            FakeForum::default(),
            Arc::new(FakeMarket::default()),
            FakeDirectory {
                failing: true,
                ..Default::default()
            },
        );

        assert!(sync_instruments(&ctx).await.is_err());
    }
}
