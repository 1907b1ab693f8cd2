//! 현재가 갱신 모듈.
//!
//! 모든 종목의 최근 종가를 조회해 해당 거래일의 가격 관측치를 덮어씁니다.

use std::time::Instant;

use tracing::instrument;

use mention_core::{trading_day, NewPriceObservation, COMPONENT_MARKET_SYNC};

use super::instrument_sync::is_supported_symbol;
use crate::context::CollectorContext;
use crate::{CollectionStats, Result};

/// 진행 상황 로그 간격
const PROGRESS_INTERVAL: usize = 100;
/// 개별 에러 로그 최대 개수
const MAX_ERROR_LOGS: usize = 10;

/// 전체 종목 현재가 갱신
#[instrument(skip_all, fields(component = COMPONENT_MARKET_SYNC, job = "price_refresh"))]
pub async fn refresh_prices(ctx: &CollectorContext) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    let instruments = ctx.store.list_instruments().await?;
    let total = instruments.len();
    stats.total = total;

    tracing::info!(total, "현재가 갱신 시작");

    let delay = ctx.config.market.request_delay();

    for (index, instrument) in instruments.iter().enumerate() {
        if !is_supported_symbol(&instrument.symbol) {
            stats.skipped += 1;
            continue;
        }

        match ctx.enricher.get_current_sample(instrument).await {
            Ok(sample) => {
                let observation = NewPriceObservation {
                    instrument_id: instrument.id,
                    price: sample.close.unwrap_or_default(),
                    volume: sample.volume.unwrap_or(0),
                    price_date: trading_day(sample.timestamp),
                    recorded_at: sample.timestamp,
                };
                match ctx.store.upsert_price_observation(&observation).await {
                    Ok(_) => stats.success += 1,
                    Err(e) => {
                        stats.errors += 1;
                        if stats.errors <= MAX_ERROR_LOGS {
                            tracing::warn!(symbol = %instrument.symbol, error = %e, "가격 저장 실패");
                        }
                    }
                }
            }
            Err(e) => {
                stats.errors += 1;
                if stats.errors <= MAX_ERROR_LOGS {
                    tracing::warn!(symbol = %instrument.symbol, error = %e, "현재가 조회 실패");
                }
            }
        }

        if (index + 1) % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                progress = format!("{}/{}", index + 1, total),
                success = stats.success,
                errors = stats.errors,
                "현재가 갱신 진행 중"
            );
        }

        if !delay.is_zero() && index + 1 < total {
            tokio::time::sleep(delay).await;
        }
    }

    if stats.errors > MAX_ERROR_LOGS {
        tracing::warn!(
            suppressed = stats.errors - MAX_ERROR_LOGS,
            "나머지 에러 로그 생략"
        );
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}
