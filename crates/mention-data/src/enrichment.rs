//! 멘션 가격 보강.
//!
//! 멘션 시점의 기준 가격을 (종목, 거래일)당 한 번만 외부에서 조회하고 저장합니다.
//!
//! # 동작 방식
//!
//! 1. 저장된 관측치 확인 (있으면 외부 호출 없음)
//! 2. 없으면 `[as_of - 7일, as_of]` 일봉 조회
//! 3. `as_of` 이전의 마지막 유효 종가 선택, 없으면 구간의 첫 유효 종가
//! 4. 저장소의 insert-or-get으로 저장 (경쟁에서 지면 먼저 저장된 행 반환)
//! 5. 조회 실패 시 가격 0의 관측치를 저장하고 계속 진행
//!
//! 같은 프로세스 안의 동시 요청은 키별 잠금으로 외부 호출을 하나로 합칩니다.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use mention_core::{
    trading_day, with_retry, Instrument, NewPriceObservation, PipelineError, PipelineResult,
    PriceObservation, PriceSample, PriceSeries, RetryConfig, COMPONENT_ENRICHMENT,
};

use crate::provider::MarketDataSource;
use crate::storage::MentionStore;

type FetchKey = (i64, NaiveDate);
type FetchLockMap = Arc<std::sync::Mutex<HashMap<FetchKey, Arc<Mutex<()>>>>>;

/// 키별 잠금 항목. 드롭되면 대기자가 없을 때 맵에서 제거합니다.
///
/// 에러로 빠져나가거나 future가 취소되어도 항목이 남지 않습니다.
struct FetchLockEntry {
    locks: FetchLockMap,
    key: FetchKey,
    lock: Arc<Mutex<()>>,
}

impl FetchLockEntry {
    fn acquire(locks: &FetchLockMap, key: FetchKey) -> Self {
        let lock = locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            locks: locks.clone(),
            key,
            lock,
        }
    }
}

impl Drop for FetchLockEntry {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // 맵과 이 항목만 참조하면 대기자가 없음
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.key);
        }
    }
}

/// 가격 보강 설정.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// 과거 조회 구간 (일)
    pub lookback_days: i64,
    /// 현재가 조회 구간
    pub current_range: String,
    /// 외부 호출 재시도 정책
    pub retry: RetryConfig,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            current_range: "5d".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// 가격 보강 서비스.
#[derive(Clone)]
pub struct PriceEnricher {
    store: Arc<dyn MentionStore>,
    source: Arc<dyn MarketDataSource>,
    config: EnrichmentConfig,
    fetch_locks: FetchLockMap,
}

impl PriceEnricher {
    pub fn new(
        store: Arc<dyn MentionStore>,
        source: Arc<dyn MarketDataSource>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
            fetch_locks: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// `as_of` 거래일의 가격 관측치를 반환합니다. 없으면 조회 후 저장합니다.
    ///
    /// 외부 조회 실패는 에러가 아니라 가격 0의 관측치가 됩니다.
    /// 에러는 저장소 실패에서만 발생합니다.
    #[instrument(
        skip(self, instrument),
        fields(component = COMPONENT_ENRICHMENT, symbol = %instrument.symbol)
    )]
    pub async fn get_or_fetch_price(
        &self,
        instrument: &Instrument,
        as_of: DateTime<Utc>,
    ) -> PipelineResult<PriceObservation> {
        let day = trading_day(as_of);

        if let Some(existing) = self.store.get_price_observation(instrument.id, day).await? {
            debug!(%day, "저장된 가격 사용");
            return Ok(existing);
        }

        let entry = FetchLockEntry::acquire(&self.fetch_locks, (instrument.id, day));
        let _guard = entry.lock.lock().await;

        // 잠금 대기 중 다른 작업이 저장했을 수 있음
        match self.store.get_price_observation(instrument.id, day).await? {
            Some(existing) => Ok(existing),
            None => {
                let new = self.fetch_observation(instrument, as_of, day).await;
                Ok(self.store.insert_price_observation(&new).await?)
            }
        }
    }

    /// 최근 구간의 마지막 유효 샘플.
    #[instrument(
        skip(self, instrument),
        fields(component = COMPONENT_ENRICHMENT, symbol = %instrument.symbol)
    )]
    pub async fn get_current_sample(&self, instrument: &Instrument) -> PipelineResult<PriceSample> {
        let series = with_retry(&self.config.retry, "fetch_recent_series", || {
            self.source
                .fetch_recent_series(&instrument.symbol, &self.config.current_range)
        })
        .await?;

        latest_valid_sample(&series).cloned().ok_or_else(|| {
            PipelineError::MalformedResponse(format!("{}: 유효한 종가 없음", instrument.symbol))
        })
    }

    /// 현재가 (최근 구간의 마지막 유효 종가).
    pub async fn get_current_price(&self, instrument: &Instrument) -> PipelineResult<Decimal> {
        let sample = self.get_current_sample(instrument).await?;
        Ok(sample.close.unwrap_or_default())
    }

    async fn fetch_observation(
        &self,
        instrument: &Instrument,
        as_of: DateTime<Utc>,
        day: NaiveDate,
    ) -> NewPriceObservation {
        let start = as_of - chrono::Duration::days(self.config.lookback_days);
        let result = with_retry(&self.config.retry, "fetch_daily_series", || {
            self.source
                .fetch_daily_series(&instrument.symbol, start, as_of)
        })
        .await;

        let series = match result {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %instrument.symbol, error = %e, "시세 조회 실패, 가격 0으로 기록");
                return sentinel(instrument.id, as_of, day);
            }
        };

        self.persist_splits(instrument, &series).await;

        match select_close(&series, as_of) {
            Some(sample) => NewPriceObservation {
                instrument_id: instrument.id,
                price: sample.close.unwrap_or_default(),
                volume: sample.volume.unwrap_or(0),
                price_date: day,
                recorded_at: sample.timestamp,
            },
            None => {
                warn!(symbol = %instrument.symbol, "유효한 종가 없음, 가격 0으로 기록");
                sentinel(instrument.id, as_of, day)
            }
        }
    }

    async fn persist_splits(&self, instrument: &Instrument, series: &PriceSeries) {
        for split in &series.splits {
            match self.store.insert_split(instrument.id, split).await {
                Ok(true) => debug!(
                    symbol = %instrument.symbol,
                    ratio = %split.ratio,
                    date = %split.effective_date,
                    "분할 이벤트 저장"
                ),
                Ok(false) => {}
                Err(e) => warn!(symbol = %instrument.symbol, error = %e, "분할 이벤트 저장 실패"),
            }
        }
    }

    #[cfg(test)]
    fn pending_fetch_locks(&self) -> usize {
        self.fetch_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn sentinel(instrument_id: i64, as_of: DateTime<Utc>, day: NaiveDate) -> NewPriceObservation {
    NewPriceObservation {
        instrument_id,
        price: Decimal::ZERO,
        volume: 0,
        price_date: day,
        recorded_at: as_of,
    }
}

/// `as_of` 이전의 마지막 유효 종가 샘플, 없으면 구간의 첫 유효 종가 샘플.
pub fn select_close(series: &PriceSeries, as_of: DateTime<Utc>) -> Option<&PriceSample> {
    series
        .samples
        .iter()
        .filter(|s| s.timestamp <= as_of && s.valid_close().is_some())
        .max_by_key(|s| s.timestamp)
        .or_else(|| {
            series
                .samples
                .iter()
                .filter(|s| s.valid_close().is_some())
                .min_by_key(|s| s.timestamp)
        })
}

/// 시계열을 뒤에서부터 훑어 첫 유효 종가 샘플을 찾습니다.
pub fn latest_valid_sample(series: &PriceSeries) -> Option<&PriceSample> {
    series
        .samples
        .iter()
        .rev()
        .find(|s| s.valid_close().is_some())
}
