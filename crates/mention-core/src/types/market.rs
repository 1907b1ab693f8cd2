//! 종목, 가격 관측치, 분할, 멘션 타입.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래 가능한 종목 (참조 데이터).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i64,
    /// 티커 심볼 (고유)
    pub symbol: String,
    /// 회사명
    pub company_name: String,
    /// 거래소 (예: "NASDAQ")
    pub exchange: String,
}

/// 종목 upsert용.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstrument {
    pub symbol: String,
    pub company_name: String,
    pub exchange: String,
}

/// 저장된 가격 관측치.
///
/// (종목, `price_date`)당 최대 하나만 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id: i64,
    pub instrument_id: i64,
    /// 종가 (조회 실패 시 0)
    pub price: Decimal,
    /// 거래량
    pub volume: i64,
    /// 이 관측치가 대표하는 거래일 (캐시 키)
    pub price_date: NaiveDate,
    /// 실제 시세 샘플 시각
    pub recorded_at: DateTime<Utc>,
}

impl PriceObservation {
    /// 조회 실패로 기록된 0 가격인지 확인합니다.
    pub fn is_sentinel(&self) -> bool {
        self.price.is_zero()
    }
}

/// 가격 관측치 삽입용.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPriceObservation {
    pub instrument_id: i64,
    pub price: Decimal,
    pub volume: i64,
    pub price_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

/// 주식 분할 이벤트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEvent {
    /// 분할 비율 (denominator / numerator, 예: 4:1 분할 → 0.25)
    pub ratio: Decimal,
    /// 효력 발생 시각
    pub effective_date: DateTime<Utc>,
}

/// 저장된 멘션.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: i64,
    pub instrument_id: i64,
    pub user_id: i64,
    pub content_id: i64,
    pub mentioned_at: DateTime<Utc>,
    pub price_id: i64,
}

/// 멘션 삽입용.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMention {
    pub instrument_id: i64,
    pub user_id: i64,
    pub content_id: i64,
    pub mentioned_at: DateTime<Utc>,
    pub price_id: i64,
}

/// 시세 시계열의 한 샘플.
///
/// 외부 API는 휴장일 등에 null 종가를 반환할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
}

impl PriceSample {
    /// 유효한 (null도 0도 아닌) 종가.
    pub fn valid_close(&self) -> Option<Decimal> {
        self.close.filter(|c| !c.is_zero())
    }
}

/// 시세 시계열과 함께 보고된 분할 이벤트.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSeries {
    /// 시간순 샘플
    pub samples: Vec<PriceSample>,
    /// 분할 이벤트 (요청한 경우에만)
    pub splits: Vec<SplitEvent>,
}

/// 시각이 속한 거래일 (미국 동부 시간 기준 달력 날짜).
pub fn trading_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&New_York).date_naive()
}
