//! 멘션 저장소.
//!
//! 저장소는 파이프라인에서 유일하게 공유되는 가변 자원이며, 고유성을 스스로
//! 보장합니다. 동시에 실행되는 수집 사이클은 아래 연산만으로 안전하게 경쟁할 수
//! 있습니다:
//!
//! | 연산 | 충돌 시 |
//! |------|---------|
//! | `create_content` | `None` (이미 존재) |
//! | `insert_price_observation` | 기존 행 반환 |
//! | `insert_split`, `create_mention` | `false` |
//! | `upsert_price_observation`, `upsert_instrument` | 덮어씀 |

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use mention_core::{
    ContentRecord, ContentSource, Instrument, Mention, NewContent, NewInstrument, NewMention,
    NewPriceObservation, PriceObservation, SplitEvent, User,
};

use crate::error::Result;

pub use memory::MemoryMentionStore;
pub use postgres::PgMentionStore;

/// 멘션 파이프라인 저장소 계약.
#[async_trait]
pub trait MentionStore: Send + Sync {
    /// 사용자를 이름으로 조회하고 없으면 생성합니다.
    async fn get_or_create_user(&self, username: &str) -> Result<User>;

    /// (출처, 외부 ID)로 콘텐츠를 조회합니다.
    async fn find_content(
        &self,
        source: ContentSource,
        external_id: &str,
    ) -> Result<Option<ContentRecord>>;

    /// 콘텐츠를 생성합니다. 이미 존재하면 `None`.
    async fn create_content(&self, content: &NewContent) -> Result<Option<ContentRecord>>;

    /// 심볼로 종목을 조회합니다.
    async fn get_instrument_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>>;

    /// 전체 종목 목록 (심볼 순).
    async fn list_instruments(&self) -> Result<Vec<Instrument>>;

    /// 종목을 삽입하거나 회사명/거래소를 갱신합니다.
    async fn upsert_instrument(&self, instrument: &NewInstrument) -> Result<Instrument>;

    /// (종목, 날짜)의 가격 관측치를 조회합니다.
    async fn get_price_observation(
        &self,
        instrument_id: i64,
        price_date: NaiveDate,
    ) -> Result<Option<PriceObservation>>;

    /// 가격 관측치를 삽입합니다. 같은 (종목, 날짜)가 이미 있으면 기존 행을 반환합니다.
    async fn insert_price_observation(
        &self,
        observation: &NewPriceObservation,
    ) -> Result<PriceObservation>;

    /// 가격 관측치를 삽입하거나 덮어씁니다.
    async fn upsert_price_observation(
        &self,
        observation: &NewPriceObservation,
    ) -> Result<PriceObservation>;

    /// 분할 이벤트를 삽입합니다. 새로 삽입되면 `true`.
    async fn insert_split(&self, instrument_id: i64, split: &SplitEvent) -> Result<bool>;

    /// 멘션을 생성합니다. (콘텐츠, 종목)이 이미 있으면 `false`.
    async fn create_mention(&self, mention: &NewMention) -> Result<bool>;

    /// 콘텐츠에 연결된 멘션 목록.
    async fn mentions_for_content(&self, content_id: i64) -> Result<Vec<Mention>>;
}
