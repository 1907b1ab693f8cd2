//! 프로세스 내 저장소 구현.
//!
//! PostgreSQL 구현과 같은 고유성 규칙을 따릅니다. 테스트에 사용합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use mention_core::{
    ContentRecord, ContentSource, Instrument, Mention, NewContent, NewInstrument, NewMention,
    NewPriceObservation, PriceObservation, SplitEvent, User,
};

use super::MentionStore;
use crate::error::Result;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    contents: Vec<ContentRecord>,
    instruments: Vec<Instrument>,
    prices: Vec<PriceObservation>,
    splits: HashMap<(i64, i64), SplitEvent>,
    mentions: Vec<Mention>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 메모리 기반 [`MentionStore`].
#[derive(Default)]
pub struct MemoryMentionStore {
    tables: Mutex<Tables>,
}

impl MemoryMentionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 종목 목록으로 초기화합니다.
    pub async fn with_instruments(symbols: &[&str]) -> Self {
        let store = Self::new();
        for symbol in symbols {
            let instrument = NewInstrument {
                symbol: symbol.to_string(),
                company_name: format!("{} Inc.", symbol),
                exchange: "NASDAQ".to_string(),
            };
            if let Err(e) = store.upsert_instrument(&instrument).await {
                tracing::warn!(symbol = %symbol, error = %e, "종목 초기화 실패");
            }
        }
        store
    }

    pub async fn content_count(&self) -> usize {
        self.tables.lock().await.contents.len()
    }

    pub async fn mention_count(&self) -> usize {
        self.tables.lock().await.mentions.len()
    }

    pub async fn price_count(&self) -> usize {
        self.tables.lock().await.prices.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    /// 종목의 분할 이벤트 (발효일 순).
    pub async fn splits_for(&self, instrument_id: i64) -> Vec<SplitEvent> {
        let tables = self.tables.lock().await;
        let mut splits: Vec<SplitEvent> = tables
            .splits
            .iter()
            .filter(|((id, _), _)| *id == instrument_id)
            .map(|(_, split)| split.clone())
            .collect();
        splits.sort_by_key(|s| s.effective_date);
        splits
    }
}

#[async_trait]
impl MentionStore for MemoryMentionStore {
    async fn get_or_create_user(&self, username: &str) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter().find(|u| u.username == username) {
            return Ok(user.clone());
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_content(
        &self,
        source: ContentSource,
        external_id: &str,
    ) -> Result<Option<ContentRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .contents
            .iter()
            .find(|c| c.source == source && c.external_id == external_id)
            .cloned())
    }

    async fn create_content(&self, content: &NewContent) -> Result<Option<ContentRecord>> {
        let mut tables = self.tables.lock().await;
        let exists = tables
            .contents
            .iter()
            .any(|c| c.source == content.source && c.external_id == content.external_id);
        if exists {
            return Ok(None);
        }

        let record = ContentRecord {
            id: tables.next_id(),
            user_id: content.user_id,
            source: content.source,
            external_id: content.external_id.clone(),
            body: content.body.clone(),
            created_at: content.created_at,
        };
        tables.contents.push(record.clone());
        Ok(Some(record))
    }

    async fn get_instrument_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .instruments
            .iter()
            .find(|i| i.symbol == symbol)
            .cloned())
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        let tables = self.tables.lock().await;
        let mut instruments = tables.instruments.clone();
        instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(instruments)
    }

    async fn upsert_instrument(&self, instrument: &NewInstrument) -> Result<Instrument> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .instruments
            .iter_mut()
            .find(|i| i.symbol == instrument.symbol)
        {
            existing.company_name = instrument.company_name.clone();
            existing.exchange = instrument.exchange.clone();
            return Ok(existing.clone());
        }

        let record = Instrument {
            id: tables.next_id(),
            symbol: instrument.symbol.clone(),
            company_name: instrument.company_name.clone(),
            exchange: instrument.exchange.clone(),
        };
        tables.instruments.push(record.clone());
        Ok(record)
    }

    async fn get_price_observation(
        &self,
        instrument_id: i64,
        price_date: NaiveDate,
    ) -> Result<Option<PriceObservation>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .prices
            .iter()
            .find(|p| p.instrument_id == instrument_id && p.price_date == price_date)
            .cloned())
    }

    async fn insert_price_observation(
        &self,
        observation: &NewPriceObservation,
    ) -> Result<PriceObservation> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.prices.iter().find(|p| {
            p.instrument_id == observation.instrument_id && p.price_date == observation.price_date
        }) {
            return Ok(existing.clone());
        }

        let record = PriceObservation {
            id: tables.next_id(),
            instrument_id: observation.instrument_id,
            price: observation.price,
            volume: observation.volume,
            price_date: observation.price_date,
            recorded_at: observation.recorded_at,
        };
        tables.prices.push(record.clone());
        Ok(record)
    }

    async fn upsert_price_observation(
        &self,
        observation: &NewPriceObservation,
    ) -> Result<PriceObservation> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.prices.iter_mut().find(|p| {
            p.instrument_id == observation.instrument_id && p.price_date == observation.price_date
        }) {
            existing.price = observation.price;
            existing.volume = observation.volume;
            existing.recorded_at = observation.recorded_at;
            return Ok(existing.clone());
        }

        let record = PriceObservation {
            id: tables.next_id(),
            instrument_id: observation.instrument_id,
            price: observation.price,
            volume: observation.volume,
            price_date: observation.price_date,
            recorded_at: observation.recorded_at,
        };
        tables.prices.push(record.clone());
        Ok(record)
    }

    async fn insert_split(&self, instrument_id: i64, split: &SplitEvent) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let key = (instrument_id, split.effective_date.timestamp());
        if tables.splits.contains_key(&key) {
            return Ok(false);
        }
        tables.splits.insert(key, split.clone());
        Ok(true)
    }

    async fn create_mention(&self, mention: &NewMention) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let exists = tables.mentions.iter().any(|m| {
            m.content_id == mention.content_id && m.instrument_id == mention.instrument_id
        });
        if exists {
            return Ok(false);
        }

        let record = Mention {
            id: tables.next_id(),
            instrument_id: mention.instrument_id,
            user_id: mention.user_id,
            content_id: mention.content_id,
            mentioned_at: mention.mentioned_at,
            price_id: mention.price_id,
        };
        tables.mentions.push(record);
        Ok(true)
    }

    async fn mentions_for_content(&self, content_id: i64) -> Result<Vec<Mention>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .mentions
            .iter()
            .filter(|m| m.content_id == content_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn observation(instrument_id: i64, price: rust_decimal::Decimal) -> NewPriceObservation {
        NewPriceObservation {
            instrument_id,
            price,
            volume: 100,
            price_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_user_created_once() {
        let store = MemoryMentionStore::new();
        let a = store.get_or_create_user("alice").await.unwrap();
        let b = store.get_or_create_user("alice").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_content_is_insert_if_absent() {
        let store = MemoryMentionStore::new();
        let content = NewContent {
            user_id: 1,
            source: ContentSource::Reddit,
            external_id: "t3_abc".to_string(),
            body: "GME".to_string(),
            created_at: Utc::now(),
        };

        assert!(store.create_content(&content).await.unwrap().is_some());
        assert!(store.create_content(&content).await.unwrap().is_none());
        assert_eq!(store.content_count().await, 1);
    }

    #[tokio::test]
    async fn test_insert_price_observation_returns_first_row() {
        let store = MemoryMentionStore::new();
        let first = store
            .insert_price_observation(&observation(7, dec!(10)))
            .await
            .unwrap();
        let second = store
            .insert_price_observation(&observation(7, dec!(99)))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.price, dec!(10));
    }

    #[tokio::test]
    async fn test_upsert_price_observation_overwrites() {
        let store = MemoryMentionStore::new();
        store
            .insert_price_observation(&observation(7, dec!(10)))
            .await
            .unwrap();
        let updated = store
            .upsert_price_observation(&observation(7, dec!(12.5)))
            .await
            .unwrap();

        assert_eq!(updated.price, dec!(12.5));
        assert_eq!(store.price_count().await, 1);
    }

    #[tokio::test]
    async fn test_split_inserted_once() {
        let store = MemoryMentionStore::new();
        let split = SplitEvent {
            ratio: dec!(0.25),
            effective_date: Utc.with_ymd_and_hms(2020, 8, 31, 13, 30, 0).unwrap(),
        };

        assert!(store.insert_split(1, &split).await.unwrap());
        assert!(!store.insert_split(1, &split).await.unwrap());
        assert_eq!(store.splits_for(1).await.len(), 1);
    }
}
