//! 추출기와 도메인 타입 통합 테스트
//!
//! 크롤러가 만든 콘텐츠 단위에서 티커 후보를 뽑아내는 흐름을 공개 API만으로 확인

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;

use mention_core::{
    trading_day, ContentItem, ContentSource, DenyList, PriceSample, TickerExtractor,
    DELETED_AUTHOR,
};

fn item(author: &str, body: &str) -> ContentItem {
    ContentItem {
        external_id: "t3_abc123".to_string(),
        author: author.to_string(),
        body: body.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap(),
        source: ContentSource::Reddit,
        parent_id: None,
    }
}

#[test]
fn test_canonical_extraction_from_post_body() {
    let extractor = TickerExtractor::new(DenyList::canonical());
    let post = item("alice", "I think $GME and GME are mooning, also BUY");

    assert!(post.has_author());
    assert_eq!(extractor.extract(&post.body), vec!["GME".to_string()]);
}

#[test]
fn test_deleted_author_has_no_author() {
    assert!(!item(DELETED_AUTHOR, "GME").has_author());
    assert!(!item("", "GME").has_author());
}

#[test]
fn test_custom_deny_list_replaces_canonical() {
    // 기본 목록에서는 제외되는 BUY가 사용자 목록에서는 후보가 됨
    let extractor = TickerExtractor::new(DenyList::from_tokens("custom", ["gme"]));

    assert_eq!(
        extractor.extract("GME BUY $AMC"),
        vec!["BUY".to_string(), "AMC".to_string()]
    );
    assert_eq!(extractor.deny_list().version(), "custom");
}

#[test]
fn test_mention_timestamp_maps_to_new_york_trading_day() {
    // 00:30 UTC는 뉴욕 기준 전날 저녁
    let late = Utc.with_ymd_and_hms(2024, 3, 2, 0, 30, 0).unwrap();
    assert_eq!(
        trading_day(late),
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    );
}

#[test]
fn test_zero_close_is_not_valid() {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
    let zero = PriceSample {
        timestamp: at,
        close: Some(dec!(0)),
        volume: Some(0),
    };
    let missing = PriceSample {
        timestamp: at,
        close: None,
        volume: None,
    };
    let real = PriceSample {
        timestamp: at,
        close: Some(dec!(12.34)),
        volume: Some(100),
    };

    assert_eq!(zero.valid_close(), None);
    assert_eq!(missing.valid_close(), None);
    assert_eq!(real.valid_close(), Some(dec!(12.34)));
}

#[test]
fn test_content_source_round_trip() {
    let source: ContentSource = "Reddit".parse().unwrap();
    assert_eq!(source, ContentSource::Reddit);
    assert_eq!(source.to_string(), "reddit");
    assert!("twitter".parse::<ContentSource>().is_err());
}
