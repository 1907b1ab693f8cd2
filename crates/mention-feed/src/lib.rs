//! 포럼 게시글/댓글 수집.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - ForumApi trait: 포럼 읽기 API 인터페이스
//! - Reddit 공개 JSON API 클라이언트
//! - 크롤러: 목록 순회, 댓글 트리 평탄화 및 자리표시자 확장
//! - 재시도와 요청 간 딜레이

pub mod crawler;
pub mod reddit;
pub mod traits;
pub mod types;

pub use crawler::{CrawlResult, CrawlSink, CrawlerConfig, ExpansionOutcome, ForumCrawler, Listing};
pub use reddit::{RedditClient, RedditConfig};
pub use traits::ForumApi;
pub use types::*;
