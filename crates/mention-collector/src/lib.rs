//! Standalone mention collector.
//!
//! 이 crate는 소셜 미디어 티커 멘션을 수집하는 바이너리를 제공합니다:
//! - 서브레딧별 크롤링 사이클 (게시글/댓글 → 티커 멘션 + 가격)
//! - 종목 디렉터리 동기화 (NASDAQ)
//! - 현재가 갱신 및 주식 분할 이력 동기화
//! - 데몬 모드 스케줄러

pub mod config;
pub mod context;
pub mod error;
pub mod modules;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use config::CollectorConfig;
pub use context::CollectorContext;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
