//! # Mention Core
//!
//! 멘션 수집 파이프라인의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 게시글/댓글, 종목, 가격 관측치, 멘션 도메인 타입
//! - 파이프라인 에러 분류 체계
//! - 재시도 정책 (고정 딜레이, 제한된 시도 횟수)
//! - 티커 후보 추출기 및 제외 목록
//! - 외부 읽기 API용 HTTP 클라이언트
//! - 로깅 인프라

pub mod error;
pub mod extractor;
pub mod http;
pub mod logging;
pub mod retry;
pub mod types;

pub use error::*;
pub use extractor::{DenyList, TickerExtractor};
pub use http::HttpClient;
pub use logging::*;
pub use retry::{with_retry, with_retry_if, RetryConfig};
pub use types::*;
