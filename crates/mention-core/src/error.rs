//! 파이프라인 에러 타입.
//!
//! 크롤러, 가격 보강, 수집 코디네이터가 공유하는 에러 분류 체계입니다.
//! 알 수 없는 종목(UnknownInstrument)은 에러가 아니므로 여기에 없습니다.

use thiserror::Error;

/// 파이프라인 공통 에러.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 일시적 네트워크 에러 (타임아웃, 연결 실패, 5xx)
    #[error("네트워크 에러: {0}")]
    TransientNetwork(String),

    /// 요청 한도 초과 (HTTP 429)
    #[error("요청 한도 초과: {0}")]
    RateLimited(String),

    /// 재시도해도 의미 없는 HTTP 상태 (4xx)
    #[error("HTTP 에러 {status}: {url}")]
    Http { status: u16, url: String },

    /// 응답 형식 오류
    #[error("잘못된 응답: {0}")]
    MalformedResponse(String),

    /// 외부 API가 반환한 구조화된 에러
    #[error("API 에러 {code}: {description}")]
    Api { code: String, description: String },

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Persistence(String),

    /// 유일성 제약 충돌 (멱등 처리 대상)
    #[error("중복 레코드: {0}")]
    PersistenceConflict(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 파이프라인 작업을 위한 Result 타입.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// 429도 같은 재시도 예산 안에서 재시도합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::TransientNetwork(_) | PipelineError::RateLimited(_)
        )
    }

    /// 멱등 no-op으로 취급해야 하는 충돌인지 확인합니다.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PipelineError::PersistenceConflict(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::MalformedResponse(err.to_string())
    }
}
