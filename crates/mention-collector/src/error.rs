//! 에러 타입 정의.

use std::fmt;

use mention_core::PipelineError;
use mention_data::DataError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 저장소 에러
    Data(DataError),
    /// 파이프라인 에러 (외부 API, 설정 파일 등)
    Pipeline(PipelineError),
    /// 설정 에러
    Config(String),
    /// 작업 제한 시간 초과
    Timeout(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Timeout(job) => write!(f, "Deadline exceeded: {}", job),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

impl From<PipelineError> for CollectorError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config(msg) => Self::Config(msg),
            other => Self::Pipeline(other),
        }
    }
}

impl From<std::env::VarError> for CollectorError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
