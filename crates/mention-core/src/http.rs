//! 외부 읽기 API용 HTTP 클라이언트.
//!
//! 호출마다 명시적 타임아웃을 적용하고, 응답 상태를 파이프라인 에러 분류로
//! 변환합니다:
//!
//! | 상태 | 에러 |
//! |------|------|
//! | 429 | `RateLimited` |
//! | 5xx, 타임아웃, 연결 실패 | `TransientNetwork` |
//! | 기타 비-2xx | `Http` |

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::{PipelineError, PipelineResult};

/// 기본 요청 타임아웃.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// 기본 User-Agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MentionTracker/1.0)";

/// 텍스트 응답을 반환하는 GET 전용 클라이언트.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(user_agent: &str, timeout: Duration) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { client })
    }

    /// 기본 설정으로 생성합니다.
    pub fn with_defaults() -> PipelineResult<Self> {
        Self::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// 쿼리 파라미터를 붙여 GET 요청 후 본문을 반환합니다. 비-2xx는 에러.
    pub async fn get_text(&self, url: &str, params: &[(&str, String)]) -> PipelineResult<String> {
        let url = build_url(url, params)?;
        let (status, body) = self.send(url.clone()).await?;
        check_status(status, url.as_str())?;
        Ok(body)
    }

    /// 상태 코드와 본문을 그대로 반환합니다.
    ///
    /// 에러 응답 본문에 구조화된 에러가 담기는 API에 사용합니다.
    pub async fn get_raw(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> PipelineResult<(StatusCode, String)> {
        self.send(build_url(url, params)?).await
    }

    async fn send(&self, url: Url) -> PipelineResult<(StatusCode, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;
        Ok((status, body))
    }
}

fn build_url(url: &str, params: &[(&str, String)]) -> PipelineResult<Url> {
    let parsed = if params.is_empty() {
        Url::parse(url)
    } else {
        Url::parse_with_params(url, params)
    };
    parsed.map_err(|e| PipelineError::Config(format!("잘못된 URL ({}): {}", url, e)))
}

/// HTTP 상태를 에러로 변환합니다. 2xx는 `Ok`.
pub fn check_status(status: StatusCode, url: &str) -> PipelineResult<()> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Err(PipelineError::RateLimited(url.to_string()))
    } else if status.is_server_error() {
        Err(PipelineError::TransientNetwork(format!("{} ({})", status, url)))
    } else {
        Err(PipelineError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

fn classify_transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_decode() {
        PipelineError::MalformedResponse(err.to_string())
    } else {
        // 타임아웃, 연결 실패, 본문 수신 중단은 모두 일시적 장애로 본다
        PipelineError::TransientNetwork(err.to_string())
    }
}
