//! Reddit 공개 JSON API 클라이언트.
//!
//! 인증 없이 읽기 전용 엔드포인트만 사용합니다:
//! - `/r/{source}/new.json`: 최신순 게시글 목록
//! - `/r/{source}/comments/{id}.json`: 게시글 댓글 트리
//! - `/api/morechildren.json`: "more" 자리표시자 확장
//!
//! 호출 하나는 요청 하나입니다. 재시도와 요청 간 딜레이는 [`crate::ForumCrawler`]가 담당합니다.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use mention_core::{HttpClient, PipelineResult};

use crate::traits::ForumApi;
use crate::types::{CommentBatch, CommentSort, ListingPage};

/// Reddit 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    /// API 기본 URL
    pub base_url: String,
    /// User-Agent (Reddit은 기본 UA를 차단함)
    pub user_agent: String,
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 목록 페이지 크기 (최대 100)
    pub page_limit: u32,
    /// 댓글 페이지 요청 개수
    pub comment_limit: u32,
    /// 댓글 트리 최대 깊이
    pub max_depth: usize,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            user_agent: mention_core::http::DEFAULT_USER_AGENT.to_string(),
            timeout: mention_core::http::DEFAULT_TIMEOUT,
            page_limit: 100,
            comment_limit: 500,
            max_depth: 100,
        }
    }
}

impl RedditConfig {
    /// 기본 URL을 지정합니다 (테스트용 목 서버 등).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Reddit 공개 API 클라이언트.
pub struct RedditClient {
    config: RedditConfig,
    http: HttpClient,
}

impl RedditClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(config: RedditConfig) -> PipelineResult<Self> {
        let http = HttpClient::new(&config.user_agent, config.timeout)?;
        Ok(Self { config, http })
    }

    /// 기본 설정으로 생성합니다.
    pub fn with_defaults() -> PipelineResult<Self> {
        Self::new(RedditConfig::default())
    }

    pub fn config(&self) -> &RedditConfig {
        &self.config
    }
}

#[async_trait]
impl ForumApi for RedditClient {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch_listing(&self, source: &str, after: Option<&str>) -> PipelineResult<ListingPage> {
        let url = format!("{}/r/{}/new.json", self.config.base_url, source);
        let mut params = vec![("limit", self.config.page_limit.to_string())];
        if let Some(after) = after {
            params.push(("after", after.to_string()));
        }

        let body = self.http.get_text(&url, &params).await?;
        let page = wire::decode_listing(&body)?;

        debug!(
            source,
            posts = page.posts.len(),
            has_next = page.after.is_some(),
            "목록 페이지 수신"
        );
        Ok(page)
    }

    async fn fetch_comments(
        &self,
        source: &str,
        post_id: &str,
        sort: CommentSort,
    ) -> PipelineResult<CommentBatch> {
        let url = format!(
            "{}/r/{}/comments/{}.json",
            self.config.base_url, source, post_id
        );
        let params = [
            ("limit", self.config.comment_limit.to_string()),
            ("depth", self.config.max_depth.to_string()),
            ("sort", sort.as_str().to_string()),
        ];

        let body = self.http.get_text(&url, &params).await?;
        let batch = wire::decode_comment_page(&body, self.config.max_depth)?;

        debug!(
            post_id,
            sort = %sort,
            comments = batch.comments.len(),
            placeholders = batch.placeholders.len(),
            "댓글 페이지 수신"
        );
        Ok(batch)
    }

    async fn expand_placeholders(
        &self,
        post_id: &str,
        ids: &[String],
    ) -> PipelineResult<CommentBatch> {
        if ids.is_empty() {
            return Ok(CommentBatch::default());
        }

        let url = format!("{}/api/morechildren.json", self.config.base_url);
        let params = [
            ("api_type", "json".to_string()),
            ("link_id", format!("{}{}", crate::types::POST_PREFIX, post_id)),
            ("children", ids.join(",")),
            ("limit_children", "false".to_string()),
        ];

        let body = self.http.get_text(&url, &params).await?;
        wire::decode_more_children(&body, self.config.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mention_core::PipelineError;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> RedditClient {
        RedditClient::new(RedditConfig::default().with_base_url(server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_listing_with_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/r/wallstreetbets/new.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("after".into(), "t3_prev".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"kind":"Listing","data":{"after":"t3_p2","children":[
                    {"kind":"t3","data":{"id":"p1","title":"GME","selftext":"",
                     "author":"alice","created_utc":1709294400,"num_comments":2,"permalink":"/p1"}}
                ]}}"#,
            )
            .create_async()
            .await;

        let page = client_for(&server)
            .fetch_listing("wallstreetbets", Some("t3_prev"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.after.as_deref(), Some("t3_p2"));
    }

    #[tokio::test]
    async fn test_rate_limited_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/r/stocks/new.json")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let result = client_for(&server).fetch_listing("stocks", None).await;
        assert!(matches!(result, Err(PipelineError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_fetch_comments_sort_param() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/r/stocks/comments/p1.json")
            .match_query(Matcher::UrlEncoded("sort".into(), "top".into()))
            .with_status(200)
            .with_body(
                r#"[{"kind":"Listing","data":{"children":[]}},
                    {"kind":"Listing","data":{"children":[
                      {"kind":"t1","data":{"id":"c1","author":"bob","body":"TSLA",
                       "created_utc":1709294500,"parent_id":"t3_p1","replies":""}},
                      {"kind":"more","data":{"children":["c2","c3"]}}
                    ]}}]"#,
            )
            .create_async()
            .await;

        let batch = client_for(&server)
            .fetch_comments("stocks", "p1", CommentSort::Top)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(batch.comments.len(), 1);
        assert_eq!(batch.placeholders, vec!["c2", "c3"]);
    }

    #[tokio::test]
    async fn test_expand_placeholders_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/morechildren.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("link_id".into(), "t3_p1".into()),
                Matcher::UrlEncoded("children".into(), "c2,c3".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"json":{"errors":[],"data":{"things":[
                    {"kind":"t1","data":{"id":"c2","author":"carol","body":"AMD",
                     "created_utc":1709294600,"parent_id":"t1_c1"}}
                ]}}}"#,
            )
            .create_async()
            .await;

        let ids = vec!["c2".to_string(), "c3".to_string()];
        let batch = client_for(&server)
            .expand_placeholders("p1", &ids)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(batch.comments.len(), 1);
        assert_eq!(batch.comments[0].id, "c2");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/r/stocks/comments/p1.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = client_for(&server)
            .fetch_comments("stocks", "p1", CommentSort::New)
            .await;
        assert!(matches!(result, Err(PipelineError::TransientNetwork(_))));
    }
}
