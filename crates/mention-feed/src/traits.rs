//! 포럼 API trait 정의.

use async_trait::async_trait;
use mention_core::PipelineResult;

use crate::types::{CommentBatch, CommentSort, ListingPage};

/// 포럼 읽기 API.
///
/// 구현체는 요청 하나를 보내고 결과를 디코딩하는 것까지만 책임집니다.
/// 페이지 순회, 재시도, 딜레이, 중복 제거는 크롤러가 담당합니다.
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// 피드 이름.
    fn name(&self) -> &str;

    /// 소스의 최신순 게시글 한 페이지를 조회합니다.
    async fn fetch_listing(&self, source: &str, after: Option<&str>) -> PipelineResult<ListingPage>;

    /// 게시글의 댓글 트리를 지정한 정렬로 조회합니다 (평탄화됨).
    async fn fetch_comments(
        &self,
        source: &str,
        post_id: &str,
        sort: CommentSort,
    ) -> PipelineResult<CommentBatch>;

    /// 자리표시자 ID 묶음을 실제 댓글로 확장합니다.
    async fn expand_placeholders(&self, post_id: &str, ids: &[String])
        -> PipelineResult<CommentBatch>;
}
