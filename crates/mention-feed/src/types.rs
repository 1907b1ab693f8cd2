//! 포럼 게시글/댓글 타입.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mention_core::{ContentItem, ContentSource, PipelineError};

/// 게시글 ID 접두사.
pub const POST_PREFIX: &str = "t3_";
/// 댓글 ID 접두사.
pub const COMMENT_PREFIX: &str = "t1_";

/// 포럼 게시글.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumPost {
    /// 접두사 없는 게시글 ID
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub num_comments: u32,
    pub permalink: String,
}

impl ForumPost {
    /// 접두사가 붙은 전역 ID (`t3_...`).
    pub fn fullname(&self) -> String {
        format!("{}{}", POST_PREFIX, self.id)
    }

    /// 수집 단위로 변환합니다. 본문은 `제목 + " " + 본문`.
    pub fn to_content_item(&self) -> ContentItem {
        ContentItem {
            external_id: self.fullname(),
            author: self.author.clone(),
            body: format!("{} {}", self.title, self.selftext),
            created_at: self.created_at,
            source: ContentSource::Reddit,
            parent_id: None,
        }
    }
}

/// 포럼 댓글.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumComment {
    /// 접두사 없는 댓글 ID
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// 부모의 전역 ID (`t3_...` 또는 `t1_...`)
    pub parent_id: String,
}

impl ForumComment {
    /// 접두사가 붙은 전역 ID (`t1_...`).
    pub fn fullname(&self) -> String {
        format!("{}{}", COMMENT_PREFIX, self.id)
    }

    pub fn to_content_item(&self) -> ContentItem {
        ContentItem {
            external_id: self.fullname(),
            author: self.author.clone(),
            body: self.body.clone(),
            created_at: self.created_at,
            source: ContentSource::Reddit,
            parent_id: Some(self.parent_id.clone()).filter(|p| !p.is_empty()),
        }
    }
}

/// 목록 한 페이지.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// 최신순 게시글
    pub posts: Vec<ForumPost>,
    /// 다음 페이지 커서. 없으면 마지막 페이지
    pub after: Option<String>,
}

/// 평탄화된 댓글 묶음과 아직 펼치지 않은 자리표시자 ID.
#[derive(Debug, Clone, Default)]
pub struct CommentBatch {
    pub comments: Vec<ForumComment>,
    /// "more" 자리표시자가 가리키는 댓글 ID (접두사 없음)
    pub placeholders: Vec<String>,
    /// 깊이 제한으로 잘린 답글 수
    pub truncated: usize,
    /// 디코딩 실패로 건너뛴 항목 수
    pub malformed: usize,
}

/// 댓글 정렬 순서.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentSort {
    Confidence,
    New,
    Top,
}

impl CommentSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentSort::Confidence => "confidence",
            CommentSort::New => "new",
            CommentSort::Top => "top",
        }
    }
}

impl fmt::Display for CommentSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentSort {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confidence" | "best" => Ok(CommentSort::Confidence),
            "new" => Ok(CommentSort::New),
            "top" => Ok(CommentSort::Top),
            other => Err(PipelineError::Config(format!(
                "알 수 없는 댓글 정렬: {}",
                other
            ))),
        }
    }
}
