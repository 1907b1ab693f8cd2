//! 게시글/댓글 및 작성자 타입.
//!
//! - `ContentItem` - 크롤러가 생산하고 코디네이터가 소비하는 콘텐츠 단위
//! - `ContentRecord` - 저장된 콘텐츠 레코드
//! - `User` - 작성자

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 삭제된 작성자를 나타내는 포럼 표기.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// 콘텐츠 출처 태그.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Reddit 게시글/댓글
    Reddit,
}

impl ContentSource {
    /// 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Reddit => "reddit",
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reddit" => Ok(Self::Reddit),
            _ => Err(format!("Unknown content source: {}", s)),
        }
    }
}

/// 수집 대상 콘텐츠 (게시글 또는 댓글).
///
/// 최초 발견 시 한 번 생성되며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// 출처 내 고유 ID (게시글 `t3_`, 댓글 `t1_` 접두사)
    pub external_id: String,
    /// 작성자 이름
    pub author: String,
    /// 본문 (게시글은 제목 + 본문)
    pub body: String,
    /// 작성 시각
    pub created_at: DateTime<Utc>,
    /// 출처
    pub source: ContentSource,
    /// 부모 ID (답글인 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl ContentItem {
    /// 수집 가능한 작성자인지 확인합니다.
    ///
    /// 빈 이름과 삭제된 작성자는 수집하지 않습니다.
    pub fn has_author(&self) -> bool {
        !self.author.is_empty() && self.author != DELETED_AUTHOR
    }
}

/// 작성자.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// 새 콘텐츠 레코드 삽입용.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub user_id: i64,
    pub source: ContentSource,
    pub external_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// 저장된 콘텐츠 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub user_id: i64,
    pub source: ContentSource,
    pub external_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(author: &str) -> ContentItem {
        ContentItem {
            external_id: "t1_abc".to_string(),
            author: author.to_string(),
            body: "GME".to_string(),
            created_at: Utc::now(),
            source: ContentSource::Reddit,
            parent_id: None,
        }
    }

    #[test]
    fn test_has_author() {
        assert!(item("roaring_kitty").has_author());
        assert!(!item("").has_author());
        assert!(!item(DELETED_AUTHOR).has_author());
    }

    #[test]
    fn test_source_round_trip() {
        assert_eq!("reddit".parse::<ContentSource>().unwrap(), ContentSource::Reddit);
        assert_eq!(ContentSource::Reddit.to_string(), "reddit");
        assert!("twitter".parse::<ContentSource>().is_err());
    }
}
