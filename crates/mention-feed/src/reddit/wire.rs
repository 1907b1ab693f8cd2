//! Reddit JSON 응답 디코딩.
//!
//! 댓글 트리는 임의 깊이로 중첩되므로, 본문을 깊이 제한 없이 `Value`로 파싱한 뒤
//! 명시적 작업 목록으로 한 단계씩 디코딩합니다. 각 항목은 `kind` 태그에 따라
//! [`ThingNode`]로 분기하고, `replies` 필드는 빈 문자열 또는 하위 Listing입니다.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use mention_core::{PipelineError, PipelineResult};

use crate::types::{CommentBatch, ForumComment, ForumPost, ListingPage};

/// 깊이 제한 없이 JSON을 파싱합니다.
pub(crate) fn parse_json(body: &str) -> PipelineResult<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

// ============================================================================
// 원시 데이터 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    created_utc: f64,
    #[serde(default)]
    num_comments: u32,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    parent_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMore {
    #[serde(default)]
    children: Vec<String>,
}

/// 댓글의 `replies` 필드.
#[derive(Debug, Default)]
pub(crate) enum Replies {
    /// 빈 문자열, null, 또는 필드 없음
    #[default]
    None,
    /// 하위 Listing의 항목들
    Listing(Vec<Value>),
}

impl Replies {
    fn from_value(value: Option<Value>) -> Result<Self, String> {
        match value {
            None | Some(Value::Null) | Some(Value::String(_)) => Ok(Replies::None),
            Some(Value::Object(mut listing)) => match listing.remove("data") {
                Some(Value::Object(mut data)) => match data.remove("children") {
                    Some(Value::Array(children)) => Ok(Replies::Listing(children)),
                    None | Some(Value::Null) => Ok(Replies::None),
                    Some(_) => Err("replies.data.children가 배열이 아님".to_string()),
                },
                _ => Err("replies에 data 객체 없음".to_string()),
            },
            Some(_) => Err("알 수 없는 replies 형태".to_string()),
        }
    }
}

/// `kind` 태그로 분기된 항목.
#[derive(Debug)]
pub(crate) enum ThingNode {
    /// `t1`
    Comment { comment: RawComment, replies: Replies },
    /// `more`
    More(RawMore),
    /// 그 외 (게시글 등)
    Other(String),
}

impl ThingNode {
    pub(crate) fn decode(value: Value) -> Result<Self, String> {
        let Value::Object(mut thing) = value else {
            return Err("항목이 객체가 아님".to_string());
        };

        let kind = thing
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut data = match thing.remove("data") {
            Some(Value::Object(data)) => data,
            _ => return Err(format!("{} 항목에 data 없음", kind)),
        };

        match kind.as_str() {
            "t1" => {
                let replies = Replies::from_value(data.remove("replies"))?;
                let comment = decode_object::<RawComment>(data)?;
                Ok(ThingNode::Comment { comment, replies })
            }
            "more" => Ok(ThingNode::More(decode_object(data)?)),
            _ => Ok(ThingNode::Other(kind)),
        }
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(data: Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(data)).map_err(|e| e.to_string())
}

fn timestamp(created_utc: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(created_utc as i64, 0).single()
}

/// Listing 객체에서 `data.children` 배열을 꺼냅니다.
fn listing_children(listing: Value) -> PipelineResult<(Vec<Value>, Option<String>)> {
    let Value::Object(mut listing) = listing else {
        return Err(PipelineError::MalformedResponse(
            "Listing이 객체가 아님".to_string(),
        ));
    };

    let Some(Value::Object(mut data)) = listing.remove("data") else {
        return Err(PipelineError::MalformedResponse(
            "Listing에 data 없음".to_string(),
        ));
    };

    let after = data
        .get("after")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match data.remove("children") {
        Some(Value::Array(children)) => Ok((children, after)),
        None | Some(Value::Null) => Ok((Vec::new(), after)),
        Some(_) => Err(PipelineError::MalformedResponse(
            "Listing children가 배열이 아님".to_string(),
        )),
    }
}

// ============================================================================
// 응답 디코딩
// ============================================================================

/// 게시글 목록 응답을 디코딩합니다. 잘못된 항목은 건너뜁니다.
pub(crate) fn decode_listing(body: &str) -> PipelineResult<ListingPage> {
    let (children, after) = listing_children(parse_json(body)?)?;

    let mut posts = Vec::with_capacity(children.len());
    for child in children {
        let raw = match child {
            Value::Object(mut thing) => thing.remove("data"),
            _ => None,
        };

        let post = raw
            .ok_or_else(|| "data 없음".to_string())
            .and_then(|data| serde_json::from_value::<RawPost>(data).map_err(|e| e.to_string()))
            .and_then(|raw| {
                let created_at =
                    timestamp(raw.created_utc).ok_or_else(|| "잘못된 작성 시각".to_string())?;
                Ok(ForumPost {
                    id: raw.id,
                    title: raw.title,
                    selftext: raw.selftext,
                    author: raw.author,
                    created_at,
                    num_comments: raw.num_comments,
                    permalink: raw.permalink,
                })
            });

        match post {
            Ok(post) => posts.push(post),
            Err(reason) => debug!(reason = %reason, "잘못된 게시글 항목 건너뜀"),
        }
    }

    Ok(ListingPage { posts, after })
}

/// 댓글 페이지 응답 (`[게시글 Listing, 댓글 Listing]`)을 디코딩합니다.
pub(crate) fn decode_comment_page(body: &str, max_depth: usize) -> PipelineResult<CommentBatch> {
    let Value::Array(mut listings) = parse_json(body)? else {
        return Err(PipelineError::MalformedResponse(
            "댓글 응답이 배열이 아님".to_string(),
        ));
    };

    if listings.len() < 2 {
        return Err(PipelineError::MalformedResponse(format!(
            "댓글 응답 Listing 수 부족: {}",
            listings.len()
        )));
    }

    let (children, _) = listing_children(listings.swap_remove(1))?;
    Ok(flatten_things(children, max_depth))
}

/// morechildren 응답 (`{"json": {"data": {"things": [...]}}}`)을 디코딩합니다.
pub(crate) fn decode_more_children(body: &str, max_depth: usize) -> PipelineResult<CommentBatch> {
    let mut value = parse_json(body)?;

    if let Some(errors) = value.pointer("/json/errors").and_then(Value::as_array) {
        if let Some(first) = errors.first() {
            return Err(PipelineError::Api {
                code: "morechildren".to_string(),
                description: first.to_string(),
            });
        }
    }

    let things = match value.pointer_mut("/json/data/things").map(Value::take) {
        Some(Value::Array(things)) => things,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            return Err(PipelineError::MalformedResponse(
                "things가 배열이 아님".to_string(),
            ))
        }
    };

    Ok(flatten_things(things, max_depth))
}

/// 항목 트리를 깊이 우선으로 평탄화합니다.
///
/// 최상위 항목의 깊이는 0이며, `max_depth`를 넘는 답글은 버리고 개수만 셉니다.
pub(crate) fn flatten_things(roots: Vec<Value>, max_depth: usize) -> CommentBatch {
    let mut batch = CommentBatch::default();
    // 문서 순서를 유지하기 위해 역순으로 쌓는다
    let mut stack: Vec<(Value, usize)> = roots.into_iter().rev().map(|v| (v, 0)).collect();

    while let Some((value, depth)) = stack.pop() {
        match ThingNode::decode(value) {
            Ok(ThingNode::Comment { comment, replies }) => {
                if let Replies::Listing(children) = replies {
                    if depth < max_depth {
                        stack.extend(children.into_iter().rev().map(|v| (v, depth + 1)));
                    } else {
                        batch.truncated += children.len();
                    }
                }

                match timestamp(comment.created_utc) {
                    Some(created_at) => batch.comments.push(ForumComment {
                        id: comment.id,
                        author: comment.author,
                        body: comment.body,
                        created_at,
                        parent_id: comment.parent_id,
                    }),
                    None => batch.malformed += 1,
                }
            }
            Ok(ThingNode::More(more)) => batch.placeholders.extend(more.children),
            Ok(ThingNode::Other(kind)) => debug!(kind = %kind, "댓글 외 항목 무시"),
            Err(reason) => {
                debug!(reason = %reason, "잘못된 댓글 항목 건너뜀");
                batch.malformed += 1;
            }
        }
    }

    batch
}
