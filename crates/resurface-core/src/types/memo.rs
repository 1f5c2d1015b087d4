//! Memo and identity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::error::{ResurfaceError, ResurfaceResult};

/// Resource-name prefix for memos (`memos/{id}`).
pub const MEMO_NAME_PREFIX: &str = "memos/";

/// Identifier of a user (memo owner / reviewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ResurfaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: i32 = s
            .trim()
            .parse()
            .map_err(|_| ResurfaceError::parse(format!("invalid user id '{}'", s)))?;
        if id <= 0 {
            return Err(ResurfaceError::parse(format!("invalid user id '{}'", s)));
        }
        Ok(UserId(id))
    }
}

/// Identifier of a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoId(pub i32);

impl MemoId {
    /// Resource name of this memo (`memos/{id}`).
    pub fn name(&self) -> String {
        format!("{}{}", MEMO_NAME_PREFIX, self.0)
    }
}

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a memo resource name (`memos/{id}`) into its id.
///
/// # Example
///
/// ```
/// use resurface_core::types::{parse_memo_name, MemoId};
///
/// assert_eq!(parse_memo_name("memos/17").unwrap(), MemoId(17));
/// assert!(parse_memo_name("memos/abc").is_err());
/// assert!(parse_memo_name("17").is_err());
/// ```
pub fn parse_memo_name(name: &str) -> ResurfaceResult<MemoId> {
    let raw = name
        .strip_prefix(MEMO_NAME_PREFIX)
        .ok_or_else(|| ResurfaceError::invalid_name(format!("invalid memo name '{}'", name)))?;
    let id: i32 = raw
        .parse()
        .map_err(|_| ResurfaceError::invalid_name(format!("invalid memo id in '{}'", name)))?;
    Ok(MemoId(id))
}

/// Row status of a memo. Only `Normal` memos are ever resurfaced.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoStatus {
    #[default]
    Normal,
    Archived,
}

/// A memo as seen by the review engine.
///
/// `content` is `None` when the memo was loaded from a content-free snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub id: MemoId,
    pub creator_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub status: MemoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Memo {
    /// Resource name of this memo.
    pub fn name(&self) -> String {
        self.id.name()
    }

    /// Whether the memo carries at least one of `tags`.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Data required to create a memo.
#[derive(Debug, Clone)]
pub struct NewMemo {
    pub creator_id: UserId,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl NewMemo {
    pub fn new(creator_id: UserId, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            creator_id,
            content: content.into(),
            tags: Vec::new(),
            created_at,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Query over a user's memos.
#[derive(Debug, Clone, Default)]
pub struct MemoFilter {
    pub creator_id: Option<UserId>,
    pub status: Option<MemoStatus>,
    /// When non-empty, a memo must carry at least one of these tags.
    pub tags_any: Vec<String>,
    pub include_content: bool,
    /// Return rows in random order.
    pub random: bool,
    pub limit: Option<usize>,
}

impl MemoFilter {
    /// Normal memos owned by `user`, without content.
    pub fn snapshot(user: UserId) -> Self {
        Self {
            creator_id: Some(user),
            status: Some(MemoStatus::Normal),
            ..Default::default()
        }
    }

    pub fn with_content(mut self) -> Self {
        self.include_content = true;
        self
    }

    pub fn with_tags_any(mut self, tags: Vec<String>) -> Self {
        self.tags_any = tags;
        self
    }

    pub fn random_one(mut self) -> Self {
        self.random = true;
        self.limit = Some(1);
        self
    }
}
