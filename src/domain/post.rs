use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A post as returned to clients, including the derived engagement
/// counts and the viewer-relative flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub title: String,
    pub content: String,
    /// Count of active likes on the post.
    #[serde(rename = "likes")]
    pub like_count: i64,
    #[serde(rename = "comments")]
    pub comment_count: i64,
    /// Whether the viewer currently has an active like on the post.
    pub is_liked: bool,
    /// Whether the viewer owns the post. Gates edit/delete affordances
    /// in clients, not read access.
    pub is_accessible: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
