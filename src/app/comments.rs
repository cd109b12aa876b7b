use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::engagement::Comment;
use crate::infra::db::Db;

/// A comment stops being editable this long after creation. Deletion
/// is not time-limited.
pub const EDIT_WINDOW: Duration = Duration::minutes(60);

pub fn is_editable(created_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    now - created_at <= EDIT_WINDOW
}

/// Ownership and age of a comment, fetched for authorization checks.
#[derive(Debug, Clone, Copy)]
pub struct CommentMeta {
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Returns None when the target post does not exist.
    pub async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO comments (user_id, post_id, content) \
                SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM posts WHERE id = $2) \
                RETURNING id, user_id, post_id, content, created_at, updated_at \
             ) \
             SELECT c.id, c.user_id, c.post_id, u.username, c.content, \
                    c.created_at, c.updated_at \
             FROM inserted c \
             JOIN users u ON u.id = c.user_id",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| read_comment(&row)))
    }

    pub async fn list_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.user_id, c.post_id, u.username, c.content, \
                    c.created_at, c.updated_at \
             FROM comments c \
             JOIN users u ON u.id = c.user_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at DESC, c.id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_comment).collect())
    }

    pub async fn count_comments(&self, post_id: Uuid) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT count(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(total)
    }

    pub async fn comment_meta(&self, comment_id: Uuid) -> Result<Option<CommentMeta>> {
        let row = sqlx::query("SELECT user_id, created_at FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| CommentMeta {
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn update_comment(&self, comment_id: Uuid, content: String) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "WITH updated AS ( \
                UPDATE comments \
                SET content = $2, updated_at = now() \
                WHERE id = $1 \
                RETURNING id, user_id, post_id, content, created_at, updated_at \
             ) \
             SELECT c.id, c.user_id, c.post_id, u.username, c.content, \
                    c.created_at, c.updated_at \
             FROM updated c \
             JOIN users u ON u.id = c.user_id",
        )
        .bind(comment_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| read_comment(&row)))
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn read_comment(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        post_id: row.get("post_id"),
        username: row.get("username"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
