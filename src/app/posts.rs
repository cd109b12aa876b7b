use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

// Shared projection: every post read carries the author username, the
// live engagement counts and the viewer-relative flags ($1 = viewer).
const POST_COLUMNS: &str = "p.id, p.user_id, u.username, p.title, p.content, \
     p.created_at, p.updated_at, \
     (SELECT count(*) FROM likes l WHERE l.post_id = p.id AND l.is_active) AS like_count, \
     (SELECT count(*) FROM comments c WHERE c.post_id = p.id) AS comment_count, \
     EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = $1 AND l.is_active) AS is_liked, \
     (p.user_id = $1) AS is_accessible";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, owner_id: Uuid, title: String, content: String) -> Result<Post> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO posts (user_id, title, content) \
                VALUES ($1, $2, $3) \
                RETURNING id, user_id, title, content, created_at, updated_at \
             ) \
             SELECT p.id, p.user_id, u.username, p.title, p.content, \
                    p.created_at, p.updated_at, \
                    0::bigint AS like_count, 0::bigint AS comment_count, \
                    false AS is_liked, true AS is_accessible \
             FROM inserted p \
             JOIN users u ON u.id = p.user_id",
        )
        .bind(owner_id)
        .bind(title)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(read_post(&row))
    }

    pub async fn get_post(&self, post_id: Uuid, viewer_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             JOIN users u ON u.id = p.user_id \
             WHERE p.id = $2",
        ))
        .bind(viewer_id)
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| read_post(&row)))
    }

    /// Owner lookup used by the handlers for authorization checks.
    pub async fn post_owner(&self, post_id: Uuid) -> Result<Option<Uuid>> {
        let owner = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(owner)
    }

    /// Update title and/or content. Omitted fields keep their prior
    /// value; the owner never changes.
    pub async fn update_post(
        &self,
        post_id: Uuid,
        viewer_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(
            "WITH updated AS ( \
                UPDATE posts \
                SET title = COALESCE($3, title), \
                    content = COALESCE($4, content), \
                    updated_at = now() \
                WHERE id = $2 \
                RETURNING id, user_id, title, content, created_at, updated_at \
             ) \
             SELECT p.id, p.user_id, u.username, p.title, p.content, \
                    p.created_at, p.updated_at, \
                    (SELECT count(*) FROM likes l WHERE l.post_id = p.id AND l.is_active) AS like_count, \
                    (SELECT count(*) FROM comments c WHERE c.post_id = p.id) AS comment_count, \
                    EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = $1 AND l.is_active) AS is_liked, \
                    (p.user_id = $1) AS is_accessible \
             FROM updated p \
             JOIN users u ON u.id = p.user_id",
        )
        .bind(viewer_id)
        .bind(post_id)
        .bind(title)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| read_post(&row)))
    }

    /// Delete a post and everything hanging off it. The three deletes
    /// run in one transaction so a crash cannot leave orphaned rows.
    pub async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_posts(&self, viewer_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             JOIN users u ON u.id = p.user_id \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
        ))
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_post).collect())
    }

    pub async fn count_posts(&self) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT count(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        Ok(total)
    }

    pub async fn list_posts_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             JOIN users u ON u.id = p.user_id \
             WHERE p.user_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_post).collect())
    }

    pub async fn count_posts_by_owner(&self, owner_id: Uuid) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT count(*) FROM posts WHERE user_id = $1")
            .bind(owner_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(total)
    }
}

fn read_post(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        title: row.get("title"),
        content: row.get("content"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        is_liked: row.get("is_liked"),
        is_accessible: row.get("is_accessible"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
