use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::engagement::{Like, LikeState};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct LikeService {
    db: Db,
}

impl LikeService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Atomic toggle keyed on the (user, post) unique index: a first
    /// call inserts an active like, every later call flips is_active.
    /// Concurrent identical requests cannot create duplicate rows.
    pub async fn toggle(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeState> {
        let row = sqlx::query(
            "INSERT INTO likes (user_id, post_id, is_active) \
             VALUES ($1, $2, true) \
             ON CONFLICT (user_id, post_id) \
             DO UPDATE SET is_active = NOT likes.is_active \
             RETURNING id, is_active, created_at",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(LikeState {
            id: row.get("id"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        })
    }

    /// Active likes only, newest first.
    pub async fn list_likes(&self, post_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Like>> {
        let rows = sqlx::query(
            "SELECT l.id, l.user_id, l.post_id, u.username, l.is_active, l.created_at \
             FROM likes l \
             JOIN users u ON u.id = l.user_id \
             WHERE l.post_id = $1 AND l.is_active \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        let likes = rows
            .iter()
            .map(|row| Like {
                id: row.get("id"),
                user_id: row.get("user_id"),
                post_id: row.get("post_id"),
                username: row.get("username"),
                is_active: row.get("is_active"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(likes)
    }

    pub async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let total =
            sqlx::query_scalar("SELECT count(*) FROM likes WHERE post_id = $1 AND is_active")
                .bind(post_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(total)
    }
}
