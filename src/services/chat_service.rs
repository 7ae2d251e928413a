use sqlx::PgPool;

use crate::error::Result;
use crate::models::chat::Chat;

#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
}

impl ChatService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Chat>> {
        let chats = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE user_id = $1 ORDER BY updated_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chats)
    }

    /// Returns the chat only when it belongs to `user_id`.
    pub async fn get(&self, chat_id: i64, user_id: i64) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    pub async fn create(&self, user_id: i64, title: &str) -> Result<Chat> {
        let chat = sqlx::query_as::<_, Chat>(
            "INSERT INTO chats (user_id, title) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(chat)
    }

    pub async fn rename(&self, chat_id: i64, user_id: i64, title: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE chats SET title = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3",
        )
        .bind(title)
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, chat_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
