use std::collections::HashMap;

use sqlx::PgPool;

use crate::error::Result;
use crate::models::message::{Attachment, CreateAttachment, CreateMessage, Message};

#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a message and bumps the chat's `updated_at`.
    pub async fn create(&self, msg: CreateMessage) -> Result<Message> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, user_id, content, is_user)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(msg.chat_id)
        .bind(msg.user_id)
        .bind(&msg.content)
        .bind(msg.is_user)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(msg.chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    pub async fn save_attachment(&self, attachment: CreateAttachment) -> Result<Attachment> {
        let saved = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO message_files (message_id, file_name, file_path, file_type, file_size)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(attachment.message_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_path)
        .bind(&attachment.file_type)
        .bind(attachment.file_size)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    /// Messages of a chat in chronological order, with their attachments.
    pub async fn list_for_chat(&self, chat_id: i64, user_id: i64) -> Result<Vec<Message>> {
        let mut messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE chat_id = $1 AND user_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if messages.is_empty() {
            return Ok(messages);
        }

        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM message_files WHERE message_id = ANY($1) ORDER BY id ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        attach_files(&mut messages, attachments);
        Ok(messages)
    }
}

fn attach_files(messages: &mut [Message], attachments: Vec<Attachment>) {
    let mut by_message: HashMap<i64, Vec<Attachment>> = HashMap::new();
    for attachment in attachments {
        by_message
            .entry(attachment.message_id)
            .or_default()
            .push(attachment);
    }
    for message in messages.iter_mut() {
        if let Some(files) = by_message.remove(&message.id) {
            message.attachments = files;
        }
    }
}
