use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub message_id: i64,
    #[serde(rename = "name")]
    pub file_name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(rename = "url")]
    pub file_path: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_user: bool,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub message_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
}
