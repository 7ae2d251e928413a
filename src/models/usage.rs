use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageStats {
    pub id: i64,
    pub user_id: i64,
    pub total_messages: i64,
    pub total_tokens: i64,
    pub total_files: i64,
    pub total_sessions: i64,
    pub last_session_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Increments applied after one request/response exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageDelta {
    pub messages: i64,
    pub tokens: i64,
    pub files: i64,
}
