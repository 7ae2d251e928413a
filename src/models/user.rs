use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::telegram_auth::VerifiedTelegramUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub is_premium: bool,
    pub settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

/// Profile fields copied from a verified Telegram identity.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub is_premium: bool,
}

impl From<&VerifiedTelegramUser> for UserProfile {
    fn from(tg: &VerifiedTelegramUser) -> Self {
        Self {
            telegram_id: tg.id,
            username: tg.username.clone(),
            first_name: tg.first_name.clone(),
            last_name: tg.last_name.clone(),
            photo_url: tg.photo_url.clone(),
            auth_date: tg.auth_date.parse().unwrap_or_default(),
            is_premium: tg.is_premium.unwrap_or(false),
        }
    }
}
