use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::models::settings::AiSettings;
use crate::models::user::User;

#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_premium: bool,
    pub settings: JsonValue,
    #[serde(rename = "aiSettings")]
    pub ai_settings: AiSettings,
}

impl AuthUser {
    pub fn new(user: User, ai_settings: AiSettings) -> Self {
        Self {
            id: user.id,
            telegram_id: user.telegram_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            photo_url: user.photo_url,
            is_premium: user.is_premium,
            settings: user
                .settings
                .filter(|s| !s.is_null())
                .unwrap_or_else(|| json!({ "themeDark": false, "notifications": true })),
            ai_settings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub success: bool,
}
