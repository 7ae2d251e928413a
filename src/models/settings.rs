use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: i32 = 1000;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Claude, a helpful, safe and honest AI assistant created by Anthropic. Always answer politely, in the same language the question was asked in.";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiSettings {
    pub id: i64,
    pub user_id: i64,
    pub temperature: f64,
    pub max_tokens: i32,
    pub model: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UI preferences stored as JSON on the user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub theme_dark: bool,
    pub notifications: bool,
    pub default_system_prompt: String,
    pub temperature: f64,
    pub max_tokens: i64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme_dark: false,
            notifications: true,
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: i64::from(DEFAULT_MAX_TOKENS),
        }
    }
}

impl UserSettings {
    /// Builds settings from loosely typed client input. Any field with the
    /// wrong type falls back to its default.
    pub fn from_loose(value: &serde_json::Value) -> Self {
        let defaults = Self::default();
        Self {
            theme_dark: value
                .get("themeDark")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.theme_dark),
            notifications: value
                .get("notifications")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.notifications),
            default_system_prompt: value
                .get("defaultSystemPrompt")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or(defaults.default_system_prompt),
            temperature: value
                .get("temperature")
                .and_then(|v| v.as_f64())
                .unwrap_or(defaults.temperature),
            max_tokens: value
                .get("maxTokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(defaults.max_tokens),
        }
    }
}
