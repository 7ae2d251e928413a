use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::settings::AiSettings;
use crate::models::usage::UsageStats;
use crate::services::settings_service::AiSettingsUpdate;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub user_settings: JsonValue,
    pub ai_settings: Option<AiSettings>,
    pub usage: Option<UsageStats>,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub user_settings: Option<JsonValue>,
    pub ai_settings: Option<AiSettingsUpdate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsResponse {
    pub user_settings_updated: bool,
    pub ai_settings_updated: bool,
    pub success: bool,
}
