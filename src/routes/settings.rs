use axum::{extract::State, Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::{
    dto::settings_dto::{SettingsResponse, UpdateSettingsRequest, UpdateSettingsResponse},
    error::Result,
    models::settings::{UserSettings, DEFAULT_SYSTEM_PROMPT},
    utils::{telegram_auth::VerifiedTelegramUser, validation::validate},
    AppState,
};

fn default_user_settings() -> JsonValue {
    json!({
        "themeDark": false,
        "notifications": true,
        "defaultSystemPrompt": DEFAULT_SYSTEM_PROMPT,
    })
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
) -> Result<Json<SettingsResponse>> {
    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    let ai_settings = state.settings_service.get_ai_settings(user.id).await?;
    let usage = state.usage_service.get(user.id).await?;

    Ok(Json(SettingsResponse {
        user_settings: user
            .settings
            .filter(|s| !s.is_null())
            .unwrap_or_else(default_user_settings),
        ai_settings,
        usage,
        success: true,
    }))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<UpdateSettingsResponse>> {
    if let Some(update) = &payload.ai_settings {
        validate(update)?;
    }

    let user = state.user_service.require_by_telegram_id(tg.id).await?;

    let mut user_settings_updated = false;
    if let Some(raw) = payload.user_settings.as_ref().filter(|v| !v.is_null()) {
        let settings = UserSettings::from_loose(raw);
        user_settings_updated = state
            .user_service
            .update_settings(user.id, &serde_json::to_value(&settings)?)
            .await?;
    }

    let mut ai_settings_updated = false;
    if let Some(update) = &payload.ai_settings {
        ai_settings_updated = state
            .settings_service
            .update_ai_settings(user.id, update)
            .await?;
    }

    Ok(Json(UpdateSettingsResponse {
        user_settings_updated,
        ai_settings_updated,
        success: user_settings_updated || ai_settings_updated,
    }))
}
