use axum::{extract::State, Extension, Json};

use crate::{
    dto::auth_dto::{AuthResponse, AuthUser},
    error::Result,
    models::user::UserProfile,
    utils::telegram_auth::VerifiedTelegramUser,
    AppState,
};

/// Registers the Telegram user on first visit and refreshes the profile on
/// later ones.
pub async fn authenticate(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
) -> Result<Json<AuthResponse>> {
    let profile = UserProfile::from(&tg);

    let user_id = match state.user_service.find_by_telegram_id(tg.id).await? {
        Some(existing) => {
            state.user_service.update(existing.id, &profile).await?;
            existing.id
        }
        None => state.user_service.create(&profile).await?,
    };

    let ai_settings = match state.settings_service.get_ai_settings(user_id).await? {
        Some(settings) => settings,
        None => state.settings_service.create_default_ai_settings(user_id).await?,
    };
    let user = state.user_service.require_by_telegram_id(tg.id).await?;

    Ok(Json(AuthResponse {
        user: AuthUser::new(user, ai_settings),
        success: true,
    }))
}
