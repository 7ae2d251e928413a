use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::{
    dto::{
        chat_dto::{
            ChatListResponse, ChatResponse, CreateChatRequest, DeleteChatQuery, RenameChatRequest,
        },
        SuccessResponse,
    },
    error::{Error, Result},
    utils::{telegram_auth::VerifiedTelegramUser, validation::normalize_title},
    AppState,
};

pub const DEFAULT_CHAT_TITLE: &str = "New chat";

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
) -> Result<Json<ChatListResponse>> {
    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    let chats = state.chat_service.list_for_user(user.id).await?;
    Ok(Json(ChatListResponse {
        chats,
        success: true,
    }))
}

pub async fn create_chat(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<Json<ChatResponse>> {
    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    let title = normalize_title(payload.title.as_deref(), DEFAULT_CHAT_TITLE);
    let chat = state.chat_service.create(user.id, &title).await?;
    tracing::info!(user_id = user.id, chat_id = chat.id, "Chat created");
    Ok(Json(ChatResponse {
        chat,
        success: true,
    }))
}

pub async fn rename_chat(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Json(payload): Json<RenameChatRequest>,
) -> Result<Json<SuccessResponse>> {
    let (Some(chat_id), Some(title)) = (payload.chat_id, payload.title.as_deref()) else {
        return Err(Error::BadRequest("chatId and title are required".into()));
    };
    if title.trim().is_empty() {
        return Err(Error::BadRequest("chatId and title are required".into()));
    }

    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    if state.chat_service.get(chat_id, user.id).await?.is_none() {
        return Err(Error::NotFound("Chat not found".into()));
    }

    let title = normalize_title(Some(title), DEFAULT_CHAT_TITLE);
    state.chat_service.rename(chat_id, user.id, &title).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Query(query): Query<DeleteChatQuery>,
) -> Result<Json<SuccessResponse>> {
    let chat_id = query
        .chat_id
        .ok_or_else(|| Error::BadRequest("chatId is required".into()))?;

    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    if !state.chat_service.delete(chat_id, user.id).await? {
        return Err(Error::NotFound("Chat not found".into()));
    }
    tracing::info!(user_id = user.id, chat_id, "Chat deleted");
    Ok(Json(SuccessResponse::ok()))
}
