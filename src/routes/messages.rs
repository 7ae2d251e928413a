use std::path::{Path as FsPath, PathBuf};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    dto::message_dto::{MessageListResponse, SendMessageFailure, SendMessageResponse},
    error::{Error, Result},
    models::{
        message::{CreateAttachment, CreateMessage},
        usage::UsageDelta,
    },
    services::ai_service::{estimate_tokens, history_to_turns},
    utils::{telegram_auth::VerifiedTelegramUser, time::unix_millis},
    AppState,
};

pub const AI_FALLBACK_REPLY: &str = "Sorry, I can't answer right now. Please try again later.";
const MAX_FILE_NAME_LEN: usize = 100;

#[derive(Debug)]
struct UploadedFile {
    name: String,
    content_type: String,
    data: Bytes,
}

#[derive(Debug, Default)]
struct MessageForm {
    content: String,
    files: Vec<UploadedFile>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Path(chat_id): Path<i64>,
) -> Result<Json<MessageListResponse>> {
    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    if state.chat_service.get(chat_id, user.id).await?.is_none() {
        return Err(Error::NotFound("Chat not found".into()));
    }

    let messages = state.message_service.list_for_chat(chat_id, user.id).await?;
    Ok(Json(MessageListResponse {
        messages,
        success: true,
    }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Path(chat_id): Path<i64>,
    multipart: Multipart,
) -> Result<Response> {
    let form = read_form(multipart).await?;

    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    let chat = state
        .chat_service
        .get(chat_id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound("Chat not found".into()))?;

    if !form.files.is_empty()
        && !state
            .subscription_service
            .has_active_subscription(user.id)
            .await?
    {
        return Err(Error::Forbidden(
            "An active subscription is required to send files".into(),
        ));
    }

    let user_message = state
        .message_service
        .create(CreateMessage {
            chat_id: chat.id,
            user_id: user.id,
            content: form.content.clone(),
            is_user: true,
        })
        .await?;

    let file_count = form.files.len() as i64;
    if !form.files.is_empty() {
        let dir = PathBuf::from(&state.config.uploads_dir)
            .join(user.id.to_string())
            .join(chat.id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        for file in form.files {
            let stored_name = stored_file_name(&file.name);
            tokio::fs::write(dir.join(&stored_name), &file.data).await?;
            state
                .message_service
                .save_attachment(CreateAttachment {
                    message_id: user_message.id,
                    file_name: file.name,
                    file_path: format!("/uploads/{}/{}/{}", user.id, chat.id, stored_name),
                    file_type: file.content_type,
                    file_size: file.data.len() as i64,
                })
                .await?;
        }
    }

    let ai_settings = state
        .settings_service
        .get_ai_settings(user.id)
        .await?
        .ok_or_else(|| Error::Internal(format!("AI settings missing for user {}", user.id)))?;

    let history = state.message_service.list_for_chat(chat.id, user.id).await?;
    let turns = history_to_turns(&history);
    let user_tokens = estimate_tokens(&form.content);

    match state.ai_service.complete(&turns, &ai_settings).await {
        Ok(completion) => {
            let ai_message = state
                .message_service
                .create(CreateMessage {
                    chat_id: chat.id,
                    user_id: user.id,
                    content: completion.text,
                    is_user: false,
                })
                .await?;

            state
                .usage_service
                .record(
                    user.id,
                    UsageDelta {
                        messages: 2,
                        tokens: user_tokens + completion.total_tokens,
                        files: file_count,
                    },
                )
                .await?;

            let messages = state.message_service.list_for_chat(chat.id, user.id).await?;
            Ok(Json(SendMessageResponse {
                messages,
                user_message_id: user_message.id,
                ai_message_id: ai_message.id,
                success: true,
            })
            .into_response())
        }
        Err(err) => {
            tracing::error!(error = %err, user_id = user.id, chat_id = chat.id, "AI completion failed");

            let fallback = state
                .message_service
                .create(CreateMessage {
                    chat_id: chat.id,
                    user_id: user.id,
                    content: AI_FALLBACK_REPLY.to_string(),
                    is_user: false,
                })
                .await?;

            state
                .usage_service
                .record(
                    user.id,
                    UsageDelta {
                        messages: 2,
                        tokens: user_tokens,
                        files: file_count,
                    },
                )
                .await?;

            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SendMessageFailure {
                    error: "Failed to get a response from the AI service".into(),
                    user_message_id: user_message.id,
                    error_message_id: fallback.id,
                    success: false,
                }),
            )
                .into_response())
        }
    }
}

async fn read_form(mut multipart: Multipart) -> Result<MessageForm> {
    let mut form = MessageForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => form.content = field.text().await?,
            "files" | "files[]" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.push(UploadedFile {
                    name: file_name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Name a file is written under. Unique even for identical names uploaded
/// in the same millisecond.
pub fn stored_file_name(original: &str) -> String {
    format!(
        "{}-{}-{}",
        unix_millis(),
        Uuid::new_v4().simple(),
        sanitize_file_name(original)
    )
}

/// Reduces a client-supplied file name to a safe single path component.
pub fn sanitize_file_name(raw: &str) -> String {
    let normalized = raw.replace('\\', "/");
    let base = FsPath::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "file".to_string();
    }
    cleaned.chars().take(MAX_FILE_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("/abs/path/a.txt"), "a.txt");
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("отчёт.docx"), "отчёт.docx");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[test]
    fn empty_or_dot_names_get_placeholder() {
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn same_name_in_one_request_gets_distinct_paths() {
        let first = stored_file_name("image.jpg");
        let second = stored_file_name("image.jpg");
        assert_ne!(first, second);
        assert!(first.ends_with("-image.jpg"));
        assert!(second.ends_with("-image.jpg"));
        assert_eq!(stored_file_name("../secret.txt").matches('/').count(), 0);
    }

    #[test]
    fn long_names_are_truncated() {
        let long = format!("{}.txt", "a".repeat(300));
        assert_eq!(sanitize_file_name(&long).chars().count(), MAX_FILE_NAME_LEN);
    }
}
