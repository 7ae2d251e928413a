use serde::{Deserialize, Serialize};

use crate::models::chat::Chat;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameChatRequest {
    pub chat_id: Option<i64>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChatQuery {
    pub chat_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<Chat>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub chat: Chat,
    pub success: bool,
}
