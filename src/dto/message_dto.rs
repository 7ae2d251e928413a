use serde::Serialize;

use crate::models::message::Message;

#[derive(Debug, Clone, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub messages: Vec<Message>,
    pub user_message_id: i64,
    pub ai_message_id: i64,
    pub success: bool,
}

/// Returned with 500 when the assistant could not answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageFailure {
    pub error: String,
    pub user_message_id: i64,
    pub error_message_id: i64,
    pub success: bool,
}
