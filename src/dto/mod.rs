pub mod auth_dto;
pub mod chat_dto;
pub mod message_dto;
pub mod settings_dto;
pub mod subscription_dto;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
