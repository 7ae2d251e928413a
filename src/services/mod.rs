pub mod ai_service;
pub mod chat_service;
pub mod message_service;
pub mod payment_service;
pub mod scheduler;
pub mod settings_service;
pub mod subscription_service;
pub mod usage_service;
pub mod user_service;
