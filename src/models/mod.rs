pub mod chat;
pub mod message;
pub mod settings;
pub mod subscription;
pub mod usage;
pub mod user;
