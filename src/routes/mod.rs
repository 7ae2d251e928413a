pub mod auth;
pub mod chat;
pub mod health;
pub mod messages;
pub mod settings;
pub mod subscription;
pub mod webhook;
