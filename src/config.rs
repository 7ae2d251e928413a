use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

pub const DEFAULT_AI_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_AI_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_YOOKASSA_API_URL: &str = "https://api.yookassa.ru/v3";

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub telegram_bot_token: String,
    pub ai_api_key: String,
    pub ai_api_url: String,
    pub default_ai_model: String,
    pub yookassa_shop_id: String,
    pub yookassa_secret_key: String,
    pub yookassa_api_url: String,
    pub public_base_url: String,
    pub uploads_dir: String,
    pub api_rps: u32,
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_address", &self.server_address)
            .field("database_max_connections", &self.database_max_connections)
            .field("ai_api_url", &self.ai_api_url)
            .field("default_ai_model", &self.default_ai_model)
            .field("yookassa_shop_id", &self.yookassa_shop_id)
            .field("yookassa_api_url", &self.yookassa_api_url)
            .field("public_base_url", &self.public_base_url)
            .field("uploads_dir", &self.uploads_dir)
            .field("api_rps", &self.api_rps)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3000"),
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN")?,
            ai_api_key: get_env("AI_API_KEY")?,
            ai_api_url: get_env_or("AI_API_URL", DEFAULT_AI_API_URL),
            default_ai_model: get_env_or("DEFAULT_AI_MODEL", DEFAULT_AI_MODEL),
            yookassa_shop_id: get_env_or("YOOKASSA_SHOP_ID", ""),
            yookassa_secret_key: get_env_or("YOOKASSA_SECRET_KEY", ""),
            yookassa_api_url: get_env_or("YOOKASSA_API_URL", DEFAULT_YOOKASSA_API_URL),
            public_base_url: get_env("PUBLIC_BASE_URL")?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
            api_rps: get_env_parse_or("API_RPS", 50)?,
            max_body_bytes: get_env_parse_or("MAX_BODY_BYTES", 20 * 1024 * 1024)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("Missing environment variable: {}", name))),
    }
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
