use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::error::Result;
use crate::models::settings::{AiSettings, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE};

/// Partial update of a user's AI parameters.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AiSettingsUpdate {
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: Option<f64>,
    #[validate(range(min = 1, max = 8192))]
    #[serde(alias = "maxTokens")]
    pub max_tokens: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 10000))]
    #[serde(alias = "systemPrompt")]
    pub system_prompt: Option<String>,
}

#[derive(Clone)]
pub struct SettingsService {
    pool: PgPool,
    default_model: String,
}

impl SettingsService {
    pub fn new(pool: PgPool, default_model: String) -> Self {
        Self { pool, default_model }
    }

    pub async fn get_ai_settings(&self, user_id: i64) -> Result<Option<AiSettings>> {
        let settings = sqlx::query_as::<_, AiSettings>("SELECT * FROM ai_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(settings)
    }

    pub async fn create_default_ai_settings(&self, user_id: i64) -> Result<AiSettings> {
        let settings = sqlx::query_as::<_, AiSettings>(
            r#"
            INSERT INTO ai_settings (user_id, temperature, max_tokens, model, system_prompt)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(DEFAULT_TEMPERATURE)
        .bind(DEFAULT_MAX_TOKENS)
        .bind(&self.default_model)
        .bind(DEFAULT_SYSTEM_PROMPT)
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn update_ai_settings(&self, user_id: i64, update: &AiSettingsUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ai_settings SET
                temperature = COALESCE($1, temperature),
                max_tokens = COALESCE($2, max_tokens),
                model = COALESCE($3, model),
                system_prompt = COALESCE($4, system_prompt),
                updated_at = NOW()
            WHERE user_id = $5
            "#,
        )
        .bind(update.temperature)
        .bind(update.max_tokens)
        .bind(&update.model)
        .bind(&update.system_prompt)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
