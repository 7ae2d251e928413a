use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::user::{User, UserProfile};

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn require_by_telegram_id(&self, telegram_id: i64) -> Result<User> {
        self.find_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn create(&self, profile: &UserProfile) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users
                (telegram_id, username, first_name, last_name, photo_url, auth_date, is_premium, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING id
            "#,
        )
        .bind(profile.telegram_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.photo_url)
        .bind(profile.auth_date)
        .bind(profile.is_premium)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = id, telegram_id = profile.telegram_id, "Created user");
        Ok(id)
    }

    /// Refreshes profile fields; `None` keeps the stored value.
    pub async fn update(&self, user_id: i64, profile: &UserProfile) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = COALESCE($1, username),
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                photo_url = COALESCE($4, photo_url),
                auth_date = $5,
                is_premium = $6,
                updated_at = NOW(),
                last_active = NOW()
            WHERE id = $7
            "#,
        )
        .bind(&profile.username)
        .bind(Some(&profile.first_name).filter(|n| !n.is_empty()))
        .bind(&profile.last_name)
        .bind(&profile.photo_url)
        .bind(profile.auth_date)
        .bind(profile.is_premium)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_settings(&self, user_id: i64, settings: &serde_json::Value) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET settings = $1, updated_at = NOW() WHERE id = $2")
            .bind(settings)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
