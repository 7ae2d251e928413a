use sqlx::PgPool;

use crate::error::Result;
use crate::models::usage::{UsageDelta, UsageStats};

#[derive(Clone)]
pub struct UsageService {
    pool: PgPool,
}

impl UsageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds `delta` to the user's counters and counts one more session.
    pub async fn record(&self, user_id: i64, delta: UsageDelta) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_stats
                (user_id, total_messages, total_tokens, total_files, total_sessions, last_session_date)
            VALUES ($1, $2, $3, $4, 1, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                total_messages = usage_stats.total_messages + EXCLUDED.total_messages,
                total_tokens = usage_stats.total_tokens + EXCLUDED.total_tokens,
                total_files = usage_stats.total_files + EXCLUDED.total_files,
                total_sessions = usage_stats.total_sessions + 1,
                last_session_date = NOW(),
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(delta.messages)
        .bind(delta.tokens)
        .bind(delta.files)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<UsageStats>> {
        let stats = sqlx::query_as::<_, UsageStats>("SELECT * FROM usage_stats WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stats)
    }
}
