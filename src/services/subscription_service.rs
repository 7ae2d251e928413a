use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::subscription::{
    Subscription, SubscriptionPlan, Transaction, STATUS_ACTIVE, STATUS_COMPLETED, STATUS_PENDING,
};
use crate::utils::time::{add_days, now};

/// Outcome of applying a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentApplied {
    Activated { subscription_id: i64 },
    AlreadyCompleted,
}

#[derive(Clone)]
pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE is_active = TRUE ORDER BY price ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    pub async fn get_active_plan(&self, plan_id: i64) -> Result<Option<SubscriptionPlan>> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE id = $1 AND is_active = TRUE",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    /// The user's current subscription, if any, with its plan.
    pub async fn get_active_subscription(&self, user_id: i64) -> Result<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1 AND status = $2 AND end_date > NOW()
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(STATUS_ACTIVE)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut subscription) = subscription else {
            return Ok(None);
        };
        subscription.plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE id = $1",
        )
        .bind(subscription.plan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(subscription))
    }

    pub async fn has_active_subscription(&self, user_id: i64) -> Result<bool> {
        Ok(self
            .get_active_subscription(user_id)
            .await?
            .is_some_and(|s| s.is_active_at(now())))
    }

    pub async fn create_pending_transaction(
        &self,
        user_id: i64,
        amount: Decimal,
        currency: &str,
        payment_id: &str,
    ) -> Result<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (user_id, amount, currency, payment_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(currency)
        .bind(payment_id)
        .bind(STATUS_PENDING)
        .fetch_one(&self.pool)
        .await?;
        Ok(transaction)
    }

    pub async fn set_transaction_payment_id(&self, transaction_id: i64, payment_id: &str) -> Result<()> {
        sqlx::query("UPDATE transactions SET payment_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(payment_id)
            .bind(transaction_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Completes the transaction and starts a subscription, atomically.
    /// Repeated confirmations of the same transaction are no-ops.
    pub async fn apply_successful_payment(
        &self,
        transaction_id: i64,
        user_id: i64,
        plan_id: i64,
        payment_method: &str,
    ) -> Result<PaymentApplied> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE transactions
            SET status = $1, payment_method = $2, updated_at = NOW()
            WHERE id = $3 AND user_id = $4 AND status <> $1
            RETURNING id
            "#,
        )
        .bind(STATUS_COMPLETED)
        .bind(payment_method)
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM transactions WHERE id = $1 AND user_id = $2")
                    .bind(transaction_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return match exists {
                Some(_) => Ok(PaymentApplied::AlreadyCompleted),
                None => Err(Error::NotFound("Transaction not found".into())),
            };
        }

        let plan = sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Plan not found".into()))?;

        let start = now();
        let end = add_days(start, plan.duration_days);
        let (subscription_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (user_id, plan_id, status, start_date, end_date, auto_renew)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(STATUS_ACTIVE)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE transactions SET subscription_id = $1 WHERE id = $2")
            .bind(subscription_id)
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id, plan_id, subscription_id, "Subscription activated");
        Ok(PaymentApplied::Activated { subscription_id })
    }

    /// Marks lapsed active subscriptions as expired. Returns how many changed.
    pub async fn expire_overdue(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', updated_at = NOW()
            WHERE status = $1 AND end_date <= NOW()
            "#,
        )
        .bind(STATUS_ACTIVE)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
