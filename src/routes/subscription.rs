use axum::{extract::State, Extension, Json};
use uuid::Uuid;

use crate::{
    dto::subscription_dto::{CreatePaymentRequest, CreatePaymentResponse, SubscriptionResponse},
    error::{Error, Result},
    services::payment_service::{NewPayment, PaymentMetadata},
    utils::telegram_auth::VerifiedTelegramUser,
    AppState,
};

pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
) -> Result<Json<SubscriptionResponse>> {
    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    let subscription = state
        .subscription_service
        .get_active_subscription(user.id)
        .await?;
    let plans = state.subscription_service.list_active_plans().await?;

    Ok(Json(SubscriptionResponse {
        subscription,
        plans,
        success: true,
    }))
}

/// Opens a pending transaction and a YooKassa payment for the chosen plan.
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(tg): Extension<VerifiedTelegramUser>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>> {
    let plan_id = payload
        .plan_id
        .ok_or_else(|| Error::BadRequest("planId is required".into()))?;

    let user = state.user_service.require_by_telegram_id(tg.id).await?;
    let plan = state
        .subscription_service
        .get_active_plan(plan_id)
        .await?
        .ok_or_else(|| Error::NotFound("Subscription plan not found or inactive".into()))?;

    let transaction = state
        .subscription_service
        .create_pending_transaction(
            user.id,
            plan.price,
            &plan.currency,
            &Uuid::new_v4().to_string(),
        )
        .await?;

    let return_url = format!(
        "{}/payment-success?transaction_id={}",
        state.config.public_base_url.trim_end_matches('/'),
        transaction.id
    );
    let payment = state
        .payment_service
        .create_payment(NewPayment {
            amount: plan.price,
            currency: &plan.currency,
            return_url,
            description: format!("Subscription \"{}\" for {} days", plan.name, plan.duration_days),
            metadata: PaymentMetadata {
                transaction_id: transaction.id,
                user_id: user.id,
                plan_id: plan.id,
            },
        })
        .await?;

    state
        .subscription_service
        .set_transaction_payment_id(transaction.id, &payment.id)
        .await?;

    let payment_url = payment
        .confirmation
        .and_then(|c| c.confirmation_url)
        .ok_or_else(|| Error::Upstream(format!("Payment {} has no confirmation URL", payment.id)))?;

    tracing::info!(
        user_id = user.id,
        plan_id = plan.id,
        transaction_id = transaction.id,
        payment_id = %payment.id,
        "Payment created"
    );

    Ok(Json(CreatePaymentResponse {
        payment_url,
        payment_id: payment.id,
        transaction_id: transaction.id,
        success: true,
    }))
}
