use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;

use crate::{
    dto::SuccessResponse,
    error::{Error, Result},
    services::{payment_service::PaymentMetadata, subscription_service::PaymentApplied},
    AppState,
};

pub const SIGNATURE_HEADER: &str = "Idempotence-Key";
const PAYMENT_SUCCEEDED: &str = "payment.succeeded";

#[derive(Debug, Deserialize)]
struct PaymentEvent {
    #[serde(default)]
    event: String,
    object: Option<PaymentEventObject>,
}

#[derive(Debug, Deserialize)]
struct PaymentEventObject {
    id: String,
}

/// YooKassa notification endpoint. Trust comes from the body signature,
/// not from Telegram init data.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.payment_service.verify_webhook_signature(&body, signature) {
        tracing::warn!("Payment webhook with invalid signature");
        return Err(Error::Unauthorized("Invalid signature".into()));
    }

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|_| Error::BadRequest("Invalid JSON".into()))?;
    if event.event != PAYMENT_SUCCEEDED {
        tracing::info!(event = %event.event, "Ignoring payment event");
        return Ok(Json(SuccessResponse::ok()));
    }

    let payment_id = event
        .object
        .map(|o| o.id)
        .ok_or_else(|| Error::BadRequest("Payment id is missing".into()))?;

    let payment = state.payment_service.get_payment(&payment_id).await?;
    let metadata = payment
        .metadata
        .as_ref()
        .ok_or_else(|| Error::NotFound("Payment data not found".into()))?;
    let ids = PaymentMetadata::from_json(metadata)
        .ok_or_else(|| Error::BadRequest("Invalid metadata".into()))?;

    let method = payment
        .payment_method
        .and_then(|m| m.kind)
        .unwrap_or_else(|| "unknown".to_string());

    match state
        .subscription_service
        .apply_successful_payment(ids.transaction_id, ids.user_id, ids.plan_id, &method)
        .await?
    {
        PaymentApplied::Activated { subscription_id } => tracing::info!(
            payment_id = %payment_id,
            transaction_id = ids.transaction_id,
            subscription_id,
            "Payment applied"
        ),
        PaymentApplied::AlreadyCompleted => tracing::info!(
            payment_id = %payment_id,
            transaction_id = ids.transaction_id,
            "Payment already applied"
        ),
    }

    Ok(Json(SuccessResponse::ok()))
}
