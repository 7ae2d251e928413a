use serde::{Deserialize, Serialize};

use crate::models::subscription::{Subscription, SubscriptionPlan};

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<Subscription>,
    pub plans: Vec<SubscriptionPlan>,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub plan_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub payment_url: String,
    pub payment_id: String,
    pub transaction_id: i64,
    pub success: bool,
}
