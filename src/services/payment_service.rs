use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, Deserialize)]
pub struct Confirmation {
    pub confirmation_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: String,
    pub status: Option<String>,
    pub confirmation: Option<Confirmation>,
    pub metadata: Option<JsonValue>,
    pub payment_method: Option<PaymentMethod>,
}

/// Ids carried in payment metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentMetadata {
    pub transaction_id: i64,
    pub user_id: i64,
    pub plan_id: i64,
}

impl PaymentMetadata {
    /// Reads ids that may come back as JSON strings or numbers.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        Some(Self {
            transaction_id: id_field(value, "transaction_id")?,
            user_id: id_field(value, "user_id")?,
            plan_id: id_field(value, "plan_id")?,
        })
    }
}

fn id_field(value: &JsonValue, key: &str) -> Option<i64> {
    match value.get(key)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment<'a> {
    pub amount: Decimal,
    pub currency: &'a str,
    pub return_url: String,
    pub description: String,
    pub metadata: PaymentMetadata,
}

#[derive(Clone)]
pub struct PaymentService {
    client: Client,
    api_url: String,
    shop_id: String,
    secret_key: String,
}

impl PaymentService {
    pub fn new(client: Client, api_url: String, shop_id: String, secret_key: String) -> Self {
        Self {
            client,
            api_url,
            shop_id,
            secret_key,
        }
    }

    pub async fn create_payment(&self, payment: NewPayment<'_>) -> Result<Payment> {
        let body = json!({
            "amount": {
                "value": format!("{:.2}", payment.amount),
                "currency": payment.currency,
            },
            "confirmation": {
                "type": "redirect",
                "return_url": payment.return_url,
            },
            "capture": true,
            "description": payment.description,
            "metadata": payment.metadata,
        });

        let res = self
            .client
            .post(format!("{}/payments", self.api_url.trim_end_matches('/')))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await?;

        read_payment(res).await
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment> {
        let res = self
            .client
            .get(format!("{}/payments/{}", self.api_url.trim_end_matches('/'), payment_id))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .send()
            .await?;

        read_payment(res).await
    }

    /// Checks a webhook body against its hex HMAC-SHA1 signature.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        verify_signature(&self.secret_key, payload, signature)
    }
}

async fn read_payment(res: reqwest::Response) -> Result<Payment> {
    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        return Err(Error::Upstream(format!("Payment API Error {}: {}", status, text)));
    }
    Ok(res.json().await?)
}

fn verify_signature(secret_key: &str, payload: &[u8], signature: &str) -> bool {
    if secret_key.is_empty() {
        tracing::error!("Payment secret key is not configured");
        return false;
    }
    let Ok(mut mac) = HmacSha1::new_from_slice(secret_key.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    let calculated = hex::encode(mac.finalize().into_bytes());
    calculated.as_bytes().ct_eq(signature.as_bytes()).into()
}
