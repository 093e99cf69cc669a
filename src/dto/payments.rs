use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Payment;

/// Body of `POST /api/payments`. `service_type` and `payment_method` are free
/// text and normalized server-side.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub payment_method: String,
    pub amount: i64,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub card_number: Option<String>,
    pub bank_name: Option<String>,
    pub bank_reference: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    #[serde(default)]
    pub status: String,
    pub transaction_reference: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentEnvelope {
    pub payment: Payment,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentList {
    #[schema(value_type = Vec<Payment>)]
    pub items: Vec<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total_payments: i64,
    pub total_paid: i64,
    pub pending_payments: i64,
    pub failed_payments: i64,
}
