use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{notifications, payments, service_request_items, service_requests, users};

/// Full user row, including the password hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub kra_pin: Option<String>,
    pub address: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub kra_pin: Option<String>,
    pub address: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            company_name: user.company_name,
            kra_pin: user.kra_pin,
            address: user.address,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<users::Model> for UserProfile {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            company_name: model.company_name,
            kra_pin: model.kra_pin,
            address: model.address,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Option<Uuid>,
    /// Same as `transaction_id`; the customer-facing payment reference.
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub service_type: String,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: String,
    pub invoice_number: String,
    pub description: Option<String>,
    pub mpesa_number: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub card_last4: Option<String>,
    pub card_brand: Option<String>,
    pub bank_name: Option<String>,
    pub bank_reference: Option<String>,
    pub tax_amount: i64,
    pub tax_rate: i32,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            service_request_id: model.service_request_id,
            reference: model.transaction_id.clone(),
            amount: model.amount,
            currency: model.currency,
            service_type: model.service_type,
            payment_method: model.payment_method,
            status: model.status,
            transaction_id: model.transaction_id,
            invoice_number: model.invoice_number,
            description: model.description,
            mpesa_number: model.mpesa_number,
            mpesa_receipt: model.mpesa_receipt,
            card_last4: model.card_last4,
            card_brand: model.card_brand,
            bank_name: model.bank_name,
            bank_reference: model.bank_reference,
            tax_amount: model.tax_amount,
            tax_rate: model.tax_rate,
            metadata: model.metadata,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            failed_at: model.failed_at.map(|dt| dt.with_timezone(&Utc)),
            refunded_at: model.refunded_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            title: model.title,
            message: model.message,
            read: model.read,
            read_at: model.read_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// A row of one of the four per-category request tables.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DomainRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub status: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub request_number: String,
    pub user_id: Uuid,
    pub catalog: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: Option<String>,
    pub kra_pin: Option<String>,
    pub notes: Option<String>,
    pub priority: String,
    pub subtotal: i64,
    pub priority_fee: i64,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: Option<String>,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<service_requests::Model> for ServiceRequest {
    fn from(model: service_requests::Model) -> Self {
        Self {
            id: model.id,
            request_number: model.request_number,
            user_id: model.user_id,
            catalog: model.catalog,
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            company_name: model.company_name,
            kra_pin: model.kra_pin,
            notes: model.notes,
            priority: model.priority,
            subtotal: model.subtotal,
            priority_fee: model.priority_fee,
            total_amount: model.total_amount,
            status: model.status,
            payment_method: model.payment_method,
            payment_id: model.payment_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceRequestItem {
    pub id: Uuid,
    pub service_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

impl From<service_request_items::Model> for ServiceRequestItem {
    fn from(model: service_request_items::Model) -> Self {
        Self {
            id: model.id,
            service_id: model.service_id,
            name: model.name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total: model.total,
        }
    }
}
