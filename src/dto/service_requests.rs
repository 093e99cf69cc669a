use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Payment, ServiceRequest, ServiceRequestItem},
    types::{CatalogKind, PaymentMethod, Priority},
};

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateServiceRequest {
    pub catalog: CatalogKind,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub company_name: Option<String>,
    pub kra_pin: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

/// Method-specific payment details, tagged by `method`.
#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Mpesa {
        phone_number: String,
    },
    Card {
        card_number: String,
        card_holder: String,
        expiry: String,
        cvv: String,
    },
    BankTransfer {
        bank_name: String,
        account_name: String,
        reference: String,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Mpesa { .. } => PaymentMethod::Mpesa,
            PaymentDetails::Card { .. } => PaymentMethod::Card,
            PaymentDetails::BankTransfer { .. } => PaymentMethod::BankTransfer,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceRequestWithItems {
    pub request: ServiceRequest,
    pub items: Vec<ServiceRequestItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayServiceRequestResponse {
    pub request: ServiceRequest,
    pub payment: Payment,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ServiceRequestList {
    #[schema(value_type = Vec<ServiceRequest>)]
    pub items: Vec<ServiceRequest>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateServiceRequestStatus {
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_details_are_tagged_by_method() {
        let card: PaymentDetails = serde_json::from_value(serde_json::json!({
            "method": "card",
            "card_number": "4111 1111 1111 1111",
            "card_holder": "Jane Wanjiku",
            "expiry": "12/30",
            "cvv": "123"
        }))
        .expect("card");
        assert_eq!(card.method(), PaymentMethod::Card);

        let bank: PaymentDetails = serde_json::from_value(serde_json::json!({
            "method": "bank_transfer",
            "bank_name": "KCB",
            "account_name": "Acme",
            "reference": "REF1"
        }))
        .expect("bank");
        assert_eq!(bank.method(), PaymentMethod::BankTransfer);

        assert!(
            serde_json::from_value::<PaymentDetails>(serde_json::json!({"method": "cash"})).is_err()
        );
    }

    #[test]
    fn priority_defaults_to_standard() {
        let req: CreateServiceRequest = serde_json::from_value(serde_json::json!({
            "catalog": "business",
            "full_name": "Jane",
            "email": "jane@example.com",
            "phone": "0712345678"
        }))
        .expect("request");
        assert_eq!(req.priority, Priority::Standard);
    }
}
