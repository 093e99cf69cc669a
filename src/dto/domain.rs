//! Request bodies for the four per-category service routers.
//!
//! `details` arrives as raw JSON and is decoded into the detail type of the
//! router's category. Unknown keys are rejected, then the per-type rules run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::DomainRequest,
    types::{BookkeepingType, BusinessType, DataServiceType, KraServiceType},
    validation::{is_valid_kra_pin, require_non_empty},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Data,
    Business,
    Kra,
    Bookkeeping,
}

impl DomainKind {
    pub const ALL: [DomainKind; 4] = [
        DomainKind::Data,
        DomainKind::Business,
        DomainKind::Kra,
        DomainKind::Bookkeeping,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            DomainKind::Data => "data_services",
            DomainKind::Business => "business_registrations",
            DomainKind::Kra => "kra_services",
            DomainKind::Bookkeeping => "bookkeeping_services",
        }
    }

    /// `type` of this category's rows in the admin activity feed.
    pub fn activity_kind(&self) -> &'static str {
        match self {
            DomainKind::Data => "data_service",
            DomainKind::Business => "business_registration",
            DomainKind::Kra => "kra_service",
            DomainKind::Bookkeeping => "bookkeeping_service",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DomainKind::Data => "Data service",
            DomainKind::Business => "Business registration",
            DomainKind::Kra => "KRA service",
            DomainKind::Bookkeeping => "Bookkeeping service",
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct DomainRequestBody {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct DataDetails {
    pub description: String,
    pub data_source: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub budget: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Director {
    pub full_name: String,
    pub id_number: String,
    pub kra_pin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BusinessDetails {
    pub proposed_names: Vec<String>,
    pub business_activity: String,
    #[serde(default)]
    pub directors: Vec<Director>,
    pub physical_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct KraDetails {
    pub kra_pin: Option<String>,
    pub id_number: Option<String>,
    pub tax_period: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BookkeepingDetails {
    pub company_name: String,
    pub period: String,
    pub transactions_per_month: Option<i64>,
    pub employees: Option<i32>,
}

/// A validated request: the category's service type plus its typed details.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceDetails {
    Data(DataServiceType, DataDetails),
    Business(BusinessType, BusinessDetails),
    Kra(KraServiceType, KraDetails),
    Bookkeeping(BookkeepingType, BookkeepingDetails),
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, AppError> {
    let value = if value.is_null() {
        serde_json::json!({})
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| AppError::bad_request(format!("Invalid details: {e}")))
}

impl ServiceDetails {
    pub fn parse(kind: DomainKind, body: DomainRequestBody) -> Result<Self, AppError> {
        let service_type = body.service_type.trim();
        let parsed = match kind {
            DomainKind::Data => ServiceDetails::Data(service_type.parse()?, decode(body.details)?),
            DomainKind::Business => {
                ServiceDetails::Business(service_type.parse()?, decode(body.details)?)
            }
            DomainKind::Kra => ServiceDetails::Kra(service_type.parse()?, decode(body.details)?),
            DomainKind::Bookkeeping => {
                ServiceDetails::Bookkeeping(service_type.parse()?, decode(body.details)?)
            }
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn kind(&self) -> DomainKind {
        match self {
            ServiceDetails::Data(..) => DomainKind::Data,
            ServiceDetails::Business(..) => DomainKind::Business,
            ServiceDetails::Kra(..) => DomainKind::Kra,
            ServiceDetails::Bookkeeping(..) => DomainKind::Bookkeeping,
        }
    }

    pub fn service_type(&self) -> &'static str {
        match self {
            ServiceDetails::Data(ty, _) => ty.as_str(),
            ServiceDetails::Business(ty, _) => ty.as_str(),
            ServiceDetails::Kra(ty, _) => ty.as_str(),
            ServiceDetails::Bookkeeping(ty, _) => ty.as_str(),
        }
    }

    pub fn details_json(&self) -> Result<serde_json::Value, AppError> {
        let value = match self {
            ServiceDetails::Data(_, d) => serde_json::to_value(d),
            ServiceDetails::Business(_, d) => serde_json::to_value(d),
            ServiceDetails::Kra(_, d) => serde_json::to_value(d),
            ServiceDetails::Bookkeeping(_, d) => serde_json::to_value(d),
        };
        value.map_err(AppError::internal)
    }

    fn validate(&self) -> Result<(), AppError> {
        match self {
            ServiceDetails::Data(_, d) => {
                require_non_empty(&d.description, "description")?;
                if d.budget.is_some_and(|b| b <= 0) {
                    return Err(AppError::bad_request("budget must be greater than 0"));
                }
            }
            ServiceDetails::Business(ty, d) => {
                if d.proposed_names.is_empty() || d.proposed_names.len() > 3 {
                    return Err(AppError::bad_request(
                        "proposed_names must list between 1 and 3 names",
                    ));
                }
                if d.proposed_names.iter().any(|n| n.trim().is_empty()) {
                    return Err(AppError::bad_request("proposed_names must not be empty"));
                }
                require_non_empty(&d.business_activity, "business_activity")?;
                let min = ty.min_directors();
                if d.directors.len() < min {
                    return Err(AppError::bad_request(format!(
                        "{ty} requires at least {min} director(s)"
                    )));
                }
                for director in &d.directors {
                    require_non_empty(&director.full_name, "directors.full_name")?;
                    require_non_empty(&director.id_number, "directors.id_number")?;
                    if let Some(pin) = &director.kra_pin {
                        if !is_valid_kra_pin(pin) {
                            return Err(AppError::bad_request("Invalid director KRA PIN"));
                        }
                    }
                }
            }
            ServiceDetails::Kra(ty, d) => match ty {
                KraServiceType::PinRegistration => {
                    require_non_empty(d.id_number.as_deref().unwrap_or_default(), "id_number")?;
                }
                _ => {
                    let pin = d.kra_pin.as_deref().unwrap_or_default();
                    if !is_valid_kra_pin(pin) {
                        return Err(AppError::bad_request(format!(
                            "{ty} requires a valid KRA PIN"
                        )));
                    }
                }
            },
            ServiceDetails::Bookkeeping(ty, d) => {
                require_non_empty(&d.company_name, "company_name")?;
                require_non_empty(&d.period, "period")?;
                if d.transactions_per_month.is_some_and(|t| t < 0) {
                    return Err(AppError::bad_request(
                        "transactions_per_month must not be negative",
                    ));
                }
                if *ty == BookkeepingType::Payroll && d.employees.unwrap_or(0) < 1 {
                    return Err(AppError::bad_request("payroll requires at least 1 employee"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateDomainStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DomainRequestList {
    #[schema(value_type = Vec<DomainRequest>)]
    pub items: Vec<DomainRequest>,
}

/// Admin listing row: the request plus the owner's contact details.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DomainRequestWithUser {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub request: DomainRequest,
    pub user_email: String,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminDomainRequestList {
    #[schema(value_type = Vec<DomainRequestWithUser>)]
    pub items: Vec<DomainRequestWithUser>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(service_type: &str, details: serde_json::Value) -> DomainRequestBody {
        DomainRequestBody {
            service_type: service_type.to_string(),
            details,
        }
    }

    fn message(err: AppError) -> String {
        err.to_string()
    }

    #[test]
    fn data_request_parses() {
        let parsed = ServiceDetails::parse(
            DomainKind::Data,
            body(
                "dashboard_development",
                json!({"description": "Sales KPIs", "budget": 40000, "deadline": "2026-12-01"}),
            ),
        )
        .expect("valid");
        assert_eq!(parsed.service_type(), "dashboard_development");
        assert_eq!(parsed.kind(), DomainKind::Data);
        let stored = parsed.details_json().expect("json");
        assert_eq!(stored["budget"], 40000);
    }

    #[test]
    fn unknown_detail_keys_are_rejected() {
        let err = ServiceDetails::parse(
            DomainKind::Data,
            body("data_cleaning", json!({"description": "x", "is_admin": true})),
        )
        .unwrap_err();
        assert!(message(err).contains("Invalid details"));
    }

    #[test]
    fn service_type_outside_category_is_rejected() {
        let err = ServiceDetails::parse(
            DomainKind::Kra,
            body("data_cleaning", json!({"kra_pin": "A123456789B"})),
        )
        .unwrap_err();
        assert!(message(err).contains("'data_cleaning'"));
    }

    #[test]
    fn non_positive_budget() {
        let err = ServiceDetails::parse(
            DomainKind::Data,
            body("data_analysis", json!({"description": "x", "budget": 0})),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn partnership_needs_two_directors() {
        let one = json!({
            "proposed_names": ["Acme Partners"],
            "business_activity": "Consulting",
            "directors": [{"full_name": "Jane W", "id_number": "12345678"}]
        });
        let err = ServiceDetails::parse(DomainKind::Business, body("partnership", one.clone()))
            .unwrap_err();
        assert!(message(err).contains("at least 2"));
        ServiceDetails::parse(DomainKind::Business, body("private_limited", one)).expect("one is enough");
    }

    #[test]
    fn proposed_names_bounds() {
        let four = json!({
            "proposed_names": ["A", "B", "C", "D"],
            "business_activity": "Retail"
        });
        assert!(ServiceDetails::parse(DomainKind::Business, body("business_name", four)).is_err());
        let none = json!({"proposed_names": [], "business_activity": "Retail"});
        assert!(ServiceDetails::parse(DomainKind::Business, body("business_name", none)).is_err());
    }

    #[test]
    fn kra_pin_rules() {
        ServiceDetails::parse(
            DomainKind::Kra,
            body("pin_registration", json!({"id_number": "12345678"})),
        )
        .expect("pin registration needs only an id");
        assert!(
            ServiceDetails::parse(DomainKind::Kra, body("pin_registration", json!({}))).is_err()
        );
        assert!(
            ServiceDetails::parse(
                DomainKind::Kra,
                body("tax_returns", json!({"kra_pin": "X123"}))
            )
            .is_err()
        );
        ServiceDetails::parse(
            DomainKind::Kra,
            body("vat_registration", json!({"kra_pin": "P051234567Q"})),
        )
        .expect("valid pin");
    }

    #[test]
    fn payroll_needs_employees() {
        let details = json!({"company_name": "Acme", "period": "2026-09"});
        assert!(
            ServiceDetails::parse(DomainKind::Bookkeeping, body("payroll", details.clone()))
                .is_err()
        );
        ServiceDetails::parse(DomainKind::Bookkeeping, body("monthly_bookkeeping", details))
            .expect("bookkeeping without employees");
    }
}
