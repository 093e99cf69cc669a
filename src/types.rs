//! Closed vocabularies stored as text columns.
//!
//! Every enum renders with `as_str` for the database and parses back with
//! `FromStr`. Payment inputs additionally go through [`normalize_token`] and a
//! synonym table so free-text values such as `"M-Pesa"` or `"book keeping"`
//! land on the canonical variant.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Rejected input after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    pub field: &'static str,
    pub normalized: String,
    pub allowed: &'static [&'static str],
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid {}: '{}'. Allowed values: {}",
            self.field,
            self.normalized,
            self.allowed.join(", ")
        )
    }
}

/// Lower-case, trim, and fold spaces and underscores to `-`.
pub fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

macro_rules! text_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(InvalidValue {
                        field: $field,
                        normalized: other.to_string(),
                        allowed: Self::ALL,
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Admin,
    Staff,
}

text_enum!(Role, "role", {
    Client => "client",
    Admin => "admin",
    Staff => "staff",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    BusinessRegistration,
    KraServices,
    DataServices,
    Bookkeeping,
    WebsiteDevelopment,
}

text_enum!(ServiceType, "service_type", {
    BusinessRegistration => "business_registration",
    KraServices => "kra_services",
    DataServices => "data_services",
    Bookkeeping => "bookkeeping",
    WebsiteDevelopment => "website_development",
});

impl ServiceType {
    /// Map free text onto the allow-list, returning the normalized attempt on failure.
    pub fn normalize(raw: &str) -> Result<Self, InvalidValue> {
        let token = normalize_token(raw);
        let canonical = match token.as_str() {
            "business-registration" | "business" | "business-reg" | "registration"
            | "company-registration" => "business_registration",
            "kra-services" | "kra" | "kra-service" | "tax" | "tax-services" | "tax-filing" => {
                "kra_services"
            }
            "data-services" | "data" | "data-service" | "data-analytics" | "analytics" => {
                "data_services"
            }
            "bookkeeping" | "book-keeping" | "bookkeeping-services" | "accounting" => {
                "bookkeeping"
            }
            "website-development" | "website" | "web-development" | "web" | "web-design" => {
                "website_development"
            }
            _ => {
                return Err(InvalidValue {
                    field: "service_type",
                    normalized: token.replace('-', "_"),
                    allowed: Self::ALL,
                });
            }
        };
        canonical.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Mpesa,
    Card,
    BankTransfer,
}

text_enum!(PaymentMethod, "payment_method", {
    Mpesa => "mpesa",
    Card => "card",
    BankTransfer => "bank_transfer",
});

impl PaymentMethod {
    pub fn normalize(raw: &str) -> Result<Self, InvalidValue> {
        let token = normalize_token(raw);
        let canonical = match token.as_str() {
            "mpesa" | "m-pesa" | "mobile-money" | "lipa-na-mpesa" => "mpesa",
            "card" | "credit-card" | "debit-card" | "visa" | "mastercard" => "card",
            "bank" | "bank-transfer" | "banktransfer" | "bank-deposit" => "bank_transfer",
            _ => {
                return Err(InvalidValue {
                    field: "payment_method",
                    normalized: token.replace('-', "_"),
                    allowed: Self::ALL,
                });
            }
        };
        canonical.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Successful,
    Failed,
    Cancelled,
    Refunded,
}

text_enum!(PaymentStatus, "status", {
    Pending => "pending",
    Processing => "processing",
    Successful => "successful",
    Failed => "failed",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Successful | Failed | Cancelled)
                | (Processing, Successful | Failed | Cancelled)
                | (Successful, Refunded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Business,
    Data,
    Website,
}

text_enum!(CatalogKind, "catalog", {
    Business => "business",
    Data => "data",
    Website => "website",
});

impl CatalogKind {
    pub fn service_type(&self) -> ServiceType {
        match self {
            CatalogKind::Business => ServiceType::BusinessRegistration,
            CatalogKind::Data => ServiceType::DataServices,
            CatalogKind::Website => ServiceType::WebsiteDevelopment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Standard,
    Express,
}

text_enum!(Priority, "priority", {
    Standard => "standard",
    Express => "express",
});

impl Priority {
    pub fn fee_percent(&self) -> i64 {
        match self {
            Priority::Standard => 0,
            Priority::Express => 30,
        }
    }

    /// Surcharge on `subtotal`, rounded half up to the shilling. `None` when
    /// the amount does not fit in an `i64`.
    pub fn fee_for(&self, subtotal: i64) -> Option<i64> {
        subtotal
            .checked_mul(self.fee_percent())?
            .checked_add(50)
            .map(|scaled| scaled / 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingPayment,
    PaidPendingProcessing,
    Processing,
    Completed,
    Cancelled,
}

text_enum!(RequestStatus, "status", {
    PendingPayment => "pending_payment",
    PaidPendingProcessing => "paid_pending_processing",
    Processing => "processing",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl RequestStatus {
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (PendingPayment, PaidPendingProcessing | Cancelled)
                | (PaidPendingProcessing, Processing | Cancelled)
                | (Processing, Completed | Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
    Cancelled,
}

text_enum!(DomainStatus, "status", {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

impl DomainStatus {
    /// Completed, rejected and cancelled requests are final.
    pub fn can_transition_to(&self, next: DomainStatus) -> bool {
        use DomainStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress | Completed | Rejected | Cancelled)
                | (InProgress, Completed | Rejected | Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataServiceType {
    DataAnalysis,
    DataVisualization,
    DashboardDevelopment,
    DataCleaning,
    PredictiveModeling,
}

text_enum!(DataServiceType, "service_type", {
    DataAnalysis => "data_analysis",
    DataVisualization => "data_visualization",
    DashboardDevelopment => "dashboard_development",
    DataCleaning => "data_cleaning",
    PredictiveModeling => "predictive_modeling",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    BusinessName,
    PrivateLimited,
    Partnership,
    Ngo,
}

text_enum!(BusinessType, "service_type", {
    BusinessName => "business_name",
    PrivateLimited => "private_limited",
    Partnership => "partnership",
    Ngo => "ngo",
});

impl BusinessType {
    pub fn min_directors(&self) -> usize {
        match self {
            BusinessType::PrivateLimited => 1,
            BusinessType::Partnership => 2,
            BusinessType::BusinessName | BusinessType::Ngo => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KraServiceType {
    PinRegistration,
    TaxReturns,
    TaxComplianceCertificate,
    VatRegistration,
    PayeFiling,
}

text_enum!(KraServiceType, "service_type", {
    PinRegistration => "pin_registration",
    TaxReturns => "tax_returns",
    TaxComplianceCertificate => "tax_compliance_certificate",
    VatRegistration => "vat_registration",
    PayeFiling => "paye_filing",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookkeepingType {
    MonthlyBookkeeping,
    Payroll,
    FinancialStatements,
    AuditPreparation,
}

text_enum!(BookkeepingType, "service_type", {
    MonthlyBookkeeping => "monthly_bookkeeping",
    Payroll => "payroll",
    FinancialStatements => "financial_statements",
    AuditPreparation => "audit_preparation",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_token_folds_separators() {
        assert_eq!(normalize_token("  Book Keeping "), "book-keeping");
        assert_eq!(normalize_token("M_PESA"), "m-pesa");
        assert_eq!(normalize_token("bank -- transfer"), "bank-transfer");
    }

    #[test]
    fn service_type_synonyms() {
        assert_eq!(ServiceType::normalize("book-keeping"), Ok(ServiceType::Bookkeeping));
        assert_eq!(ServiceType::normalize("Accounting"), Ok(ServiceType::Bookkeeping));
        assert_eq!(ServiceType::normalize("KRA"), Ok(ServiceType::KraServices));
        assert_eq!(
            ServiceType::normalize("business_registration"),
            Ok(ServiceType::BusinessRegistration)
        );
        assert_eq!(
            ServiceType::normalize("Website Development"),
            Ok(ServiceType::WebsiteDevelopment)
        );
    }

    #[test]
    fn rejected_service_type_reports_normalized_value() {
        let err = ServiceType::normalize("  Car Wash ").unwrap_err();
        assert_eq!(err.normalized, "car_wash");
        assert!(err.to_string().contains("'car_wash'"));
    }

    #[test]
    fn payment_method_synonyms() {
        assert_eq!(PaymentMethod::normalize("M-Pesa"), Ok(PaymentMethod::Mpesa));
        assert_eq!(PaymentMethod::normalize("mpesa"), Ok(PaymentMethod::Mpesa));
        assert_eq!(PaymentMethod::normalize("Credit Card"), Ok(PaymentMethod::Card));
        assert_eq!(PaymentMethod::normalize("bank_transfer"), Ok(PaymentMethod::BankTransfer));
        let err = PaymentMethod::normalize("Bitcoin").unwrap_err();
        assert_eq!(err.normalized, "bitcoin");
    }

    #[test]
    fn payment_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Successful));
        assert!(Processing.can_transition_to(Failed));
        assert!(Successful.can_transition_to(Refunded));
        assert!(!Successful.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Successful));
        assert!(!Failed.can_transition_to(Successful));
    }

    #[test]
    fn request_transitions() {
        use RequestStatus::*;
        assert!(PendingPayment.can_transition_to(PaidPendingProcessing));
        assert!(PaidPendingProcessing.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(!PendingPayment.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn express_fee_is_thirty_percent() {
        assert_eq!(Priority::Express.fee_for(51_500), Some(15_450));
        assert_eq!(Priority::Standard.fee_for(51_500), Some(0));
        assert_eq!(Priority::Express.fee_for(5), Some(2));
    }

    #[test]
    fn express_fee_on_huge_subtotal_overflows() {
        assert_eq!(Priority::Express.fee_for(i64::MAX / 10), None);
        assert_eq!(Priority::Standard.fee_for(i64::MAX), Some(0));
        assert!(Priority::Express.fee_for(i64::MAX / 100).is_some());
    }

    #[test]
    fn domain_status_moves_forward_only() {
        use DomainStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Rejected));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Completed, Rejected, Cancelled] {
            for next in [Pending, InProgress, Completed, Rejected, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn text_round_trip() {
        for raw in RequestStatus::ALL {
            let parsed: RequestStatus = raw.parse().expect("known status");
            assert_eq!(parsed.as_str(), *raw);
        }
        assert!("shipped".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn director_minimums() {
        assert_eq!(BusinessType::Partnership.min_directors(), 2);
        assert_eq!(BusinessType::PrivateLimited.min_directors(), 1);
        assert_eq!(BusinessType::Ngo.min_directors(), 0);
        assert!("sole_trader".parse::<BusinessType>().is_err());
    }
}
