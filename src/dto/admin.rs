use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::Payment,
    routes::params::{Pagination, de_opt_i64},
    validation::is_valid_email,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_services: i64,
    pub pending_payments: i64,
    pub total_revenue: i64,
    pub new_users: i64,
    pub total_services: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RecentActivityQuery {
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub limit: Option<i64>,
}

impl RecentActivityQuery {
    pub fn normalized_limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 50)
    }
}

/// One row of the cross-entity activity feed.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Uuid,
    pub description: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminPaymentQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminPayment {
    #[serde(flatten)]
    pub payment: Payment,
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminPaymentList {
    #[schema(value_type = Vec<AdminPayment>)]
    pub items: Vec<AdminPayment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Invoice {
    pub invoice_number: String,
    pub payment_id: Uuid,
    pub transaction_id: String,
    pub user_email: Option<String>,
    pub service_type: String,
    pub description: Option<String>,
    pub amount: i64,
    pub tax_amount: i64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct InvoiceList {
    #[schema(value_type = Vec<Invoice>)]
    pub items: Vec<Invoice>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: i64,
    pub payments: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ServiceTypeRevenue {
    pub service_type: String,
    pub revenue: i64,
    pub payments: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueReport {
    pub total_revenue: i64,
    pub by_month: Vec<MonthlyRevenue>,
    pub by_service_type: Vec<ServiceTypeRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SystemSettings {
    pub site_name: String,
    pub support_email: String,
    pub maintenance_mode: bool,
    pub allow_registrations: bool,
    pub notify_admin_on_new_request: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            site_name: "Biashara Hub".to_string(),
            support_email: "support@biasharahub.co.ke".to_string(),
            maintenance_mode: false,
            allow_registrations: true,
            notify_admin_on_new_request: true,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSystemSettings {
    pub site_name: Option<String>,
    pub support_email: Option<String>,
    pub maintenance_mode: Option<bool>,
    pub allow_registrations: Option<bool>,
    pub notify_admin_on_new_request: Option<bool>,
}

impl SystemSettings {
    /// Apply a partial update, rejecting a blank site name or a malformed email.
    pub fn apply(mut self, patch: UpdateSystemSettings) -> Result<Self, String> {
        if let Some(name) = patch.site_name {
            let name = name.trim();
            if name.is_empty() {
                return Err("site_name must not be empty".to_string());
            }
            self.site_name = name.to_string();
        }
        if let Some(email) = patch.support_email {
            if !is_valid_email(&email) {
                return Err("support_email must be a valid email".to_string());
            }
            self.support_email = email.trim().to_string();
        }
        if let Some(v) = patch.maintenance_mode {
            self.maintenance_mode = v;
        }
        if let Some(v) = patch.allow_registrations {
            self.allow_registrations = v;
        }
        if let Some(v) = patch.notify_admin_on_new_request {
            self.notify_admin_on_new_request = v;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_limit_bounds() {
        assert_eq!(RecentActivityQuery::default().normalized_limit(), 10);
        assert_eq!(RecentActivityQuery { limit: Some(500) }.normalized_limit(), 50);
        assert_eq!(RecentActivityQuery { limit: Some(0) }.normalized_limit(), 1);
    }

    #[test]
    fn settings_patch() {
        let updated = SystemSettings::default()
            .apply(UpdateSystemSettings {
                allow_registrations: Some(false),
                site_name: Some("  Hub  ".into()),
                ..Default::default()
            })
            .expect("valid patch");
        assert!(!updated.allow_registrations);
        assert_eq!(updated.site_name, "Hub");
        assert!(updated.notify_admin_on_new_request);

        let err = SystemSettings::default().apply(UpdateSystemSettings {
            support_email: Some("nope".into()),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn stats_are_camel_case() {
        let stats = DashboardStats {
            total_users: 1,
            active_services: 2,
            pending_payments: 3,
            total_revenue: 4,
            new_users: 5,
            total_services: 6,
        };
        let value = serde_json::to_value(stats).expect("json");
        assert_eq!(value["totalUsers"], 1);
        assert_eq!(value["totalServices"], 6);
    }
}
